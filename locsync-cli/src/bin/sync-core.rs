//! Syncs core depot localization files for the enlistment under `SRCROOT`.

use std::process::ExitCode;

use locsync_core::DepotKind;

fn main() -> ExitCode {
    locsync_cli::main_for(DepotKind::Core, "sync-core")
}
