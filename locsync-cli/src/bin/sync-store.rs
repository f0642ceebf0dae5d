//! Syncs store depot localization files for the enlistment under `STORE`.

use std::process::ExitCode;

use locsync_core::DepotKind;

fn main() -> ExitCode {
    locsync_cli::main_for(DepotKind::Store, "sync-store")
}
