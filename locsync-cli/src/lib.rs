//! Command-line front end for the localization sync tools.
//!
//! # Usage
//!
//! ```text
//! sync-core  -core <language> [<language> ...]
//! sync-store -store <checkpoint> <language> [<language> ...]
//! sync-core  -h | /h | ? | /?
//! ```
//!
//! The process exit code is the numeric [`locsync_core::ExecutionResult`].

pub mod app;
pub mod args;

pub use app::{main_for, run, Cli};
pub use args::{usage, ArgumentError, CommandLine, RunMode};
