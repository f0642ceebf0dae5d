//! # locsync-client
//!
//! Process-backed [`locsync_core::DepotConnector`]: every depot command runs
//! the depot command-line tool once, in script (`-s`) or tagged (`-ztag`)
//! output mode, and its output is parsed back into a
//! [`locsync_core::CommandOutput`].

pub mod output;
pub mod process;

pub use process::{ProcessClient, ProcessConnector, DEFAULT_PROGRAM, PROGRAM_ENV, TIMEOUT_ENV};
