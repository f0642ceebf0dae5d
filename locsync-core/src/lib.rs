//! locsync core library: domain types, depot capability, enlistment config.
//!
//! - [`types`]: newtypes, [`DepotKind`] and [`ExecutionResult`]
//! - [`error`]: [`DepotError`], [`SyncError`], [`EnlistmentError`]
//! - [`depot`]: [`DepotClient`] / [`DepotConnector`] and the command model
//! - [`config`]: enlistment discovery and `sd.ini` settings

pub mod config;
pub mod depot;
pub mod error;
pub mod types;

pub use config::{ConnectionSettings, Enlistment, EnvSource, ProcessEnv};
pub use depot::{CommandOutput, DepotClient, DepotCommand, DepotConnector, Record, Severity};
pub use error::{DepotError, EnlistmentError, SyncError};
pub use types::{
    BranchName, Checkpoint, DepotKind, ExecutionResult, FilePattern, Label, Language,
};
