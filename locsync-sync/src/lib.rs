//! # locsync-sync
//!
//! Retrying, precondition-checked depot sync and its orchestration.
//!
//! Build a [`Synchronizer`] over any [`locsync_core::DepotConnector`] and call
//! [`Synchronizer::synchronize`] with a [`SyncTarget`] and a language list.

pub mod classify;
pub mod label;
pub mod precondition;
pub mod retry;
pub mod synchronizer;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classify::{classify, SyncClassification};
pub use label::{branch_from_label_spec, resolve_branch};
pub use precondition::check_no_files_opened;
pub use retry::{
    sync_branch_file_pattern, sync_file_pattern, AttemptOutcome, RetryPolicy, SyncAttempt,
    SyncReport, RETRY_COUNT,
};
pub use synchronizer::{SyncTarget, Synchronizer};
