//! Error types for locsync-core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{ExecutionResult, FilePattern};

/// Transport or command faults reported by a depot client.
///
/// The retrying layers treat every variant as potentially transient.
#[derive(Debug, Error)]
pub enum DepotError {
    /// The depot service could not be reached (or the tool could not start).
    #[error("depot connection failed: {message}")]
    Connection { message: String },

    /// The command ran but the depot reported an error.
    #[error("depot command `{command}` failed: {}", .messages.join("; "))]
    Command {
        command: String,
        messages: Vec<String>,
    },

    /// The command did not finish before the configured deadline.
    #[error("depot command `{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    /// Local I/O failure while talking to the depot tool.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failures raised while syncing a single file pattern.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Files under the pattern are checked out for edit; the user must
    /// resolve them by hand.
    #[error("{} file(s) opened for edit under {pattern}", .files.len())]
    FilesOpened {
        pattern: FilePattern,
        files: Vec<String>,
    },

    /// The depot or enlistment is in a state that maps to `result`.
    #[error("{result}: {reason}")]
    IncorrectState {
        result: ExecutionResult,
        reason: String,
    },
}

impl SyncError {
    pub fn incorrect_state(result: ExecutionResult, reason: impl Into<String>) -> Self {
        SyncError::IncorrectState {
            result,
            reason: reason.into(),
        }
    }

    /// The exit status this failure is reported with.
    pub fn result(&self) -> ExecutionResult {
        match self {
            SyncError::FilesOpened { .. } => ExecutionResult::BadEnlistmentStateFilesOpened,
            SyncError::IncorrectState { result, .. } => *result,
        }
    }
}

/// Problems locating or reading the local enlistment.
#[derive(Debug, Error)]
pub enum EnlistmentError {
    #[error("environment variable {var} is not set; run from an enlistment window")]
    RootNotSet { var: &'static str },

    #[error("enlistment ini not found at {path}")]
    IniMissing { path: PathBuf },

    #[error("cannot read enlistment ini at {path}: {source}")]
    IniUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnlistmentError {
    pub fn result(&self) -> ExecutionResult {
        match self {
            EnlistmentError::RootNotSet { .. } => ExecutionResult::NoEnlistment,
            EnlistmentError::IniMissing { .. } | EnlistmentError::IniUnreadable { .. } => {
                ExecutionResult::BadEnlistment
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_opened_maps_to_bad_enlistment_state() {
        let err = SyncError::FilesOpened {
            pattern: FilePattern::from("root/intl/...pl-pl/...lcl"),
            files: vec!["//depot/a.lcl".to_string()],
        };
        assert_eq!(err.result(), ExecutionResult::BadEnlistmentStateFilesOpened);
        assert!(err.to_string().contains("1 file(s) opened"));
    }

    #[test]
    fn incorrect_state_carries_its_code() {
        let err = SyncError::incorrect_state(ExecutionResult::WrongLanguage, "no such files");
        assert_eq!(err.result(), ExecutionResult::WrongLanguage);
        assert_eq!(err.to_string(), "wrong language: no such files");
    }

    #[test]
    fn enlistment_errors_map_to_enlistment_results() {
        let unset = EnlistmentError::RootNotSet { var: "SRCROOT" };
        assert_eq!(unset.result(), ExecutionResult::NoEnlistment);
        assert!(unset.to_string().contains("SRCROOT"));

        let missing = EnlistmentError::IniMissing {
            path: PathBuf::from("/enl/sd.ini"),
        };
        assert_eq!(missing.result(), ExecutionResult::BadEnlistment);
    }

    #[test]
    fn command_error_joins_depot_messages() {
        let err = DepotError::Command {
            command: "sync".to_string(),
            messages: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "depot command `sync` failed: first; second");
    }
}
