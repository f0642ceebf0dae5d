//! Classification of warning-level `sync` output.
//!
//! The depot reports two benign conditions as warnings, each as a single
//! line: nothing to transfer (`... - file(s) up-to-date.`) and an empty
//! pattern (`... - no such file(s).`). Anything else is unrecognised.

use std::sync::LazyLock;

use regex::Regex;

static UP_TO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"up-to-date\.$").expect("Invalid regex pattern"));

static NO_SUCH_FILES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"no such file\(s\)\.$").expect("Invalid regex pattern"));

/// What a warning-level sync reply means.
///
/// There is no separate already-up-to-date outcome: an `up-to-date.` reply
/// is the success case, and [`crate::AttemptOutcome::UpToDate`] records it
/// apart from a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncClassification {
    /// Already up to date; nothing needed to change.
    Success,
    /// The pattern matched no files, usually a misspelt language.
    NoSuchFiles,
    UnspecifiedError,
}

/// Classifies the message lines of a warning-level sync reply.
///
/// Only the exact single-line idioms are recognised; zero or several lines
/// always classify as [`SyncClassification::UnspecifiedError`].
pub fn classify(messages: &[String]) -> SyncClassification {
    let [line] = messages else {
        return SyncClassification::UnspecifiedError;
    };
    if UP_TO_DATE.is_match(line) {
        SyncClassification::Success
    } else if NO_SUCH_FILES.is_match(line) {
        SyncClassification::NoSuchFiles
    } else {
        SyncClassification::UnspecifiedError
    }
}
