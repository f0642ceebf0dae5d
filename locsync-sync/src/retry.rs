//! Retrying sync of a single file pattern.
//!
//! ## Attempt protocol
//!
//! 1. Open a connection (released when the call returns, on every path).
//! 2. Check that no files under the pattern are opened for edit.
//! 3. Attempt `1..=sync_attempts`: the first attempt is a plain sync, every
//!    later one is forced.
//! 4. An info-level reply means files were transferred; a warning-level
//!    reply is classified. Up-to-date ends the loop, no-such-files is fatal,
//!    anything else (including depot faults) moves on to the next attempt.

use std::fmt;
use std::time::Duration;

use locsync_core::{
    BranchName, ConnectionSettings, DepotClient, DepotCommand, DepotConnector, ExecutionResult,
    FilePattern, Label, Language, Severity, SyncError,
};

use crate::classify::{classify, SyncClassification};
use crate::precondition::check_no_files_opened;

/// Number of sync attempts (and opened-files queries) per file pattern.
pub const RETRY_COUNT: u32 = 3;

/// Pause between opened-files queries after a connectivity fault.
pub const CONNECTION_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Attempt budgets and back-off for one file pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub sync_attempts: u32,
    pub precondition_attempts: u32,
    pub connection_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            sync_attempts: RETRY_COUNT,
            precondition_attempts: RETRY_COUNT,
            connection_retry_delay: CONNECTION_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Default budgets without any sleeping.
    pub fn immediate() -> Self {
        Self {
            connection_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt bookkeeping
// ---------------------------------------------------------------------------

/// How a single sync attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Info-level reply: files were transferred.
    Transferred,
    UpToDate,
    NoSuchFiles,
    /// Warning-level reply the classifier did not recognise.
    Unrecognised(Vec<String>),
    /// The depot call itself failed.
    Fault(String),
}

impl AttemptOutcome {
    fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Transferred | AttemptOutcome::UpToDate)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Transferred => write!(f, "files transferred"),
            AttemptOutcome::UpToDate => write!(f, "up to date"),
            AttemptOutcome::NoSuchFiles => write!(f, "no such files"),
            AttemptOutcome::Unrecognised(lines) => {
                write!(f, "unrecognised output ({} line(s))", lines.len())
            }
            AttemptOutcome::Fault(err) => write!(f, "depot fault: {err}"),
        }
    }
}

/// One sync attempt within a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAttempt {
    pub number: u32,
    pub forced: bool,
    pub outcome: AttemptOutcome,
}

/// Attempts made by a successful call, last one successful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pattern: FilePattern,
    pub attempts: Vec<SyncAttempt>,
}

impl SyncReport {
    pub fn transferred(&self) -> bool {
        self.attempts
            .last()
            .is_some_and(|a| a.outcome == AttemptOutcome::Transferred)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Syncs `pattern` to the tip of the depot.
pub fn sync_file_pattern<C>(
    connector: &C,
    settings: &ConnectionSettings,
    pattern: &FilePattern,
    language: &Language,
    policy: &RetryPolicy,
) -> Result<SyncReport, SyncError>
where
    C: DepotConnector,
{
    let mut client = open(connector, settings, pattern)?;
    check_no_files_opened(&mut client, pattern, policy)?;
    sync_with_retries(&mut client, pattern, None, language, policy)
}

/// Syncs `pattern@label`, passing `branch` to every sync call.
///
/// The opened-files check runs against the unpinned pattern.
pub fn sync_branch_file_pattern<C>(
    connector: &C,
    settings: &ConnectionSettings,
    branch: &BranchName,
    label: &Label,
    pattern: &FilePattern,
    language: &Language,
    policy: &RetryPolicy,
) -> Result<SyncReport, SyncError>
where
    C: DepotConnector,
{
    let mut client = open(connector, settings, pattern)?;
    check_no_files_opened(&mut client, pattern, policy)?;
    let pinned = pattern.at_label(label);
    sync_with_retries(&mut client, &pinned, Some(branch), language, policy)
}

fn open<C: DepotConnector>(
    connector: &C,
    settings: &ConnectionSettings,
    pattern: &FilePattern,
) -> Result<C::Client, SyncError> {
    connector.connect(settings).map_err(|err| {
        tracing::error!(pattern = %pattern, error = %err, "cannot connect to depot");
        SyncError::incorrect_state(
            ExecutionResult::BadEnlistmentStateConnectionFailed,
            format!("cannot connect to depot: {err}"),
        )
    })
}

fn sync_with_retries<D>(
    client: &mut D,
    pattern: &FilePattern,
    branch: Option<&BranchName>,
    language: &Language,
    policy: &RetryPolicy,
) -> Result<SyncReport, SyncError>
where
    D: DepotClient + ?Sized,
{
    let mut attempts = Vec::new();

    for number in 1..=policy.sync_attempts {
        let forced = number > 1;
        let command = DepotCommand::sync(pattern, forced, branch);
        tracing::debug!(%command, attempt = number, "issuing sync");

        let outcome = match client.run(&command) {
            Ok(output) if output.severity == Severity::Warning => match classify(&output.messages)
            {
                SyncClassification::Success => AttemptOutcome::UpToDate,
                SyncClassification::NoSuchFiles => AttemptOutcome::NoSuchFiles,
                SyncClassification::UnspecifiedError => {
                    AttemptOutcome::Unrecognised(output.messages)
                }
            },
            Ok(_) => AttemptOutcome::Transferred,
            Err(err) => AttemptOutcome::Fault(err.to_string()),
        };

        attempts.push(SyncAttempt {
            number,
            forced,
            outcome: outcome.clone(),
        });

        if outcome.is_success() {
            tracing::info!(
                language = %language,
                pattern = %pattern,
                attempt = number,
                forced,
                "{outcome}"
            );
            return Ok(SyncReport {
                pattern: pattern.clone(),
                attempts,
            });
        }

        if outcome == AttemptOutcome::NoSuchFiles {
            tracing::error!(
                language = %language,
                pattern = %pattern,
                "no files match; check the language name"
            );
            return Err(SyncError::incorrect_state(
                ExecutionResult::WrongLanguage,
                format!("no files match {pattern} for language {language}"),
            ));
        }

        if let AttemptOutcome::Unrecognised(lines) = &outcome {
            for line in lines {
                tracing::warn!(attempt = number, "sync output: {line}");
            }
        }
        tracing::warn!(
            language = %language,
            pattern = %pattern,
            attempt = number,
            forced,
            "sync attempt failed: {outcome}"
        );
    }

    tracing::error!(
        language = %language,
        pattern = %pattern,
        attempts = policy.sync_attempts,
        "giving up on sync"
    );
    Err(SyncError::incorrect_state(
        ExecutionResult::FailedSync,
        format!(
            "sync of {pattern} did not succeed after {} attempt(s)",
            policy.sync_attempts
        ),
    ))
}
