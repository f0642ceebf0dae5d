//! Opened-files precondition.
//!
//! A sync must not run over files the user has checked out for edit. The
//! check is best-effort: nothing stops a file being opened between the query
//! and the sync that follows it.

use std::thread;

use locsync_core::{
    CommandOutput, DepotClient, DepotCommand, ExecutionResult, FilePattern, SyncError,
};

use crate::retry::RetryPolicy;

/// Fails with [`SyncError::FilesOpened`] if any file under `pattern` is open.
///
/// Connectivity faults are retried up to `policy.precondition_attempts`
/// times with `policy.connection_retry_delay` between attempts; exhausting
/// them yields `BadEnlistmentStateConnectionFailed`. Finding opened files is
/// never retried.
pub fn check_no_files_opened<D>(
    client: &mut D,
    pattern: &FilePattern,
    policy: &RetryPolicy,
) -> Result<(), SyncError>
where
    D: DepotClient + ?Sized,
{
    let command = DepotCommand::opened(pattern);
    for attempt in 1..=policy.precondition_attempts {
        match client.run(&command) {
            Ok(output) => {
                let files = opened_files(&output);
                if files.is_empty() {
                    tracing::debug!(pattern = %pattern, "no files opened");
                    return Ok(());
                }
                tracing::error!(
                    pattern = %pattern,
                    count = files.len(),
                    "files are opened for edit; revert or submit them before syncing"
                );
                for file in &files {
                    tracing::error!("  opened: {file}");
                }
                return Err(SyncError::FilesOpened {
                    pattern: pattern.clone(),
                    files,
                });
            }
            Err(err) => {
                tracing::warn!(
                    pattern = %pattern,
                    attempt,
                    error = %err,
                    "opened-files query failed"
                );
                if attempt < policy.precondition_attempts {
                    thread::sleep(policy.connection_retry_delay);
                }
            }
        }
    }

    tracing::error!(pattern = %pattern, "could not reach the depot to check opened files");
    Err(SyncError::incorrect_state(
        ExecutionResult::BadEnlistmentStateConnectionFailed,
        format!(
            "opened-files query for {pattern} failed {} time(s)",
            policy.precondition_attempts
        ),
    ))
}

/// Depot paths of the opened files in an `opened` reply.
fn opened_files(output: &CommandOutput) -> Vec<String> {
    output
        .records
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.get("depotFile")
                .or_else(|| r.get("clientFile"))
                .or_else(|| r.fields().first().map(|(_, v)| v.as_str()))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
