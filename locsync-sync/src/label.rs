//! Checkpoint → (label, branch) resolution.
//!
//! The label specification is free text. By convention the line right after
//! `View:` names the branch root, e.g.
//!
//! ```text
//! Label:  bld14_4229_1000
//! View:
//!         //depot/dev14lab3/...
//! ```
//!
//! The scan is strict: if the line after `View:` is not a branch root the
//! label is rejected rather than guessed at.

use std::sync::LazyLock;

use regex::Regex;

use locsync_core::{
    BranchName, Checkpoint, ConnectionSettings, DepotClient, DepotCommand, DepotConnector,
    DepotError, ExecutionResult, Label, SyncError,
};

static VIEW_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^View:").expect("Invalid regex pattern"));

static BRANCH_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"//depot/(?P<branch>.+)/\.\.\.").expect("Invalid regex pattern")
});

/// Position of the scan within the label specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ExpectingViewLine,
    LineWithBranch,
    IgnoreRemainingLines,
}

/// Extracts the branch named by the view of a label specification.
pub fn branch_from_label_spec<S: AsRef<str>>(
    label: &Label,
    lines: &[S],
) -> Result<BranchName, SyncError> {
    let mut state = ScanState::ExpectingViewLine;
    let mut branch = String::new();

    for line in lines {
        let line = line.as_ref();
        match state {
            ScanState::ExpectingViewLine => {
                if VIEW_HEADER.is_match(line) {
                    state = ScanState::LineWithBranch;
                }
            }
            ScanState::LineWithBranch => {
                let Some(caps) = BRANCH_ROOT.captures(line) else {
                    return Err(label_not_present(
                        label,
                        format!("view line `{}` does not name a branch", line.trim()),
                    ));
                };
                branch = caps["branch"].to_string();
                state = ScanState::IgnoreRemainingLines;
            }
            ScanState::IgnoreRemainingLines => break,
        }
    }

    if state != ScanState::IgnoreRemainingLines {
        return Err(label_not_present(label, "label has no view".to_string()));
    }
    if branch.is_empty() {
        return Err(label_not_present(label, "view names an empty branch".to_string()));
    }
    Ok(BranchName(branch))
}

/// Resolves `checkpoint` to its label and the branch that label was cut from.
///
/// Uses its own connection, released before returning. Every failure,
/// including an unreachable depot, is `FailedSyncLabelNotPresent`; the
/// cause is kept in the reason.
pub fn resolve_branch<C: DepotConnector>(
    connector: &C,
    settings: &ConnectionSettings,
    checkpoint: &Checkpoint,
) -> Result<(Label, BranchName), SyncError> {
    let label = checkpoint.label();
    let mut client = connector
        .connect(settings)
        .map_err(|err| label_not_present(&label, format!("cannot connect to depot: {err}")))?;

    let output = match client.run(&DepotCommand::label_spec(&label)) {
        Ok(output) => output,
        Err(err @ DepotError::Command { .. }) => {
            return Err(label_not_present(&label, err.to_string()));
        }
        Err(err) => {
            return Err(label_not_present(&label, format!("label query failed: {err}")));
        }
    };

    let branch = branch_from_label_spec(&label, output.messages.as_slice())?;
    tracing::info!(checkpoint = %checkpoint, label = %label, branch = %branch, "resolved label");
    Ok((label, branch))
}

fn label_not_present(label: &Label, reason: String) -> SyncError {
    tracing::error!(label = %label, "label not present: {reason}");
    SyncError::incorrect_state(
        ExecutionResult::FailedSyncLabelNotPresent,
        format!("label {label}: {reason}"),
    )
}
