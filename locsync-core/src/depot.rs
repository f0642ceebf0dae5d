//! The narrow capability interface to the external versioned-file store.
//!
//! The synchronizer only ever issues three commands (`opened`, `sync` and
//! `label -o`), each built here, and only ever looks at the severity, the
//! message lines and the tagged records of the reply.

use std::fmt;

use crate::config::ConnectionSettings;
use crate::error::DepotError;
use crate::types::{BranchName, FilePattern, Label};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A named depot command with its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotCommand {
    pub name: String,
    pub args: Vec<String>,
    /// Request structured key/value records rather than message lines.
    pub tagged: bool,
}

impl DepotCommand {
    /// Files currently checked out for edit under `pattern`.
    pub fn opened(pattern: &FilePattern) -> Self {
        Self {
            name: "opened".to_string(),
            args: vec![pattern.0.clone()],
            tagged: true,
        }
    }

    /// `sync [-f] [-b <branch>] <pattern>`.
    pub fn sync(pattern: &FilePattern, force: bool, branch: Option<&BranchName>) -> Self {
        let mut args = Vec::new();
        if force {
            args.push("-f".to_string());
        }
        if let Some(branch) = branch {
            args.push("-b".to_string());
            args.push(branch.0.clone());
        }
        args.push(pattern.0.clone());
        Self {
            name: "sync".to_string(),
            args,
            tagged: false,
        }
    }

    /// The label specification, including its `View:` section.
    pub fn label_spec(label: &Label) -> Self {
        Self {
            name: "label".to_string(),
            args: vec!["-o".to_string(), label.0.clone()],
            tagged: false,
        }
    }

    pub fn is_forced_sync(&self) -> bool {
        self.name == "sync" && self.args.iter().any(|a| a == "-f")
    }
}

impl fmt::Display for DepotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Highest severity the depot attached to a successful reply.
///
/// Error-level replies never reach the caller as output; clients turn them
/// into [`DepotError::Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
}

/// One structured record, fields kept in the order the depot sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields.push((key.to_owned(), value.to_owned()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Reply of a depot command that did not fail outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub severity: Severity,
    pub messages: Vec<String>,
    pub records: Vec<Record>,
}

impl CommandOutput {
    pub fn info(messages: Vec<String>) -> Self {
        Self {
            severity: Severity::Info,
            messages,
            records: Vec::new(),
        }
    }

    pub fn warning(messages: Vec<String>) -> Self {
        Self {
            severity: Severity::Warning,
            messages,
            records: Vec::new(),
        }
    }

    pub fn records(records: Vec<Record>) -> Self {
        Self {
            severity: Severity::Info,
            messages: Vec::new(),
            records,
        }
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// An open connection to a depot.
///
/// Connections are stateful and owned by exactly one sync call; dropping the
/// value releases whatever the implementation holds.
pub trait DepotClient {
    fn run(&mut self, command: &DepotCommand) -> Result<CommandOutput, DepotError>;
}

impl<T: DepotClient + ?Sized> DepotClient for Box<T> {
    fn run(&mut self, command: &DepotCommand) -> Result<CommandOutput, DepotError> {
        (**self).run(command)
    }
}

/// Opens [`DepotClient`] connections for an enlistment.
pub trait DepotConnector {
    type Client: DepotClient;

    fn connect(&self, settings: &ConnectionSettings) -> Result<Self::Client, DepotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unforced_sync_carries_only_the_pattern() {
        let cmd = DepotCommand::sync(&FilePattern::from("root/...lcl"), false, None);
        assert_eq!(cmd.args, vec!["root/...lcl"]);
        assert!(!cmd.is_forced_sync());
    }

    #[test]
    fn forced_branch_sync_orders_flags_before_pattern() {
        let cmd = DepotCommand::sync(
            &FilePattern::from("root/...lct@bld14_1_1000"),
            true,
            Some(&BranchName::from("dev14lab3")),
        );
        assert_eq!(cmd.to_string(), "sync -f -b dev14lab3 root/...lct@bld14_1_1000");
        assert!(cmd.is_forced_sync());
    }

    #[test]
    fn opened_requests_tagged_records() {
        let cmd = DepotCommand::opened(&FilePattern::from("root/..."));
        assert!(cmd.tagged);
        assert_eq!(cmd.to_string(), "opened root/...");
    }

    #[test]
    fn record_lookup_returns_first_match() {
        let record = Record::new()
            .with("depotFile", "//depot/a.lcl")
            .with("action", "edit");
        assert_eq!(record.get("action"), Some("edit"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.fields().len(), 2);
    }
}
