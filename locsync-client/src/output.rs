//! Parsers for the depot tool's two machine-readable output modes.
//!
//! Script mode (`-s`) prefixes every line with its severity:
//!
//! ```text
//! info: //depot/intl/pl-pl/a.lcl#3 - updating c:\enl\intl\pl-pl\a.lcl
//! warning: c:\enl\intl\...pl-pl\...lcl - file(s) up-to-date.
//! error: Connect to server failed; check $SDPORT.
//! exit: 1
//! ```
//!
//! Tagged mode (`-ztag`) emits one `... key value` line per field, records
//! separated by blank lines.

use locsync_core::{CommandOutput, Record, Severity};

/// Script-mode output split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub output: CommandOutput,
    pub errors: Vec<String>,
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    pub fn failed(&self) -> bool {
        !self.errors.is_empty() || self.exit_code.is_some_and(|code| code != 0)
    }
}

/// Parses `-s` output.
///
/// `infoN:` and `text:` lines count as info. Lines without a recognised
/// prefix are kept as info messages.
pub fn parse_script_output(stdout: &str) -> ScriptOutput {
    let mut parsed = ScriptOutput::default();
    for line in stdout.lines().map(|l| l.trim_end_matches('\r')) {
        if line.is_empty() {
            continue;
        }
        let Some((tag, rest)) = line.split_once(':') else {
            parsed.output.messages.push(line.to_string());
            continue;
        };
        let message = rest.strip_prefix(' ').unwrap_or(rest).to_string();
        match tag {
            "warning" => {
                parsed.output.severity = Severity::Warning;
                parsed.output.messages.push(message);
            }
            "error" => parsed.errors.push(message),
            "exit" => parsed.exit_code = message.trim().parse().ok(),
            "text" => parsed.output.messages.push(message),
            t if is_info_tag(t) => parsed.output.messages.push(message),
            _ => parsed.output.messages.push(line.to_string()),
        }
    }
    parsed
}

fn is_info_tag(tag: &str) -> bool {
    tag.strip_prefix("info")
        .is_some_and(|level| level.chars().all(|c| c.is_ascii_digit()))
}

/// Parses `-ztag` output into records.
///
/// Lines that are not `... ` fields become messages.
pub fn parse_tagged_output(stdout: &str) -> CommandOutput {
    let mut output = CommandOutput::default();
    let mut current = Record::new();
    for line in stdout.lines().map(|l| l.trim_end_matches('\r')) {
        if line.trim().is_empty() {
            if !current.is_empty() {
                output.records.push(std::mem::take(&mut current));
            }
            continue;
        }
        match line.strip_prefix("... ") {
            Some(field) => {
                let (key, value) = field.split_once(' ').unwrap_or((field, ""));
                current.insert(key, value);
            }
            None => output.messages.push(line.to_string()),
        }
    }
    if !current.is_empty() {
        output.records.push(current);
    }
    output
}

/// Whether depot error text describes a failure to reach the server.
pub fn is_connection_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("connect to server failed")
        || lower.contains("connection refused")
        || lower.contains("tcp connect")
        || lower.contains("network is unreachable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn script_output_up_to_date_is_single_warning_line() {
        let parsed = parse_script_output(
            "warning: c:\\enl\\intl\\...pl-pl\\...lcl - file(s) up-to-date.\r\nexit: 0\r\n",
        );
        assert_eq!(parsed.output.severity, Severity::Warning);
        assert_eq!(
            parsed.output.messages,
            vec!["c:\\enl\\intl\\...pl-pl\\...lcl - file(s) up-to-date."]
        );
        assert_eq!(parsed.exit_code, Some(0));
        assert!(!parsed.failed());
    }

    #[test]
    fn script_output_transfer_stays_info() {
        let parsed = parse_script_output(
            "info: //depot/a.lcl#3 - updating /enl/a.lcl\ninfo1: detail\ntext: raw\nexit: 0\n",
        );
        assert_eq!(parsed.output.severity, Severity::Info);
        assert_eq!(parsed.output.messages.len(), 3);
    }

    #[test]
    fn script_output_errors_mark_failure() {
        let parsed =
            parse_script_output("error: Connect to server failed; check $SDPORT.\nexit: 1\n");
        assert!(parsed.failed());
        assert_eq!(parsed.errors, vec!["Connect to server failed; check $SDPORT."]);
        assert!(is_connection_failure(&parsed.errors[0]));
    }

    #[test]
    fn script_output_keeps_unprefixed_lines() {
        let parsed = parse_script_output("View:\n\t//depot/dev14lab3/...\n");
        assert_eq!(parsed.output.messages, vec!["View:", "\t//depot/dev14lab3/..."]);
        assert_eq!(parsed.exit_code, None);
    }

    #[test]
    fn label_spec_in_script_mode_keeps_view_line_shape() {
        let parsed = parse_script_output("info: View:\ninfo: \t//depot/dev14lab3/...\nexit: 0\n");
        assert_eq!(parsed.output.messages, vec!["View:", "\t//depot/dev14lab3/..."]);
    }

    #[test]
    fn tagged_output_groups_records() {
        let output = parse_tagged_output(
            "... depotFile //depot/a.lcl\n... action edit\n\n... depotFile //depot/b.lcl\n... action add\n",
        );
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].get("depotFile"), Some("//depot/a.lcl"));
        assert_eq!(output.records[1].get("action"), Some("add"));
        assert!(output.messages.is_empty());
    }

    #[test]
    fn tagged_output_empty_is_no_records() {
        let output = parse_tagged_output("");
        assert!(output.records.is_empty());
    }

    #[rstest]
    #[case("Connect to server failed; check $SDPORT.", true)]
    #[case("TCP connect to depot:4000 failed.", true)]
    #[case("Label 'bld14_1_1000' doesn't exist.", false)]
    fn connection_failure_detection(#[case] message: &str, #[case] expected: bool) {
        assert_eq!(is_connection_failure(message), expected);
    }
}
