//! Entry point shared by the `sync-core` and `sync-store` executables.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use locsync_client::ProcessConnector;
use locsync_core::{DepotKind, ExecutionResult, ProcessEnv};
use locsync_sync::{SyncTarget, Synchronizer};

use crate::args::{usage, CommandLine, RunMode};

// ---------------------------------------------------------------------------
// Raw arguments
// ---------------------------------------------------------------------------

/// Collects every token verbatim; the grammar lives in [`CommandLine`].
///
/// Help and version flags are disabled so `-h` and `/?` reach the token
/// scanner like any other argument.
#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub tokens: Vec<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

/// Parses the process arguments, runs, and maps the outcome to an exit code.
pub fn main_for(supported: DepotKind, program: &str) -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            eprint!("{}", usage(program));
            return exit_code(ExecutionResult::InvalidArguments);
        }
    };

    match run(supported, program, &cli.tokens) {
        Ok(result) => exit_code(result),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Runs one invocation of the executable that supports `supported`.
pub fn run(supported: DepotKind, program: &str, tokens: &[String]) -> Result<ExecutionResult> {
    let command_line = CommandLine::parse(tokens);
    if let Err(err) = command_line.validate() {
        eprintln!("{err}");
        eprint!("{}", usage(program));
        return Ok(ExecutionResult::InvalidArguments);
    }

    let requested = match command_line.run_mode() {
        Some(RunMode::ShowHelp) => {
            print!("{}", usage(program));
            return Ok(ExecutionResult::Success);
        }
        Some(mode) => mode.depot(),
        None => None,
    };
    let Some(kind) = requested else {
        return Ok(ExecutionResult::InvalidArguments);
    };
    if kind != supported {
        eprintln!("{program} does not sync the {kind} depot");
        return Ok(ExecutionResult::UnsupportedRunMode);
    }

    let target = match kind {
        DepotKind::Core => SyncTarget::Core,
        DepotKind::Store => SyncTarget::Store {
            checkpoint: command_line
                .checkpoint()
                .cloned()
                .context("store sync parsed without a checkpoint")?,
        },
    };

    let connector = ProcessConnector::from_env(&ProcessEnv);
    tracing::debug!(
        depot = %kind,
        languages = command_line.languages().len(),
        timeout_secs = connector.timeout().map(|t| t.as_secs()),
        "starting sync"
    );
    let result = Synchronizer::new(connector).synchronize(&target, command_line.languages());
    print_status(kind, result);
    Ok(result)
}

fn print_status(kind: DepotKind, result: ExecutionResult) {
    if result.is_success() {
        println!("{} {kind} sync complete", "✓".green());
    } else {
        println!(
            "{} {kind} sync failed: {result} (exit {})",
            "✗".red(),
            result.exit_code()
        );
    }
}

fn exit_code(result: ExecutionResult) -> ExitCode {
    ExitCode::from(result.exit_code())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[rstest]
    #[case(DepotKind::Core, &["-h"], ExecutionResult::Success)]
    #[case(DepotKind::Store, &["/?"], ExecutionResult::Success)]
    #[case(DepotKind::Core, &[], ExecutionResult::InvalidArguments)]
    #[case(DepotKind::Core, &["-core", "4229", "pl-pl"], ExecutionResult::InvalidArguments)]
    #[case(DepotKind::Store, &["-store", "pl-pl"], ExecutionResult::InvalidArguments)]
    #[case(DepotKind::Core, &["-store", "4229", "pl-pl"], ExecutionResult::UnsupportedRunMode)]
    #[case(DepotKind::Store, &["-core", "pl-pl"], ExecutionResult::UnsupportedRunMode)]
    fn outcomes_decided_before_touching_the_depot(
        #[case] supported: DepotKind,
        #[case] raw: &[&str],
        #[case] expected: ExecutionResult,
    ) {
        let result = run(supported, "sync-test", &tokens(raw)).expect("run");
        assert_eq!(result, expected);
    }

    #[test]
    fn cli_keeps_help_and_mode_tokens_verbatim() {
        let cli = Cli::try_parse_from(["sync-core", "-core", "-h", "/?", "pl-pl"]).expect("parse");
        assert_eq!(cli.tokens, tokens(&["-core", "-h", "/?", "pl-pl"]));
    }

    #[test]
    fn cli_accepts_no_tokens() {
        let cli = Cli::try_parse_from(["sync-store"]).expect("parse");
        assert!(cli.tokens.is_empty());
    }
}
