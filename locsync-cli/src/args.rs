//! Command-line model shared by `sync-core` and `sync-store`.
//!
//! The grammar is positional and is scanned token by token:
//!
//! ```text
//! -core  <lang> [<lang> ...]
//! -store <checkpoint> <lang> [<lang> ...]
//! -h | /h | ? | /?
//! ```
//!
//! Scanning stops at the first bad token; it is kept for the diagnostic and
//! the remaining tokens are ignored.

use thiserror::Error;

use locsync_core::types::looks_like_integer;
use locsync_core::{Checkpoint, DepotKind, Language};

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SyncCore,
    SyncStore,
    ShowHelp,
}

impl RunMode {
    /// The depot a sync mode targets; `None` for help.
    pub fn depot(self) -> Option<DepotKind> {
        match self {
            RunMode::SyncCore => Some(DepotKind::Core),
            RunMode::SyncStore => Some(DepotKind::Store),
            RunMode::ShowHelp => None,
        }
    }
}

/// Why a token stream does not form a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("no arguments given")]
    Empty,

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("-store requires a numeric checkpoint")]
    MissingCheckpoint,

    #[error("at least one language is required")]
    NoLanguages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ExpectingMode,
    ExpectingCheckpoint,
    ExpectingFirstCoreLanguage,
    ExpectingLanguages,
    Stopped,
}

/// Parsed invocation: run mode, optional checkpoint, languages in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    run_mode: Option<RunMode>,
    checkpoint: Option<Checkpoint>,
    languages: Vec<Language>,
    invalid_argument: Option<String>,
}

impl CommandLine {
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CommandLine::default();
        let mut state = ScanState::ExpectingMode;

        for token in tokens {
            let token = token.as_ref();
            if state == ScanState::Stopped {
                break;
            }
            if is_help(token) {
                parsed.run_mode = Some(RunMode::ShowHelp);
                state = ScanState::Stopped;
                continue;
            }

            state = match state {
                ScanState::ExpectingMode => match token.to_ascii_lowercase().as_str() {
                    "-core" => {
                        parsed.run_mode = Some(RunMode::SyncCore);
                        ScanState::ExpectingFirstCoreLanguage
                    }
                    "-store" => {
                        parsed.run_mode = Some(RunMode::SyncStore);
                        ScanState::ExpectingCheckpoint
                    }
                    _ => parsed.reject(token),
                },
                ScanState::ExpectingCheckpoint => match Checkpoint::parse(token) {
                    Some(checkpoint) => {
                        parsed.checkpoint = Some(checkpoint);
                        ScanState::ExpectingLanguages
                    }
                    None => parsed.reject(token),
                },
                // -core takes no checkpoint; a number here is a mistake.
                ScanState::ExpectingFirstCoreLanguage if looks_like_integer(token) => {
                    parsed.reject(token)
                }
                ScanState::ExpectingFirstCoreLanguage | ScanState::ExpectingLanguages => {
                    if token.starts_with('-') {
                        parsed.reject(token)
                    } else {
                        parsed.languages.push(Language::from(token));
                        ScanState::ExpectingLanguages
                    }
                }
                ScanState::Stopped => ScanState::Stopped,
            };
        }

        parsed
    }

    fn reject(&mut self, token: &str) -> ScanState {
        self.invalid_argument = Some(token.to_string());
        ScanState::Stopped
    }

    /// Checks the parsed stream forms a complete request (or asks for help).
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.run_mode == Some(RunMode::ShowHelp) {
            return Ok(());
        }
        if let Some(token) = &self.invalid_argument {
            return Err(ArgumentError::Invalid(token.clone()));
        }
        match self.run_mode {
            None => Err(ArgumentError::Empty),
            Some(RunMode::SyncStore) if self.checkpoint.is_none() => {
                Err(ArgumentError::MissingCheckpoint)
            }
            Some(_) if self.languages.is_empty() => Err(ArgumentError::NoLanguages),
            Some(_) => Ok(()),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn run_mode(&self) -> Option<RunMode> {
        self.run_mode
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn invalid_argument(&self) -> Option<&str> {
        self.invalid_argument.as_deref()
    }
}

fn is_help(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "-h" | "/h" | "?" | "/?"
    )
}

/// Usage text for `program`.
pub fn usage(program: &str) -> String {
    format!(
        "Syncs localization files from the depot.\n\
         \n\
         Usage:\n\
         \x20 {program} -core <language> [<language> ...]\n\
         \x20 {program} -store <checkpoint> <language> [<language> ...]\n\
         \x20 {program} -h | /h | ? | /?\n\
         \n\
         Examples:\n\
         \x20 {program} -core pl-pl de-de\n\
         \x20 {program} -store 4229 pl-pl\n\
         \n\
         Environment:\n\
         \x20 SRCROOT  core enlistment root (sd.ini in its parent)\n\
         \x20 STORE    store enlistment root (sd.ini inside it)\n"
    )
}
