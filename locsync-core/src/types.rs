//! Domain types for depot synchronization.
//!
//! Identifiers coming from the command line or from depot output are kept as
//! strongly-typed newtypes so that a language can never be passed where a
//! branch is expected.

use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A language identifier such as `"pl-pl"`.
///
/// Opaque to the synchronizer: the depot decides whether it names anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Language(pub String);

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A numeric build identifier, kept in the textual form it was supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checkpoint(String);

impl Checkpoint {
    /// Accepts `token` only if it parses as an integer.
    pub fn parse(token: &str) -> Option<Self> {
        looks_like_integer(token).then(|| Self(token.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The label naming this build: `bld14_<checkpoint>_1000`.
    pub fn label(&self) -> Label {
        Label(format!("bld14_{}_1000", self.0))
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns `true` when `token` parses as a signed 64-bit integer.
pub fn looks_like_integer(token: &str) -> bool {
    token.parse::<i64>().is_ok()
}

/// A named, fixed view of the depot at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The depot branch a label was taken from, e.g. `dev14lab3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(pub String);

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A path expression selecting a set of versioned files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePattern(pub String);

impl FilePattern {
    /// Pins the pattern to a label: `<pattern>@<label>`.
    pub fn at_label(&self, label: &Label) -> FilePattern {
        FilePattern(format!("{}@{}", self.0, label.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FilePattern {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Depot variants
// ---------------------------------------------------------------------------

/// Which of the two depots a sync targets.
///
/// Each variant fixes the root environment variable, the location of the
/// enlistment ini, the per-language file pattern and whether a label must be
/// resolved before syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepotKind {
    Core,
    Store,
}

impl DepotKind {
    /// Environment variable holding the enlistment root.
    pub fn root_env_var(self) -> &'static str {
        match self {
            DepotKind::Core => "SRCROOT",
            DepotKind::Store => "STORE",
        }
    }

    /// `<root>/../sd.ini` for core, `<root>/sd.ini` for store.
    pub fn ini_path(self, root: &Path) -> PathBuf {
        match self {
            DepotKind::Core => root.join("..").join("sd.ini"),
            DepotKind::Store => root.join("sd.ini"),
        }
    }

    /// Files holding translations for `language` under `root`.
    pub fn file_pattern(self, root: &str, language: &Language) -> FilePattern {
        let root = root.trim_end_matches(['/', '\\']);
        let sep = MAIN_SEPARATOR;
        match self {
            DepotKind::Core => {
                FilePattern(format!("{root}{sep}intl{sep}...{language}{sep}...lcl"))
            }
            DepotKind::Store => FilePattern(format!("{root}{sep}intl_...{language}{sep}...lct")),
        }
    }

    /// Only store syncs are pinned to a labelled build.
    pub fn requires_label(self) -> bool {
        matches!(self, DepotKind::Store)
    }
}

impl fmt::Display for DepotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepotKind::Core => write!(f, "core"),
            DepotKind::Store => write!(f, "store"),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// Terminal outcome of a synchronizer run; doubles as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionResult {
    Success,
    InvalidArguments,
    UnsupportedRunMode,
    NoEnlistment,
    BadEnlistment,
    WrongLanguage,
    BadEnlistmentStateFilesOpened,
    FailedSync,
    BadEnlistmentStateConnectionFailed,
    FailedSyncLabelNotPresent,
}

impl ExecutionResult {
    pub const ALL: [ExecutionResult; 10] = [
        ExecutionResult::Success,
        ExecutionResult::InvalidArguments,
        ExecutionResult::UnsupportedRunMode,
        ExecutionResult::NoEnlistment,
        ExecutionResult::BadEnlistment,
        ExecutionResult::WrongLanguage,
        ExecutionResult::BadEnlistmentStateFilesOpened,
        ExecutionResult::FailedSync,
        ExecutionResult::BadEnlistmentStateConnectionFailed,
        ExecutionResult::FailedSyncLabelNotPresent,
    ];

    /// Process exit code; `0` only for [`ExecutionResult::Success`].
    pub fn exit_code(self) -> u8 {
        match self {
            ExecutionResult::Success => 0,
            ExecutionResult::InvalidArguments => 1,
            ExecutionResult::UnsupportedRunMode => 2,
            ExecutionResult::NoEnlistment => 3,
            ExecutionResult::BadEnlistment => 4,
            ExecutionResult::WrongLanguage => 5,
            ExecutionResult::BadEnlistmentStateFilesOpened => 6,
            ExecutionResult::FailedSync => 7,
            ExecutionResult::BadEnlistmentStateConnectionFailed => 8,
            ExecutionResult::FailedSyncLabelNotPresent => 9,
        }
    }

    pub fn is_success(self) -> bool {
        self == ExecutionResult::Success
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExecutionResult::Success => "success",
            ExecutionResult::InvalidArguments => "invalid arguments",
            ExecutionResult::UnsupportedRunMode => "unsupported run mode",
            ExecutionResult::NoEnlistment => "no enlistment",
            ExecutionResult::BadEnlistment => "bad enlistment",
            ExecutionResult::WrongLanguage => "wrong language",
            ExecutionResult::BadEnlistmentStateFilesOpened => "files opened for edit",
            ExecutionResult::FailedSync => "sync failed",
            ExecutionResult::BadEnlistmentStateConnectionFailed => "depot connection failed",
            ExecutionResult::FailedSyncLabelNotPresent => "label not present",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[test]
    fn checkpoint_label_follows_build_naming() {
        let cp = Checkpoint::parse("4229").expect("numeric");
        assert_eq!(cp.label(), Label("bld14_4229_1000".to_string()));
    }

    #[rstest]
    #[case("pl-pl")]
    #[case("")]
    #[case("42.5")]
    #[case("4229a")]
    fn checkpoint_rejects_non_numeric_tokens(#[case] token: &str) {
        assert!(Checkpoint::parse(token).is_none(), "{token}");
    }

    #[test]
    fn pattern_at_label_appends_revision_specifier() {
        let pattern = FilePattern::from("root/intl_...pl-pl/...lct");
        let pinned = pattern.at_label(&Label("bld14_1_1000".to_string()));
        assert_eq!(pinned.as_str(), "root/intl_...pl-pl/...lct@bld14_1_1000");
    }

    #[test]
    fn core_and_store_patterns_differ_in_layout_and_extension() {
        let sep = MAIN_SEPARATOR;
        let lang = Language::from("pl-pl");
        assert_eq!(
            DepotKind::Core.file_pattern("root", &lang).0,
            format!("root{sep}intl{sep}...pl-pl{sep}...lcl")
        );
        assert_eq!(
            DepotKind::Store.file_pattern("root/", &lang).0,
            format!("root{sep}intl_...pl-pl{sep}...lct")
        );
    }

    #[test]
    fn ini_paths_follow_enlistment_layout() {
        let root = Path::new("/enl/src");
        assert_eq!(
            DepotKind::Core.ini_path(root),
            PathBuf::from("/enl/src/../sd.ini")
        );
        assert_eq!(
            DepotKind::Store.ini_path(root),
            PathBuf::from("/enl/src/sd.ini")
        );
    }

    #[rstest]
    #[case(ExecutionResult::Success, 0)]
    #[case(ExecutionResult::InvalidArguments, 1)]
    #[case(ExecutionResult::UnsupportedRunMode, 2)]
    #[case(ExecutionResult::NoEnlistment, 3)]
    #[case(ExecutionResult::BadEnlistment, 4)]
    #[case(ExecutionResult::WrongLanguage, 5)]
    #[case(ExecutionResult::BadEnlistmentStateFilesOpened, 6)]
    #[case(ExecutionResult::FailedSync, 7)]
    #[case(ExecutionResult::BadEnlistmentStateConnectionFailed, 8)]
    #[case(ExecutionResult::FailedSyncLabelNotPresent, 9)]
    fn exit_code_table(#[case] result: ExecutionResult, #[case] code: u8) {
        assert_eq!(result.exit_code(), code);
    }

    #[test]
    fn exit_codes_are_distinct_and_zero_only_for_success() {
        let codes: HashSet<u8> = ExecutionResult::ALL.iter().map(|r| r.exit_code()).collect();
        assert_eq!(codes.len(), ExecutionResult::ALL.len());
        for result in ExecutionResult::ALL {
            assert_eq!(result.exit_code() == 0, result.is_success(), "{result}");
        }
    }
}
