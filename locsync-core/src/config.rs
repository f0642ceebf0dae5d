//! Enlistment discovery and depot connection settings.
//!
//! # Layout
//!
//! ```text
//! $SRCROOT/..            core enlistment
//!   sd.ini               SDPORT / SDCLIENT / SDUSER
//!   src/                 $SRCROOT
//! $STORE/                store enlistment
//!   sd.ini
//! ```
//!
//! # API pattern
//!
//! Environment access goes through [`EnvSource`] so tests can supply a map
//! instead of mutating the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EnlistmentError;
use crate::types::DepotKind;

// ---------------------------------------------------------------------------
// 1. Environment
// ---------------------------------------------------------------------------

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ---------------------------------------------------------------------------
// 2. Enlistment
// ---------------------------------------------------------------------------

/// A validated local workspace for one depot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enlistment {
    pub kind: DepotKind,
    pub root: String,
    pub ini_path: PathBuf,
}

impl Enlistment {
    /// Resolves the root from the environment and checks the ini exists.
    ///
    /// Returns `RootNotSet` when the variable is missing or blank and
    /// `IniMissing` when the ini file is not where the layout puts it.
    pub fn locate(kind: DepotKind, env: &impl EnvSource) -> Result<Self, EnlistmentError> {
        let var = kind.root_env_var();
        let root = env
            .var(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(EnlistmentError::RootNotSet { var })?;

        let ini_path = kind.ini_path(Path::new(&root));
        if !ini_path.is_file() {
            return Err(EnlistmentError::IniMissing { path: ini_path });
        }

        Ok(Self {
            kind,
            root,
            ini_path,
        })
    }

    /// Reads the enlistment ini into connection settings.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, EnlistmentError> {
        ConnectionSettings::load(&self.ini_path)
    }
}

// ---------------------------------------------------------------------------
// 3. Connection settings
// ---------------------------------------------------------------------------

/// How to reach a depot: server port, client workspace and user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub port: Option<String>,
    pub client: Option<String>,
    pub user: Option<String>,
    pub ini_path: Option<PathBuf>,
    /// Every `KEY=VALUE` pair in the file, keys upper-cased.
    entries: HashMap<String, String>,
}

impl ConnectionSettings {
    /// Loads settings from an ini file on disk.
    pub fn load(path: &Path) -> Result<Self, EnlistmentError> {
        if !path.is_file() {
            return Err(EnlistmentError::IniMissing {
                path: path.to_path_buf(),
            });
        }
        let contents =
            std::fs::read_to_string(path).map_err(|source| EnlistmentError::IniUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let mut settings = Self::parse(&contents);
        settings.ini_path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Parses `KEY=VALUE` lines; blank lines and `#`/`;` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_uppercase();
            if key.is_empty() {
                continue;
            }
            entries.insert(key, value.trim().to_string());
        }

        let pick = |key: &str| entries.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            port: pick("SDPORT"),
            client: pick("SDCLIENT"),
            user: pick("SDUSER"),
            ini_path: None,
            entries,
        }
    }

    /// Value of any key in the file, looked up case-insensitively.
    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// `SD*` settings other than port, client and user, sorted by key.
    ///
    /// The depot tool reads these (`SDPASSWD`, `SDCHARSET`, ...) from its
    /// environment.
    pub fn passthrough_entries(&self) -> Vec<(&str, &str)> {
        let mut extra: Vec<(&str, &str)> = self
            .entries
            .iter()
            .filter(|(key, value)| {
                key.starts_with("SD")
                    && !matches!(key.as_str(), "SDPORT" | "SDCLIENT" | "SDUSER")
                    && !value.is_empty()
            })
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        extra.sort_unstable();
        extra
    }

    /// Explicit port/client, bypassing any ini file.
    pub fn explicit(port: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            client: Some(client.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_reads_known_keys_case_insensitively() {
        let settings = ConnectionSettings::parse(
            "# enlistment\nsdport = depot:4000\nSDCLIENT=builder-ws\n; comment\n\nSDUSER=\n",
        );
        assert_eq!(settings.port.as_deref(), Some("depot:4000"));
        assert_eq!(settings.client.as_deref(), Some("builder-ws"));
        assert_eq!(settings.user, None, "blank values count as unset");
        assert_eq!(settings.entries.len(), 3);
    }

    #[test]
    fn unknown_keys_are_kept_and_sd_ones_passed_through() {
        let settings = ConnectionSettings::parse(
            "SDPORT=depot:4000\nsdcharset=utf8\nSDPASSWD=\nEDITOR=vi\nSDDIFF=windiff\n",
        );
        assert_eq!(settings.entry("editor"), Some("vi"));
        assert_eq!(settings.entry("SDCharset"), Some("utf8"));
        assert_eq!(
            settings.passthrough_entries(),
            vec![("SDCHARSET", "utf8"), ("SDDIFF", "windiff")]
        );
        assert!(ConnectionSettings::explicit("p:1", "ws")
            .passthrough_entries()
            .is_empty());
    }

    #[test]
    fn parse_ignores_lines_without_separator() {
        let settings = ConnectionSettings::parse("garbage\n=novalue\nSDPORT=x:1\n");
        assert_eq!(settings.port.as_deref(), Some("x:1"));
        assert_eq!(settings.entries.len(), 1);
    }

    #[test]
    fn locate_without_root_is_no_enlistment() {
        let err = Enlistment::locate(DepotKind::Core, &env(&[])).unwrap_err();
        assert!(matches!(err, EnlistmentError::RootNotSet { var: "SRCROOT" }));

        let err = Enlistment::locate(DepotKind::Store, &env(&[("STORE", "  ")])).unwrap_err();
        assert!(matches!(err, EnlistmentError::RootNotSet { var: "STORE" }));
    }

    #[test]
    fn locate_without_ini_is_bad_enlistment() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().to_string_lossy().to_string();
        let err = Enlistment::locate(DepotKind::Store, &env(&[("STORE", &root)])).unwrap_err();
        assert!(matches!(err, EnlistmentError::IniMissing { .. }), "got: {err}");
    }

    #[test]
    fn locate_core_finds_ini_above_root() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(dir.path().join("sd.ini"), "SDPORT=core:2001\nSDCLIENT=ws\n").expect("write");

        let root = src.to_string_lossy().to_string();
        let enlistment =
            Enlistment::locate(DepotKind::Core, &env(&[("SRCROOT", &root)])).expect("locate");
        assert_eq!(enlistment.root, root);

        let settings = enlistment.connection_settings().expect("settings");
        assert_eq!(settings.port.as_deref(), Some("core:2001"));
        assert_eq!(settings.ini_path.as_deref(), Some(enlistment.ini_path.as_path()));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sd.ini");
        let err = ConnectionSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("sd.ini"));
    }
}
