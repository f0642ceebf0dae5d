//! Per-language synchronization of a core or store enlistment.
//!
//! One [`Synchronizer::synchronize`] call walks:
//!
//! 1. locate the enlistment (root variable set, ini present) and read its
//!    connection settings;
//! 2. store only: resolve the checkpoint to a label and branch;
//! 3. for each language, in order, run the retrying sync of its pattern.
//!
//! The first failure ends the call; its error is mapped to the single
//! [`ExecutionResult`] returned. Languages are never synced concurrently.

use locsync_core::{
    Checkpoint, ConnectionSettings, DepotConnector, DepotKind, Enlistment, EnvSource,
    ExecutionResult, Language, ProcessEnv, SyncError,
};

use crate::label::resolve_branch;
use crate::retry::{sync_branch_file_pattern, sync_file_pattern, RetryPolicy, SyncReport};

/// What to sync to: the tip of the core depot or a labelled store build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    Core,
    Store { checkpoint: Checkpoint },
}

impl SyncTarget {
    pub fn kind(&self) -> DepotKind {
        match self {
            SyncTarget::Core => DepotKind::Core,
            SyncTarget::Store { .. } => DepotKind::Store,
        }
    }
}

/// Drives the sync of a list of languages against one depot.
#[derive(Debug, Clone)]
pub struct Synchronizer<C, E = ProcessEnv> {
    connector: C,
    env: E,
    policy: RetryPolicy,
}

impl<C: DepotConnector> Synchronizer<C, ProcessEnv> {
    /// Synchronizer reading the enlistment from the process environment.
    pub fn new(connector: C) -> Self {
        Self::with_env(connector, ProcessEnv)
    }
}

impl<C: DepotConnector, E: EnvSource> Synchronizer<C, E> {
    pub fn with_env(connector: C, env: E) -> Self {
        Self {
            connector,
            env,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Syncs every language in `languages`, stopping at the first failure.
    pub fn synchronize(&self, target: &SyncTarget, languages: &[Language]) -> ExecutionResult {
        match self.run(target, languages) {
            Ok(reports) => {
                tracing::info!(
                    depot = %target.kind(),
                    languages = reports.len(),
                    "synchronization complete"
                );
                ExecutionResult::Success
            }
            Err(result) => result,
        }
    }

    fn run(
        &self,
        target: &SyncTarget,
        languages: &[Language],
    ) -> Result<Vec<SyncReport>, ExecutionResult> {
        if languages.is_empty() {
            tracing::error!("no languages requested");
            return Err(ExecutionResult::InvalidArguments);
        }

        let kind = target.kind();
        let (enlistment, settings) = self.validate(kind)?;

        let pin = match target {
            SyncTarget::Core => None,
            SyncTarget::Store { checkpoint } => Some(
                resolve_branch(&self.connector, &settings, checkpoint).map_err(|e| e.result())?,
            ),
        };

        let mut reports = Vec::with_capacity(languages.len());
        for language in languages {
            let pattern = kind.file_pattern(&enlistment.root, language);
            tracing::info!(language = %language, pattern = %pattern, "syncing");

            let synced = match &pin {
                None => sync_file_pattern(
                    &self.connector,
                    &settings,
                    &pattern,
                    language,
                    &self.policy,
                ),
                Some((label, branch)) => sync_branch_file_pattern(
                    &self.connector,
                    &settings,
                    branch,
                    label,
                    &pattern,
                    language,
                    &self.policy,
                ),
            };

            match synced {
                Ok(report) => reports.push(report),
                Err(err) => return Err(report_failure(language, &err)),
            }
        }
        Ok(reports)
    }

    fn validate(&self, kind: DepotKind) -> Result<(Enlistment, ConnectionSettings), ExecutionResult> {
        let enlistment = Enlistment::locate(kind, &self.env).map_err(|err| {
            tracing::error!(depot = %kind, "{err}");
            err.result()
        })?;
        let settings = enlistment.connection_settings().map_err(|err| {
            tracing::error!(depot = %kind, "{err}");
            err.result()
        })?;
        tracing::debug!(
            depot = %kind,
            root = %enlistment.root,
            ini = %enlistment.ini_path.display(),
            "enlistment validated"
        );
        Ok((enlistment, settings))
    }
}

fn report_failure(language: &Language, err: &SyncError) -> ExecutionResult {
    let result = err.result();
    tracing::error!(language = %language, result = %result, "sync failed: {err}");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    use locsync_core::Record;
    use tempfile::TempDir;

    use crate::testing::{Reply, ScriptedDepot};

    struct Fixture {
        _dir: TempDir,
        env: HashMap<String, String>,
    }

    fn core_enlistment() -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(dir.path().join("sd.ini"), "SDPORT=core:2001\n").expect("ini");
        let env = HashMap::from([("SRCROOT".to_string(), src.to_string_lossy().to_string())]);
        Fixture { _dir: dir, env }
    }

    fn store_enlistment() -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("sd.ini"), "SDPORT=store:2002\n").expect("ini");
        let env = HashMap::from([(
            "STORE".to_string(),
            dir.path().to_string_lossy().to_string(),
        )]);
        Fixture { _dir: dir, env }
    }

    fn langs(raw: &[&str]) -> Vec<Language> {
        raw.iter().map(|l| Language::from(*l)).collect()
    }

    fn synchronizer(
        depot: &ScriptedDepot,
        fixture: &Fixture,
    ) -> Synchronizer<ScriptedDepot, HashMap<String, String>> {
        Synchronizer::with_env(depot.clone(), fixture.env.clone())
            .with_policy(RetryPolicy::immediate())
    }

    #[test]
    fn core_syncs_each_language_in_order() {
        let fixture = core_enlistment();
        let depot = ScriptedDepot::new();

        let result = synchronizer(&depot, &fixture)
            .synchronize(&SyncTarget::Core, &langs(&["pl-pl", "de-de"]));
        assert_eq!(result, ExecutionResult::Success);

        let synced: Vec<String> = depot
            .issued_named("sync")
            .into_iter()
            .map(|c| c.args.last().cloned().unwrap_or_default())
            .collect();
        assert_eq!(synced.len(), 2);
        assert!(synced[0].ends_with("...pl-pl/...lcl") || synced[0].ends_with("...pl-pl\\...lcl"));
        assert!(synced[1].contains("de-de"));
        assert_eq!(depot.connections_opened(), 2, "one connection per language");
        assert_eq!(depot.connections_released(), 2);
    }

    #[test]
    fn opened_file_aborts_before_next_language() {
        let fixture = core_enlistment();
        let depot = ScriptedDepot::new();
        depot.push(
            "opened",
            Reply::records(vec![Record::new().with("depotFile", "//depot/intl/pl-pl/a.lcl")]),
        );

        let result = synchronizer(&depot, &fixture)
            .synchronize(&SyncTarget::Core, &langs(&["pl-pl", "de-de"]));
        assert_eq!(result, ExecutionResult::BadEnlistmentStateFilesOpened);
        assert!(depot.issued_named("sync").is_empty());
        assert!(depot
            .issued()
            .iter()
            .all(|c| c.args.iter().all(|a| !a.contains("de-de"))));
    }

    #[test]
    fn missing_root_is_no_enlistment() {
        let depot = ScriptedDepot::new();
        let sync = Synchronizer::with_env(depot.clone(), HashMap::<String, String>::new());
        assert_eq!(
            sync.synchronize(&SyncTarget::Core, &langs(&["pl-pl"])),
            ExecutionResult::NoEnlistment
        );
        assert!(depot.issued().is_empty());
    }

    #[test]
    fn missing_ini_is_bad_enlistment() {
        let dir = TempDir::new().expect("tempdir");
        let env = HashMap::from([(
            "STORE".to_string(),
            dir.path().to_string_lossy().to_string(),
        )]);
        let depot = ScriptedDepot::new();
        let sync = Synchronizer::with_env(depot.clone(), env);
        let checkpoint = Checkpoint::parse("4229").expect("checkpoint");
        assert_eq!(
            sync.synchronize(&SyncTarget::Store { checkpoint }, &langs(&["pl-pl"])),
            ExecutionResult::BadEnlistment
        );
    }

    #[test]
    fn store_resolves_label_once_then_pins_every_language() {
        let fixture = store_enlistment();
        let depot = ScriptedDepot::new();
        depot.push("label", Reply::info(&["View:", "\t//depot/dev14lab3/..."]));

        let checkpoint = Checkpoint::parse("4229").expect("checkpoint");
        let result = synchronizer(&depot, &fixture)
            .synchronize(&SyncTarget::Store { checkpoint }, &langs(&["pl-pl", "de-de"]));
        assert_eq!(result, ExecutionResult::Success);

        assert_eq!(depot.issued_named("label").len(), 1);
        let syncs = depot.issued_named("sync");
        assert_eq!(syncs.len(), 2);
        for sync in &syncs {
            assert_eq!(sync.args[0], "-b");
            assert_eq!(sync.args[1], "dev14lab3");
            assert!(sync.args[2].ends_with("@bld14_4229_1000"));
            assert!(sync.args[2].contains("intl_..."));
        }
    }

    #[test]
    fn unresolvable_checkpoint_never_syncs() {
        let fixture = store_enlistment();
        let depot = ScriptedDepot::new();
        depot.push("label", Reply::info(&["Label:\tbld14_9_1000", "Owner:\tnobody"]));

        let checkpoint = Checkpoint::parse("9").expect("checkpoint");
        let result = synchronizer(&depot, &fixture)
            .synchronize(&SyncTarget::Store { checkpoint }, &langs(&["pl-pl"]));
        assert_eq!(result, ExecutionResult::FailedSyncLabelNotPresent);
        assert!(depot.issued_named("opened").is_empty());
        assert!(depot.issued_named("sync").is_empty());
    }

    #[test]
    fn wrong_language_stops_the_run() {
        let fixture = core_enlistment();
        let depot = ScriptedDepot::new();
        depot.push("sync", Reply::warning(&["x - no such file(s)."]));

        let result = synchronizer(&depot, &fixture)
            .synchronize(&SyncTarget::Core, &langs(&["xx-xx", "de-de"]));
        assert_eq!(result, ExecutionResult::WrongLanguage);
        assert_eq!(depot.issued_named("sync").len(), 1);
    }

    #[test]
    fn empty_language_list_is_invalid() {
        let fixture = core_enlistment();
        let depot = ScriptedDepot::new();
        let result = synchronizer(&depot, &fixture).synchronize(&SyncTarget::Core, &[]);
        assert_eq!(result, ExecutionResult::InvalidArguments);
    }
}
