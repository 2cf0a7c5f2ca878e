//! The table log: versioned commit storage and snapshot construction.
//!
//! [`LogStore`] is the storage collaborator the transaction engine commits
//! through. Its correctness contract:
//!
//! - Atomic visibility: a commit written by [`append_if_absent`] becomes
//!   visible all at once.
//! - Mutual exclusion: only one writer can create the commit for a given
//!   version; every other writer observes [`AppendOutcome::VersionTaken`].
//! - Consistent listing: once version `v` exists, [`latest_version`] returns
//!   at least `v`.
//!
//! [`append_if_absent`]: LogStore::append_if_absent
//! [`latest_version`]: LogStore::latest_version

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::actions::Action;
use crate::error::{Error, TableResult};
use crate::snapshot::{Snapshot, SnapshotRef};
use crate::transaction::{PostCommitHook, Transaction};
use crate::utils::require;
use crate::Version;

/// Directory under the table root holding the commit files.
pub const LOG_DIR_NAME: &str = "_tablelog";

/// Result of an [`LogStore::append_if_absent`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The commit file was created; the version now exists.
    Committed,
    /// Another writer created this version first. Nothing was written.
    VersionTaken,
}

/// Storage for the versioned commit files of one table.
pub trait LogStore: Send + Sync {
    /// The highest committed version, or `None` for an empty log.
    fn latest_version(&self) -> TableResult<Option<Version>>;

    /// Reads the action sequence committed at `version`.
    fn read_commit(&self, version: Version) -> TableResult<Vec<Action>>;

    /// Atomically writes `actions` as `version` iff that version does not
    /// exist yet. This is the only synchronization point between concurrent
    /// writers.
    fn append_if_absent(&self, version: Version, actions: &[Action])
        -> TableResult<AppendOutcome>;
}

fn commit_lines(actions: &[Action]) -> TableResult<String> {
    let lines = actions
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

fn parse_commit_lines(content: &str) -> TableResult<Vec<Action>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}

/// A [`LogStore`] over a local filesystem directory. Commit files live under
/// `<table_root>/_tablelog/` named by zero-padded version
/// (`00000000000000000000.json`). Atomicity comes from create-new file
/// semantics.
#[derive(Debug)]
pub struct FileSystemLogStore {
    log_dir: PathBuf,
}

impl FileSystemLogStore {
    pub fn new(table_root: impl AsRef<Path>) -> Self {
        Self {
            log_dir: table_root.as_ref().join(LOG_DIR_NAME),
        }
    }

    fn commit_path(&self, version: Version) -> PathBuf {
        self.log_dir.join(format!("{version:020}.json"))
    }
}

impl LogStore for FileSystemLogStore {
    fn latest_version(&self) -> TableResult<Option<Version>> {
        if !self.log_dir.exists() {
            return Ok(None);
        }
        let mut latest = None;
        for entry in std::fs::read_dir(&self.log_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let version = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<Version>().ok());
            if let Some(version) = version {
                latest = latest.max(Some(version));
            }
        }
        Ok(latest)
    }

    fn read_commit(&self, version: Version) -> TableResult<Vec<Action>> {
        let content = std::fs::read_to_string(self.commit_path(version))?;
        parse_commit_lines(&content)
    }

    fn append_if_absent(
        &self,
        version: Version,
        actions: &[Action],
    ) -> TableResult<AppendOutcome> {
        std::fs::create_dir_all(&self.log_dir)?;
        let path = self.commit_path(version);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(AppendOutcome::VersionTaken)
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(commit_lines(actions)?.as_bytes())?;
        file.sync_all()?;
        debug!(version, path = %path.display(), "wrote commit file");
        Ok(AppendOutcome::Committed)
    }
}

/// An in-memory [`LogStore`]. Used in tests and wherever a scratch table is
/// handy.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    commits: RwLock<BTreeMap<Version, Vec<Action>>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for InMemoryLogStore {
    fn latest_version(&self) -> TableResult<Option<Version>> {
        Ok(self.commits.read().keys().next_back().copied())
    }

    fn read_commit(&self, version: Version) -> TableResult<Vec<Action>> {
        self.commits
            .read()
            .get(&version)
            .cloned()
            .ok_or_else(|| Error::generic(format!("No commit at version {version}")))
    }

    fn append_if_absent(
        &self,
        version: Version,
        actions: &[Action],
    ) -> TableResult<AppendOutcome> {
        match self.commits.write().entry(version) {
            std::collections::btree_map::Entry::Occupied(_) => Ok(AppendOutcome::VersionTaken),
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(actions.to_vec());
                Ok(AppendOutcome::Committed)
            }
        }
    }
}

/// Handle to one table's log. Builds snapshots by replay and starts
/// transactions against them.
pub struct TableLog {
    location: String,
    store: Arc<dyn LogStore>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
}

impl TableLog {
    pub fn new(location: impl Into<String>, store: Arc<dyn LogStore>) -> Self {
        Self {
            location: location.into(),
            store,
            hooks: Vec::new(),
        }
    }

    /// Registers a hook every transaction started from this log will run
    /// after a successful commit. Individual transactions may unregister it
    /// by name before committing.
    pub fn with_post_commit_hook(mut self, hook: Arc<dyn PostCommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub(crate) fn post_commit_hooks(&self) -> &[Arc<dyn PostCommitHook>] {
        &self.hooks
    }

    /// True when the log has at least one committed version.
    pub fn table_exists(&self) -> TableResult<bool> {
        Ok(self.store.latest_version()?.is_some())
    }

    /// The latest snapshot. For an empty log this is [`Snapshot::initial`].
    pub fn update(&self) -> TableResult<SnapshotRef> {
        match self.store.latest_version()? {
            None => Ok(Arc::new(Snapshot::initial())),
            Some(version) => self.snapshot_at(version),
        }
    }

    /// The snapshot as of `version`.
    pub fn snapshot_at(&self, version: Version) -> TableResult<SnapshotRef> {
        require!(
            version != crate::PRE_COMMIT_VERSION,
            Error::generic("Cannot read a snapshot at the pre-commit sentinel version")
        );
        let commits = (0..=version)
            .map(|v| Ok((v, self.store.read_commit(v)?)))
            .collect::<TableResult<Vec<_>>>()?;
        Ok(Arc::new(Snapshot::replay(commits)?))
    }

    /// Starts a transaction against the latest snapshot, or against
    /// `pinned` when the caller already holds the snapshot it wants to read
    /// from.
    pub fn start_transaction(
        self: &Arc<Self>,
        pinned: Option<SnapshotRef>,
    ) -> TableResult<Transaction> {
        let snapshot = match pinned {
            Some(snapshot) => snapshot,
            None => self.update()?,
        };
        Transaction::try_new(Arc::clone(self), snapshot)
    }
}

impl std::fmt::Debug for TableLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableLog")
            .field("location", &self.location)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::AddFile;

    fn add(path: &str) -> Action {
        Action::Add(AddFile {
            path: path.to_string(),
            data_change: true,
            ..Default::default()
        })
    }

    #[test]
    fn filesystem_store_writes_zero_padded_commit_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemLogStore::new(dir.path());
        assert_eq!(store.latest_version().unwrap(), None);

        let outcome = store.append_if_absent(0, &[add("a.parquet")]).unwrap();
        assert_eq!(outcome, AppendOutcome::Committed);
        assert!(dir
            .path()
            .join(LOG_DIR_NAME)
            .join("00000000000000000000.json")
            .is_file());
        assert_eq!(store.latest_version().unwrap(), Some(0));
        assert_eq!(store.read_commit(0).unwrap(), vec![add("a.parquet")]);
    }

    #[test]
    fn filesystem_store_append_is_create_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemLogStore::new(dir.path());
        store.append_if_absent(0, &[add("first")]).unwrap();
        let outcome = store.append_if_absent(0, &[add("second")]).unwrap();
        assert_eq!(outcome, AppendOutcome::VersionTaken);
        // The loser wrote nothing.
        assert_eq!(store.read_commit(0).unwrap(), vec![add("first")]);
    }

    #[test]
    fn in_memory_store_append_is_create_if_absent() {
        let store = InMemoryLogStore::new();
        assert_eq!(
            store.append_if_absent(0, &[add("first")]).unwrap(),
            AppendOutcome::Committed
        );
        assert_eq!(
            store.append_if_absent(0, &[add("second")]).unwrap(),
            AppendOutcome::VersionTaken
        );
        assert_eq!(store.read_commit(0).unwrap(), vec![add("first")]);
    }

    #[test]
    fn update_replays_the_whole_log() {
        let store = Arc::new(InMemoryLogStore::new());
        store.append_if_absent(0, &[add("a.parquet")]).unwrap();
        store
            .append_if_absent(
                1,
                &[Action::Remove(crate::actions::RemoveFile {
                    path: "a.parquet".to_string(),
                    deletion_timestamp: Some(1),
                    data_change: true,
                    ..Default::default()
                })],
            )
            .unwrap();

        let log = Arc::new(TableLog::new("memory://table", store));
        let snapshot = log.update().unwrap();
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.active_files().is_empty());

        let earlier = log.snapshot_at(0).unwrap();
        assert_eq!(earlier.active_files().len(), 1);
    }

    #[test]
    fn update_on_an_empty_log_is_the_initial_snapshot() {
        let log = Arc::new(TableLog::new(
            "memory://table",
            Arc::new(InMemoryLogStore::new()) as Arc<dyn LogStore>,
        ));
        let snapshot = log.update().unwrap();
        assert!(snapshot.is_initial());
        assert!(!log.table_exists().unwrap());
    }
}
