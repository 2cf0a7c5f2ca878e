//! Materialized table state at a committed version.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::actions::{Action, AddFile, Metadata, Protocol};
use crate::error::{Error, TableResult};
use crate::utils::require;
use crate::{Version, PRE_COMMIT_VERSION};

pub type SnapshotRef = Arc<Snapshot>;

/// The state of a table as of one committed version: metadata, protocol, the
/// active file set, and domain metadata. Snapshots are immutable; transactions
/// reference them, they never copy or mutate them.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: Version,
    metadata: Option<Metadata>,
    protocol: Option<Protocol>,
    files: Vec<AddFile>,
    domain_metadata: HashMap<String, String>,
}

impl Snapshot {
    /// The snapshot of a table that has no committed version yet. Its version
    /// is the [`PRE_COMMIT_VERSION`] sentinel; a transaction bound to it
    /// commits version 0.
    pub fn initial() -> Self {
        Self {
            version: PRE_COMMIT_VERSION,
            metadata: None,
            protocol: None,
            files: Vec::new(),
            domain_metadata: HashMap::new(),
        }
    }

    /// Replays commits in version order into a snapshot. Commits must start
    /// at version 0 and be gap-free.
    pub(crate) fn replay(
        commits: impl IntoIterator<Item = (Version, Vec<Action>)>,
    ) -> TableResult<Self> {
        let mut version = None;
        let mut metadata = None;
        let mut protocol = None;
        let mut files: BTreeMap<String, AddFile> = BTreeMap::new();
        let mut domain_metadata = HashMap::new();

        for (commit_version, actions) in commits {
            let expected = version.map_or(0, |v: Version| v + 1);
            require!(
                commit_version == expected,
                Error::internal_error(format!(
                    "Log replay expected version {expected}, got {commit_version}"
                ))
            );
            version = Some(commit_version);

            for action in actions {
                match action {
                    Action::Metadata(m) => metadata = Some(m),
                    Action::Protocol(p) => protocol = Some(p),
                    Action::Add(add) => {
                        files.insert(add.path.clone(), add);
                    }
                    Action::Remove(remove) => {
                        files.remove(&remove.path);
                    }
                    Action::DomainMetadata(dm) => {
                        if dm.removed {
                            domain_metadata.remove(&dm.domain);
                        } else {
                            domain_metadata.insert(dm.domain, dm.configuration);
                        }
                    }
                    Action::CommitInfo(_) => {}
                }
            }
        }

        let version =
            version.ok_or_else(|| Error::internal_error("Log replay saw no commits"))?;
        Ok(Self {
            version,
            metadata,
            protocol,
            files: files.into_values().collect(),
            domain_metadata,
        })
    }

    /// The committed version this snapshot materializes, or
    /// [`PRE_COMMIT_VERSION`] for a table with no commits.
    pub fn version(&self) -> Version {
        self.version
    }

    /// True when this snapshot represents a table with no committed version.
    pub fn is_initial(&self) -> bool {
        self.version == PRE_COMMIT_VERSION
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn protocol(&self) -> Option<&Protocol> {
        self.protocol.as_ref()
    }

    /// The data files active as of this version, ordered by path.
    pub fn active_files(&self) -> &[AddFile] {
        &self.files
    }

    pub fn domain_metadata(&self, domain: &str) -> Option<&str> {
        self.domain_metadata.get(domain).map(String::as_str)
    }
}
