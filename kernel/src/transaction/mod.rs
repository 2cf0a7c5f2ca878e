//! Optimistic transactions over the table log.
//!
//! A [`Transaction`] is a single-owner staging area bound to the snapshot it
//! read. Mutations (a metadata replacement, a protocol upgrade, domain
//! metadata changes) are staged on the transaction; [`Transaction::commit`]
//! turns the staged state plus the caller's file actions into one atomic
//! append at `read_version + 1`.
//!
//! Commits are optimistic. There is no lock manager: the append either
//! creates the contested version or observes that a concurrent transaction
//! won it. On a loss the transaction re-reads the latest snapshot and
//! re-validates its staged invariants against the winner's metadata and
//! protocol. A compatible winner (say, a concurrent file append) makes the
//! collision benign and the commit retries at the next version; an
//! incompatible one fails the commit with a conflict error naming what
//! changed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::actions::{
    Action, AddFile, CommitInfo, DomainMetadata, Metadata, Protocol, INTERNAL_DOMAIN_PREFIX,
};
use crate::error::{Error, TableResult};
use crate::log::{AppendOutcome, TableLog};
use crate::snapshot::{Snapshot, SnapshotRef};
use crate::utils::{current_time_ms, require};
use crate::Version;

pub mod create_table;

/// How many append attempts a commit makes before giving up, unless the
/// caller overrides it with [`Transaction::with_max_commit_attempts`].
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

/// The operation a commit performs, persisted in its `commitInfo` action and
/// visible to anyone reading the table history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    CreateOrReplaceTable,
    ReplaceTable,
    Write,
    Truncate,
    ManualUpdate,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTable => "CREATE TABLE",
            Self::CreateOrReplaceTable => "CREATE OR REPLACE TABLE",
            Self::ReplaceTable => "REPLACE TABLE",
            Self::Write => "WRITE",
            Self::Truncate => "TRUNCATE",
            Self::ManualUpdate => "Manual Update",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named callback run after a successful commit, outside the transaction
/// boundary. Catalog updates and external-format conversion plug in here.
///
/// Hook failures are logged and never fail the already-committed
/// transaction.
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, log: &TableLog, committed: &CommittedTransaction) -> TableResult<()>;
}

/// A transaction represents an in-progress change to a table. Stage changes
/// via the mutation methods, then consume the transaction with
/// [`commit`](Self::commit). Ownership makes the terminal state final: a
/// committed (or failed) transaction cannot be committed again.
pub struct Transaction {
    span: tracing::Span,
    log: Arc<TableLog>,
    read_snapshot: SnapshotRef,
    // commit-wide timestamp (millis since epoch); stamps the commit info and
    // every removal tombstone of this transaction.
    commit_timestamp: i64,
    started_at: Instant,
    engine_info: Option<String>,
    // staged state; None means "unchanged from the read snapshot"
    metadata: Option<Metadata>,
    protocol: Option<Protocol>,
    domain_metadata_additions: Vec<DomainMetadata>,
    domain_removals: Vec<String>,
    post_commit_hooks: Vec<Arc<dyn PostCommitHook>>,
    max_commit_attempts: u32,
    commit_deadline: Option<Duration>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("read_version", &self.read_snapshot.version())
            .field("metadata_staged", &self.metadata.is_some())
            .field("protocol_staged", &self.protocol.is_some())
            .finish()
    }
}

impl Transaction {
    /// Creates a transaction bound to `read_snapshot`. The typical entry
    /// point is [`TableLog::start_transaction`].
    pub(crate) fn try_new(log: Arc<TableLog>, read_snapshot: SnapshotRef) -> TableResult<Self> {
        let span = tracing::info_span!(
            "txn",
            path = %log.location(),
            read_version = read_snapshot.version(),
        );
        let post_commit_hooks = log.post_commit_hooks().to_vec();
        Ok(Transaction {
            span,
            log,
            read_snapshot,
            commit_timestamp: current_time_ms()?,
            started_at: Instant::now(),
            engine_info: None,
            metadata: None,
            protocol: None,
            domain_metadata_additions: vec![],
            domain_removals: vec![],
            post_commit_hooks,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            commit_deadline: None,
        })
    }

    /// The version this transaction reads from.
    pub fn read_version(&self) -> Version {
        self.read_snapshot.version()
    }

    /// The snapshot this transaction reads from. This stays the pre-commit
    /// baseline even after a successful commit; observing the committed state
    /// requires a fresh [`TableLog::update`].
    pub fn snapshot(&self) -> &SnapshotRef {
        &self.read_snapshot
    }

    /// The effective metadata: staged if any, else the read snapshot's.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref().or(self.read_snapshot.metadata())
    }

    /// True when staged metadata differs from the pre-commit baseline.
    pub fn metadata_changed(&self) -> bool {
        match &self.metadata {
            Some(staged) => Some(staged) != self.read_snapshot.metadata(),
            None => false,
        }
    }

    /// The effective protocol: staged if any, else the read snapshot's.
    pub fn protocol(&self) -> Option<&Protocol> {
        self.protocol.as_ref().or(self.read_snapshot.protocol())
    }

    /// True when staged protocol differs from the pre-commit baseline.
    pub fn protocol_changed(&self) -> bool {
        match &self.protocol {
            Some(staged) => Some(staged) != self.read_snapshot.protocol(),
            None => false,
        }
    }

    /// Sets the engine info recorded in this transaction's commit info.
    pub fn with_engine_info(mut self, engine_info: impl Into<String>) -> Self {
        self.engine_info = Some(engine_info.into());
        self
    }

    /// Bounds how many append attempts [`commit`](Self::commit) makes when it
    /// keeps losing benign version races. At least one attempt always runs.
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    /// Bounds the wall-clock time [`commit`](Self::commit) may spend,
    /// measured from transaction start. When the deadline elapses before the
    /// append lands the commit fails with [`Error::CommitTimeout`].
    pub fn with_commit_deadline(mut self, deadline: Duration) -> Self {
        self.commit_deadline = Some(deadline);
        self
    }

    /// Removes a post-commit hook by name. Used to suppress a default hook
    /// when its work will be run inline by the caller instead.
    pub fn unregister_post_commit_hook(&mut self, name: &str) {
        self.post_commit_hooks.retain(|hook| hook.name() != name);
    }

    /// Stages a wholesale metadata replacement for a table-creation or
    /// replace flow. Staging again overwrites the previous stage; the last
    /// write wins within this transaction.
    pub fn update_metadata_for_new_table(&mut self, metadata: Metadata) -> TableResult<()> {
        // Surface a broken schema string here rather than at first read.
        metadata.parse_schema()?;
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Stages a protocol upgrade. Downgrades are rejected; the log only moves
    /// protocol versions forward.
    pub fn update_protocol(&mut self, protocol: Protocol) -> TableResult<()> {
        if let Some(current) = self.protocol() {
            require!(
                !current.is_downgrade_to(&protocol),
                Error::ProtocolDowngrade(format!(
                    "current is reader {} writer {}, requested reader {} writer {}",
                    current.min_reader_version,
                    current.min_writer_version,
                    protocol.min_reader_version,
                    protocol.min_writer_version,
                ))
            );
        }
        self.protocol = Some(protocol);
        Ok(())
    }

    /// Stages domain metadata to be written by this transaction. Each domain
    /// may appear at most once per transaction; duplicates fail the commit.
    pub fn set_domain_metadata(
        &mut self,
        domain: impl Into<String>,
        configuration: impl Into<String>,
    ) -> TableResult<()> {
        let domain = domain.into();
        require!(
            !domain.starts_with(INTERNAL_DOMAIN_PREFIX),
            Error::generic(format!(
                "Cannot modify domains that start with '{INTERNAL_DOMAIN_PREFIX}' as those are system controlled"
            ))
        );
        self.domain_metadata_additions
            .push(DomainMetadata::new(domain, configuration.into()));
        Ok(())
    }

    /// Stages removal of a domain. Removing a domain that does not exist in
    /// the read snapshot is a no-op; an existing one gets a tombstone
    /// preserving its previous configuration.
    pub fn remove_domain_metadata(&mut self, domain: impl Into<String>) -> TableResult<()> {
        let domain = domain.into();
        require!(
            !domain.starts_with(INTERNAL_DOMAIN_PREFIX),
            Error::generic(format!(
                "Cannot modify domains that start with '{INTERNAL_DOMAIN_PREFIX}' as those are system controlled"
            ))
        );
        self.domain_removals.push(domain);
        Ok(())
    }

    /// The data files active as of this transaction's read version. REPLACE
    /// flows turn each entry into a removal tombstone via
    /// [`AddFile::into_remove`] stamped with the operation's timestamp.
    pub fn filter_files(&self) -> &[AddFile] {
        self.read_snapshot.active_files()
    }

    /// The wall-clock timestamp (millis since epoch) shared by everything
    /// this transaction commits.
    pub fn commit_timestamp(&self) -> i64 {
        self.commit_timestamp
    }

    /// Consumes the transaction and atomically appends the staged state plus
    /// `actions` to the log.
    ///
    /// The append targets `read_version + 1`. When a concurrent transaction
    /// took that version first, the commit re-reads the latest snapshot and
    /// re-validates the staged schema/partitioning/configuration invariants
    /// and protocol monotonicity against it. A compatible winner makes the
    /// retry target the next version; an incompatible one fails with
    /// [`Error::Conflict`] naming the mismatch. Validation failures are never
    /// retried.
    #[instrument(
        parent = &self.span,
        name = "txn.commit",
        skip_all,
        fields(operation = %operation),
        err
    )]
    pub fn commit(
        self,
        actions: Vec<Action>,
        operation: Operation,
    ) -> TableResult<CommittedTransaction> {
        self.validate_domain_metadata_operations()?;

        let read_version = (!self.read_snapshot.is_initial()).then(|| self.read_snapshot.version());
        let commit_info = CommitInfo::new(
            self.commit_timestamp,
            operation.name().to_string(),
            self.engine_info.clone(),
            read_version,
        );

        // Commit info first, then protocol and metadata, then domain
        // metadata, then the caller's file actions.
        let mut all_actions = vec![Action::CommitInfo(commit_info)];
        if let Some(protocol) = &self.protocol {
            all_actions.push(Action::Protocol(protocol.clone()));
        }
        if let Some(metadata) = &self.metadata {
            all_actions.push(Action::Metadata(metadata.clone()));
        }
        all_actions.extend(
            self.domain_metadata_additions
                .iter()
                .cloned()
                .map(Action::DomainMetadata),
        );
        for domain in &self.domain_removals {
            if let Some(previous) = self.read_snapshot.domain_metadata(domain) {
                all_actions.push(Action::DomainMetadata(DomainMetadata::remove(
                    domain.clone(),
                    previous.to_string(),
                )));
            }
        }
        all_actions.extend(actions);

        info!(
            num_actions = all_actions.len(),
            metadata_staged = self.metadata.is_some(),
            protocol_staged = self.protocol.is_some(),
        );

        let mut snapshot = Arc::clone(&self.read_snapshot);
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(deadline) = self.commit_deadline {
                require!(
                    self.started_at.elapsed() <= deadline,
                    Error::CommitTimeout(deadline)
                );
            }

            // PRE_COMMIT_VERSION wraps to 0, the first version of a new table.
            let commit_version = snapshot.version().wrapping_add(1);
            match self
                .log
                .store()
                .append_if_absent(commit_version, &all_actions)?
            {
                AppendOutcome::Committed => {
                    info!(commit_version, "committed");
                    let committed = CommittedTransaction {
                        commit_version,
                        actions: all_actions,
                    };
                    self.run_post_commit_hooks(&committed);
                    return Ok(committed);
                }
                AppendOutcome::VersionTaken => {
                    info!(commit_version, "version taken by a concurrent commit");
                    let latest = self.log.update()?;
                    self.validate_rebase(&latest)?;
                    require!(
                        attempt < self.max_commit_attempts,
                        Error::Conflict {
                            version: commit_version,
                            reason: format!("gave up after {attempt} commit attempts"),
                        }
                    );
                    snapshot = latest;
                }
            }
        }
    }

    /// Checks that the staged invariants still hold against the snapshot a
    /// concurrent winner left behind. Passing means the collision was benign
    /// and the commit may retry at the next version.
    fn validate_rebase(&self, winner: &Snapshot) -> TableResult<()> {
        if let (Some(ours), Some(theirs)) = (self.protocol(), winner.protocol()) {
            require!(
                !ours.is_upgraded_by(theirs),
                Error::Conflict {
                    version: winner.version(),
                    reason: format!(
                        "protocol was upgraded concurrently to reader {} writer {}",
                        theirs.min_reader_version, theirs.min_writer_version
                    ),
                }
            );
        }
        if let (Some(ours), Some(theirs)) = (self.metadata(), winner.metadata()) {
            create_table::verify_metadata_matches(theirs, ours).map_err(|err| match err {
                Error::MetadataMismatch { property, detail } => Error::Conflict {
                    version: winner.version(),
                    reason: format!("{property} changed concurrently. {detail}"),
                },
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate_domain_metadata_operations(&self) -> TableResult<()> {
        let mut seen = HashSet::new();
        for dm in &self.domain_metadata_additions {
            require!(
                seen.insert(dm.domain()),
                Error::generic(format!(
                    "Metadata for domain {} already specified in this transaction",
                    dm.domain()
                ))
            );
        }
        for domain in &self.domain_removals {
            require!(
                seen.insert(domain.as_str()),
                Error::generic(format!(
                    "Metadata for domain {domain} already specified in this transaction"
                ))
            );
        }
        Ok(())
    }

    fn run_post_commit_hooks(&self, committed: &CommittedTransaction) {
        for hook in &self.post_commit_hooks {
            if let Err(err) = hook.invoke(&self.log, committed) {
                warn!(hook = hook.name(), error = %err, "post-commit hook failed");
            }
        }
    }
}

/// The result of a successfully committed [`Transaction`].
#[derive(Debug)]
pub struct CommittedTransaction {
    commit_version: Version,
    actions: Vec<Action>,
}

impl CommittedTransaction {
    /// The version this transaction committed.
    pub fn commit_version(&self) -> Version {
        self.commit_version
    }

    /// The full action sequence that was appended, commit info included.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}
