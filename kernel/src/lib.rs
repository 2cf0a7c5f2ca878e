//! The transactional core of the tablelog table format.
//!
//! A tablelog table is defined by an append-only log of versioned commits.
//! Each commit is a file holding an ordered sequence of [`Action`]s (one JSON
//! action per line) that evolve the table's metadata, protocol, and data-file
//! set. Readers materialize a [`Snapshot`] of the table at a version by
//! replaying the log; writers stage changes on a [`Transaction`] and commit
//! them with optimistic concurrency control: the commit either lands at
//! `read_version + 1` or observes a concurrent winner and re-validates before
//! retrying at the next version.
//!
//! The crate also contains the typed JSON decoder used to materialize
//! [`ColumnarBatch`]es from semi-structured records, and the schema
//! (de)serializer both the decoder and the log's `metaData` action rely on.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(FileSystemLogStore::new(table_root));
//! let log = Arc::new(TableLog::new(table_root_str, store));
//! let mut txn = log.start_transaction(None)?;
//! txn.update_metadata_for_new_table(metadata)?;
//! let committed = txn.commit(vec![], Operation::CreateTable)?;
//! assert_eq!(committed.commit_version(), 0);
//! ```
//!
//! [`Action`]: crate::actions::Action
//! [`Snapshot`]: crate::snapshot::Snapshot
//! [`Transaction`]: crate::transaction::Transaction
//! [`ColumnarBatch`]: crate::data::ColumnarBatch

pub mod actions;
pub mod data;
pub mod error;
pub mod log;
pub mod schema;
pub mod snapshot;
pub mod transaction;
pub(crate) mod utils;

pub use error::{Error, TableResult};

/// Type alias for the version of a table's log. Versions start at 0 and
/// increase by exactly one per committed transaction.
pub type Version = u64;

/// Sentinel version carried by snapshots of tables that have no committed
/// version yet. `PRE_COMMIT_VERSION.wrapping_add(1)` is 0, the first version
/// such a snapshot's transaction will commit.
pub const PRE_COMMIT_VERSION: Version = Version::MAX;
