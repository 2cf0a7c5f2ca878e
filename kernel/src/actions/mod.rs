//! Actions are the mutation records of the table log.
//!
//! A commit file holds an ordered sequence of actions, one JSON object per
//! line, each wrapped in a single-key object naming its variant
//! (`{"add": {...}}`, `{"metaData": {...}}`, ...). The sequence committed at
//! a version is atomic: replaying all commit files in version order yields
//! the table state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, TableResult};
use crate::schema::StructType;
use crate::utils::{current_time_ms, require};
use crate::Version;

/// Prefix reserved for system-controlled domain metadata. User transactions
/// may not set or remove domains under it.
pub const INTERNAL_DOMAIN_PREFIX: &str = "tablelog.";

/// One mutation record. The serialized form is the single-key wrapper object
/// used on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "metaData")]
    Metadata(Metadata),
    #[serde(rename = "protocol")]
    Protocol(Protocol),
    #[serde(rename = "add")]
    Add(AddFile),
    #[serde(rename = "remove")]
    Remove(RemoveFile),
    #[serde(rename = "domainMetadata")]
    DomainMetadata(DomainMetadata),
    #[serde(rename = "commitInfo")]
    CommitInfo(CommitInfo),
}

/// The storage format of a table's data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub provider: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            provider: "parquet".to_string(),
            options: HashMap::new(),
        }
    }
}

/// The table's metadata. Committing a new `metaData` action replaces the
/// previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Unique id, assigned once at creation and stable across replaces.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Format,
    /// The table schema in its serialized JSON form.
    pub schema_string: String,
    /// Ordered partition column names, a subset of the top-level fields.
    pub partition_columns: Vec<String>,
    pub configuration: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
}

impl Metadata {
    pub fn try_new(
        name: Option<String>,
        description: Option<String>,
        schema: &StructType,
        partition_columns: Vec<String>,
        configuration: HashMap<String, String>,
    ) -> TableResult<Self> {
        let mut seen = HashSet::new();
        for column in &partition_columns {
            require!(
                schema.field(column).is_some(),
                Error::schema(format!(
                    "Partition column {column} is not a top-level field of the schema"
                ))
            );
            require!(
                seen.insert(column.as_str()),
                Error::schema(format!("Duplicate partition column {column}"))
            );
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            format: Format::default(),
            schema_string: schema.to_json()?,
            partition_columns,
            configuration,
            created_time: Some(current_time_ms()?),
        })
    }

    /// Parses the stored schema string back into a [`StructType`].
    pub fn parse_schema(&self) -> TableResult<StructType> {
        StructType::try_from_json(&self.schema_string)
    }
}

/// Minimum reader/writer versions (and optional named feature sets) a client
/// must support to access the table. Versions only move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub min_reader_version: i32,
    pub min_writer_version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_features: Option<Vec<String>>,
}

impl Protocol {
    pub fn try_new(
        min_reader_version: i32,
        min_writer_version: i32,
        reader_features: Option<Vec<String>>,
        writer_features: Option<Vec<String>>,
    ) -> TableResult<Self> {
        require!(
            min_reader_version >= 1 && min_writer_version >= 1,
            Error::schema(format!(
                "Protocol versions must be at least 1, got reader {min_reader_version} writer {min_writer_version}"
            ))
        );
        Ok(Self {
            min_reader_version,
            min_writer_version,
            reader_features,
            writer_features,
        })
    }

    /// True when moving from `self` to `other` would lower either minimum
    /// version.
    pub fn is_downgrade_to(&self, other: &Protocol) -> bool {
        other.min_reader_version < self.min_reader_version
            || other.min_writer_version < self.min_writer_version
    }

    /// True when `other` requires strictly more than `self` on either axis.
    pub fn is_upgraded_by(&self, other: &Protocol) -> bool {
        other.min_reader_version > self.min_reader_version
            || other.min_writer_version > self.min_writer_version
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            min_reader_version: 1,
            min_writer_version: 2,
            reader_features: None,
            writer_features: None,
        }
    }
}

/// Adds a data file to the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFile {
    /// Path relative to the table root.
    pub path: String,
    #[serde(default)]
    pub partition_values: HashMap<String, String>,
    pub size: i64,
    pub modification_time: i64,
    /// Whether this file changes the logical contents of the table.
    pub data_change: bool,
    /// Per-file statistics in their serialized JSON form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,
}

impl AddFile {
    /// Turns this file entry into its removal tombstone, stamped with the
    /// removing operation's wall-clock timestamp.
    pub fn into_remove(self, deletion_timestamp: i64, data_change: bool) -> RemoveFile {
        RemoveFile {
            path: self.path,
            deletion_timestamp: Some(deletion_timestamp),
            data_change,
            partition_values: Some(self.partition_values),
            size: Some(self.size),
        }
    }
}

/// Logically deletes a data file from the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<i64>,
    pub data_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_values: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// Arbitrary per-domain configuration attached to the table. A removal is a
/// tombstone that keeps the previous configuration as its pre-image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetadata {
    pub domain: String,
    pub configuration: String,
    #[serde(default)]
    pub removed: bool,
}

impl DomainMetadata {
    pub fn new(domain: String, configuration: String) -> Self {
        Self {
            domain,
            configuration,
            removed: false,
        }
    }

    pub fn remove(domain: String, configuration: String) -> Self {
        Self {
            domain,
            configuration,
            removed: true,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Provenance of a commit. Always the first action of a commit; ignored by
/// replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub timestamp: i64,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_info: Option<String>,
    /// The version the committing transaction read, absent for the first
    /// commit of a table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_version: Option<Version>,
}

impl CommitInfo {
    pub fn new(
        timestamp: i64,
        operation: String,
        engine_info: Option<String>,
        read_version: Option<Version>,
    ) -> Self {
        Self {
            timestamp,
            operation,
            engine_info,
            read_version,
        }
    }
}
