//! Error types for the tablelog kernel.

use std::time::Duration;

use crate::Version;

/// A specialized result type used throughout the crate.
pub type TableResult<T, E = Error> = std::result::Result<T, E>;

/// All the errors the kernel can surface.
///
/// Callers that drive commits should distinguish [`Error::Conflict`] (a
/// concurrent transaction won the version race with incompatible changes,
/// possibly worth re-staging and retrying) from the validation family
/// ([`Error::TableAlreadyExists`], [`Error::SchemaNotProvided`],
/// [`Error::LocationNotEmpty`], [`Error::MetadataMismatch`]), which will fail
/// again no matter how often they are retried.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A JSON literal could not be coerced to the requested data type.
    #[error("Couldn't decode {literal} into {target}")]
    Decode { literal: String, target: String },

    /// The input text was not valid JSON.
    #[error("Malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Valid JSON that does not denote the expected schema shape, or a schema
    /// violating a structural invariant (duplicate field names, decimal
    /// precision out of bounds).
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// A table already exists where one was being created.
    #[error("Table {0} already exists")]
    TableAlreadyExists(String),

    /// The operation requires a schema and none was provided.
    #[error("No schema provided: {0}")]
    SchemaNotProvided(String),

    /// A managed table was being created at a location that already holds
    /// files.
    #[error("Cannot create table at non-empty location {0}")]
    LocationNotEmpty(String),

    /// The requested table definition does not match the metadata already
    /// committed to the log.
    #[error("Existing table metadata does not match the requested {property}. {detail}")]
    MetadataMismatch { property: String, detail: String },

    /// Protocol versions only move forward.
    #[error("Cannot downgrade table protocol: {0}")]
    ProtocolDowngrade(String),

    /// A concurrent transaction committed at the contested version and its
    /// changes are incompatible with this transaction's staged state.
    #[error("Concurrent commit at version {version} conflicts with this transaction: {reason}")]
    Conflict { version: Version, reason: String },

    /// The caller-supplied commit deadline elapsed before the append landed.
    #[error("Commit deadline of {0:?} exceeded")]
    CommitTimeout(Duration),

    /// A transaction method was called in a state that does not permit it.
    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Generic tablelog error: {0}")]
    Generic(String),

    /// An unreachable state was reached. This is a bug in tablelog.
    #[error("Internal error: {0}. This is a bug in tablelog.")]
    InternalError(String),
}

impl Error {
    pub fn decode(literal: impl ToString, target: impl ToString) -> Self {
        Self::Decode {
            literal: literal.to_string(),
            target: target.to_string(),
        }
    }

    pub fn schema(msg: impl ToString) -> Self {
        Self::Schema(msg.to_string())
    }

    pub fn generic(msg: impl ToString) -> Self {
        Self::Generic(msg.to_string())
    }

    pub fn unsupported(msg: impl ToString) -> Self {
        Self::Unsupported(msg.to_string())
    }

    pub fn invalid_transaction_state(msg: impl ToString) -> Self {
        Self::InvalidTransactionState(msg.to_string())
    }

    pub fn internal_error(msg: impl ToString) -> Self {
        Self::InternalError(msg.to_string())
    }

    pub fn metadata_mismatch(property: impl ToString, detail: impl ToString) -> Self {
        Self::MetadataMismatch {
            property: property.to_string(),
            detail: detail.to_string(),
        }
    }

    /// True for retryable conflicts, false for everything else (including the
    /// non-retryable validation errors).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}
