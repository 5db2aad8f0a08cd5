//! Store errors
//!
//! Every failure of the relational store surfaces as `VCF_STORE_FAILED`,
//! except malformed stored metadata which keeps its own fatal code.

use thiserror::Error;

use crate::codec::CodecError;
use crate::metadata::MetadataError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Relational store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement or the database could not be opened
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored field descriptors do not form a valid graph
    #[error("{0}")]
    Metadata(#[from] MetadataError),

    /// A value could not be encoded for storage
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// A stored row does not match the expected layout
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: String, reason: String },

    /// The connection mutex was poisoned by a panicking reader
    #[error("Connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn corrupt(table: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Metadata(err) => err.code().code(),
            _ => "VCF_STORE_FAILED",
        }
    }

    /// Whether the dataset cannot be served at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Metadata(_) | StoreError::Poisoned)
    }
}
