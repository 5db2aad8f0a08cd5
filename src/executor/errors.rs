//! Executor errors
//!
//! Execution passes the codes of the failing layer through unchanged.

use thiserror::Error;

use crate::codec::CodecError;
use crate::query::QueryError;
use crate::store::StoreError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Query could not be compiled or evaluated
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Stored token could not be decoded
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// Store failed
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ExecutorError {
    /// Stable machine code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Query(err) => err.code().code(),
            ExecutorError::Codec(err) => err.code().code(),
            ExecutorError::Store(err) => err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err = ExecutorError::from(QueryError::unknown_field("n/XX", "no such field"));
        assert_eq!(err.code(), "VCF_QUERY_UNKNOWN_FIELD");
        assert!(err.to_string().contains("VCF_QUERY_UNKNOWN_FIELD"));

        let err = ExecutorError::from(CodecError::type_mismatch("integer", "string"));
        assert_eq!(err.code(), "VCF_CODEC_TYPE_MISMATCH");
    }
}
