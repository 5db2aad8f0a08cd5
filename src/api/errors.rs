//! API errors
//!
//! API errors are pass-through: they preserve the codes of the subsystem
//! that failed. Only request validation, lookups and configuration own
//! codes of their own.

use std::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::executor::ExecutorError;
use crate::metadata::MetadataError;
use crate::query::QueryError;
use crate::store::StoreError;

/// Codes owned by the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Id-based lookup found nothing
    LookupNotFound,
    /// Request is malformed or out of bounds
    InvalidRequest,
    /// Configuration file is unreadable or invalid
    ConfigInvalid,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::LookupNotFound => "VCF_LOOKUP_NOT_FOUND",
            ApiErrorCode::InvalidRequest => "VCF_INVALID_REQUEST",
            ApiErrorCode::ConfigInvalid => "VCF_CONFIG_INVALID",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// No record or sample with the requested id
    #[error("[ERROR] VCF_LOOKUP_NOT_FOUND: {kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("[ERROR] VCF_INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    #[error("[FATAL] VCF_CONFIG_INVALID: {0}")]
    Config(String),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Metadata(#[from] MetadataError),
}

impl ApiError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        ApiError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ApiError::InvalidRequest(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        ApiError::Config(reason.into())
    }

    /// Stable machine code, passed through from the failing subsystem
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => ApiErrorCode::LookupNotFound.code(),
            ApiError::InvalidRequest(_) => ApiErrorCode::InvalidRequest.code(),
            ApiError::Config(_) => ApiErrorCode::ConfigInvalid.code(),
            ApiError::Query(err) => err.code().code(),
            ApiError::Codec(err) => err.code().code(),
            ApiError::Store(err) => err.code(),
            ApiError::Metadata(err) => err.code().code(),
        }
    }

    /// Human-readable message without the code prefix
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound { kind, id } => format!("{} {} not found", kind, id),
            ApiError::InvalidRequest(reason) | ApiError::Config(reason) => reason.clone(),
            ApiError::Query(err) => err.message().to_string(),
            ApiError::Codec(err) => err.message().to_string(),
            ApiError::Store(err) => err.to_string(),
            ApiError::Metadata(err) => err.message().to_string(),
        }
    }

    /// Whether the dataset handle cannot serve further requests
    pub fn is_fatal(&self) -> bool {
        match self {
            ApiError::Config(_) | ApiError::Metadata(_) => true,
            ApiError::Store(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Query(err) => ApiError::Query(err),
            ExecutorError::Codec(err) => ApiError::Codec(err),
            ExecutorError::Store(err) => ApiError::Store(err),
        }
    }
}
