//! Metadata error types
//!
//! Error codes:
//! - VCF_METADATA_UNKNOWN_CARDINALITY (FATAL)
//! - VCF_METADATA_UNKNOWN_VALUE_TYPE (FATAL)
//! - VCF_METADATA_DUPLICATE_FIELD (FATAL)
//! - VCF_METADATA_UNKNOWN_PARENT (FATAL)
//! - VCF_METADATA_MISSING_CHILDREN (FATAL)
//! - VCF_METADATA_INVALID_CATEGORIES (FATAL)
//!
//! A malformed metadata graph prevents the dataset from opening, so every
//! metadata error is fatal for the dataset handle being constructed.

use std::fmt;

/// Severity levels for metadata errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Dataset cannot be opened
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Metadata-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorCode {
    /// Cardinality token not recognized
    UnknownCardinality,
    /// Value type token not recognized
    UnknownValueType,
    /// Two descriptors share the same (field type, parent, name) key
    DuplicateField,
    /// Descriptor references a parent that does not exist
    UnknownParent,
    /// Nested field whose children cannot be found
    MissingChildren,
    /// Categories on a non-categorical field, or a duplicate dictionary entry
    InvalidCategories,
}

impl MetadataErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            MetadataErrorCode::UnknownCardinality => "VCF_METADATA_UNKNOWN_CARDINALITY",
            MetadataErrorCode::UnknownValueType => "VCF_METADATA_UNKNOWN_VALUE_TYPE",
            MetadataErrorCode::DuplicateField => "VCF_METADATA_DUPLICATE_FIELD",
            MetadataErrorCode::UnknownParent => "VCF_METADATA_UNKNOWN_PARENT",
            MetadataErrorCode::MissingChildren => "VCF_METADATA_MISSING_CHILDREN",
            MetadataErrorCode::InvalidCategories => "VCF_METADATA_INVALID_CATEGORIES",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for MetadataErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Metadata error with the offending field id
#[derive(Debug, Clone)]
pub struct MetadataError {
    code: MetadataErrorCode,
    message: String,
    field: Option<String>,
}

impl MetadataError {
    /// Create an unknown cardinality error
    pub fn unknown_cardinality(field: impl Into<String>, token: &str) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::UnknownCardinality,
            message: format!("Field '{}' has unknown cardinality '{}'", f, token),
            field: Some(f),
        }
    }

    /// Create an unknown value type error
    pub fn unknown_value_type(field: impl Into<String>, token: &str) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::UnknownValueType,
            message: format!("Field '{}' has unknown value type '{}'", f, token),
            field: Some(f),
        }
    }

    /// Create a duplicate field error
    pub fn duplicate_field(field: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::DuplicateField,
            message: format!("Field '{}' is declared more than once", f),
            field: Some(f),
        }
    }

    /// Create an unknown parent error
    pub fn unknown_parent(field: impl Into<String>, parent: &str) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::UnknownParent,
            message: format!(
                "Field '{}' references parent '{}' which is not a nested field",
                f, parent
            ),
            field: Some(f),
        }
    }

    /// Create a missing children error
    pub fn missing_children(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::MissingChildren,
            message: format!("Nested field '{}': {}", f, reason.into()),
            field: Some(f),
        }
    }

    /// Create an invalid categories error
    pub fn invalid_categories(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: MetadataErrorCode::InvalidCategories,
            message: format!("Field '{}': {}", f, reason.into()),
            field: Some(f),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> MetadataErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field id if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for MetadataError {}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MetadataErrorCode::UnknownCardinality.code(),
            "VCF_METADATA_UNKNOWN_CARDINALITY"
        );
        assert_eq!(
            MetadataErrorCode::MissingChildren.code(),
            "VCF_METADATA_MISSING_CHILDREN"
        );
    }

    #[test]
    fn test_error_display() {
        let err = MetadataError::unknown_cardinality("AF", "Q");
        let display = format!("{}", err);
        assert!(display.contains("FATAL"));
        assert!(display.contains("VCF_METADATA_UNKNOWN_CARDINALITY"));
        assert!(display.contains("AF"));
        assert_eq!(err.field(), Some("AF"));
    }
}
