//! Query error types
//!
//! Error codes:
//! - VCF_QUERY_UNKNOWN_FIELD (REJECT)
//! - VCF_QUERY_UNSUPPORTED_OPERATOR (REJECT)
//! - VCF_QUERY_TYPE_MISMATCH (REJECT)
//! - VCF_QUERY_NOT_COMPARABLE (REJECT)
//!
//! All query errors are deterministic functions of caller input and are
//! never retried.

use std::fmt;

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Query-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Selector references a field absent from metadata
    UnknownField,
    /// Operator not applicable to the selector's shape
    UnsupportedOperator,
    /// Argument type incompatible with the field's value type
    TypeMismatch,
    /// Sort hit an unsupported value shape
    NotComparable,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::UnknownField => "VCF_QUERY_UNKNOWN_FIELD",
            QueryErrorCode::UnsupportedOperator => "VCF_QUERY_UNSUPPORTED_OPERATOR",
            QueryErrorCode::TypeMismatch => "VCF_QUERY_TYPE_MISMATCH",
            QueryErrorCode::NotComparable => "VCF_QUERY_NOT_COMPARABLE",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with selector context
#[derive(Debug, Clone)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    selector: Option<String>,
}

impl QueryError {
    /// Create an unknown field error
    pub fn unknown_field(selector: impl fmt::Display, reason: impl Into<String>) -> Self {
        let selector = selector.to_string();
        Self {
            code: QueryErrorCode::UnknownField,
            message: format!("Unknown field {}: {}", selector, reason.into()),
            selector: Some(selector),
        }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(
        selector: impl fmt::Display,
        operator: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        let selector = selector.to_string();
        Self {
            code: QueryErrorCode::UnsupportedOperator,
            message: format!(
                "Operator '{}' not supported on {}: {}",
                operator,
                selector,
                reason.into()
            ),
            selector: Some(selector),
        }
    }

    /// Create a type mismatch error naming the offending value and expected type
    pub fn type_mismatch(
        selector: impl fmt::Display,
        expected: &str,
        value: impl fmt::Display,
        actual: &str,
    ) -> Self {
        let selector = selector.to_string();
        Self {
            code: QueryErrorCode::TypeMismatch,
            message: format!(
                "Expected {} for {}, got {} ({})",
                expected, selector, value, actual
            ),
            selector: Some(selector),
        }
    }

    /// Create a not comparable error
    pub fn not_comparable(left: &str, right: &str) -> Self {
        Self {
            code: QueryErrorCode::NotComparable,
            message: format!("Cannot compare {} with {}", left, right),
            selector: None,
        }
    }

    /// Attaches the sort selector to a comparator error
    pub fn with_selector(mut self, selector: impl fmt::Display) -> Self {
        if self.selector.is_none() {
            let selector = selector.to_string();
            self.message = format!("{} (selector {})", self.message, selector);
            self.selector = Some(selector);
        }
        self
    }

    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the selector if applicable
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

impl fmt::Display for QueryError {
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

impl std::error::Error for QueryError {}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            QueryErrorCode::UnknownField.code(),
            "VCF_QUERY_UNKNOWN_FIELD"
        );
        assert_eq!(
            QueryErrorCode::NotComparable.code(),
            "VCF_QUERY_NOT_COMPARABLE"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = QueryError::type_mismatch("n/DP", "number", "\"abc\"", "string");
        let display = err.to_string();
        assert!(display.starts_with("[REJECT] VCF_QUERY_TYPE_MISMATCH"));
        assert!(display.contains("\"abc\""));
        assert!(display.contains("string"));
        assert_eq!(err.selector(), Some("n/DP"));
    }

    #[test]
    fn test_not_comparable_selector() {
        let err = QueryError::not_comparable("object", "integer").with_selector("n/CSQ");
        assert_eq!(err.selector(), Some("n/CSQ"));
        assert!(err.message().contains("n/CSQ"));
    }
}
