//! Codec error types
//!
//! Error codes:
//! - VCF_CODEC_TYPE_MISMATCH (ERROR): value does not fit the field's declared type
//! - VCF_CODEC_INVALID_TOKEN (ERROR): stored token cannot be interpreted

use std::fmt;

/// Severity levels for codec errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request fails
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Codec-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorCode {
    /// Typed value incompatible with the target field
    TypeMismatch,
    /// Raw token malformed for the target field
    InvalidToken,
}

impl CodecErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CodecErrorCode::TypeMismatch => "VCF_CODEC_TYPE_MISMATCH",
            CodecErrorCode::InvalidToken => "VCF_CODEC_INVALID_TOKEN",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for CodecErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Codec error carrying the offending token or value
#[derive(Debug, Clone)]
pub struct CodecError {
    code: CodecErrorCode,
    message: String,
    field: Option<String>,
}

impl CodecError {
    /// Create an invalid token error
    pub fn invalid_token(expected: &str, token: impl fmt::Debug) -> Self {
        Self {
            code: CodecErrorCode::InvalidToken,
            message: format!("Cannot decode {:?} as {}", token, expected),
            field: None,
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self {
            code: CodecErrorCode::TypeMismatch,
            message: format!("Expected {} value, found {}", expected, actual),
            field: None,
        }
    }

    /// Attaches the field path the error occurred on
    pub fn at(mut self, field: impl Into<String>) -> Self {
        if self.field.is_none() {
            self.field = Some(field.into());
        }
        self
    }

    pub fn code(&self) -> CodecErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(field) = &self.field {
            write!(f, " (field {})", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_field() {
        let err = CodecError::invalid_token("FLAG", "2").at("INFO/DB");
        let display = err.to_string();
        assert!(display.starts_with("[ERROR] VCF_CODEC_INVALID_TOKEN"));
        assert!(display.contains("INFO/DB"));
    }

    #[test]
    fn test_first_field_wins() {
        let err = CodecError::type_mismatch("INTEGER", "string")
            .at("INFO/CSQ/Gene")
            .at("INFO/CSQ");
        assert_eq!(err.field(), Some("INFO/CSQ/Gene"));
        assert_eq!(err.code(), CodecErrorCode::TypeMismatch);
    }
}
