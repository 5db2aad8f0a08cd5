//! API response types
//!
//! Success: `{"status": "ok", "data": ...}`
//! Failure: `{"status": "error", "code": "VCF_...", "message": "..."}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiError;

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

/// Success response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub data: Value,
}

impl SuccessResponse {
    pub fn new(data: Value) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            data,
        }
    }
}

/// Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    /// Create from an API error
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            code: err.code().to_string(),
            message: err.message(),
        }
    }
}

/// Unified response type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response::Success(SuccessResponse::new(data))
    }

    pub fn error(err: &ApiError) -> Self {
        Response::Error(ErrorResponse::from_error(err))
    }

    /// Envelope as a JSON value
    pub fn to_value(&self) -> Value {
        match self {
            Response::Success(r) => serde_json::json!({"status": r.status, "data": r.data}),
            Response::Error(r) => {
                serde_json::json!({"status": r.status, "code": r.code, "message": r.message})
            }
        }
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_response() {
        let resp = Response::success(json!([{"pos": 10042538}]));
        assert!(resp.is_success());
        assert_eq!(
            resp.to_value(),
            json!({"status": "ok", "data": [{"pos": 10042538}]})
        );
    }

    #[test]
    fn test_error_response() {
        let err = ApiError::not_found("sample", 7);
        let resp = Response::error(&err);
        assert!(!resp.is_success());
        let json: Value = serde_json::from_str(&resp.to_json()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "VCF_LOOKUP_NOT_FOUND");
        assert_eq!(json["message"], "sample 7 not found");
    }
}
