//! API layer
//!
//! [`ReportApi`] is the dataset handle: a one-shot fallible open followed
//! by synchronous, read-only operations. [`ApiHandler`] exposes it through
//! a JSON request/response envelope.
//!
//! # Supported Operations
//!
//! - getRecords
//! - getRecordById
//! - getSamples
//! - getSampleById
//! - getPhenotypes
//! - getRecordsMeta

mod errors;
mod handler;
mod report;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult};
pub use handler::ApiHandler;
pub use report::ReportApi;
pub use request::{ItemsRequest, RecordsRequest, Request};
pub use response::{ErrorResponse, Response, SuccessResponse};
