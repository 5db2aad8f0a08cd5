//! API handler
//!
//! Parses one JSON request, dispatches it to the dataset handle and wraps
//! the outcome in the response envelope. Error codes pass through
//! unchanged.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::store::{MetadataSource, RowSource};

use super::errors::{ApiError, ApiResult};
use super::report::ReportApi;
use super::request::Request;
use super::response::Response;

/// JSON front end of a [`ReportApi`]
pub struct ApiHandler<S> {
    api: ReportApi<S>,
}

impl<S: MetadataSource + RowSource> ApiHandler<S> {
    pub fn new(api: ReportApi<S>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ReportApi<S> {
        &self.api
    }

    /// Handle a raw JSON request string
    pub fn handle(&self, json_request: &str) -> Response {
        let request = match Request::parse(json_request) {
            Ok(r) => r,
            Err(e) => return Response::error(&e),
        };

        match self.dispatch(request) {
            Ok(data) => Response::success(data),
            Err(e) => {
                debug!(code = e.code(), "request failed");
                Response::error(&e)
            }
        }
    }

    fn dispatch(&self, request: Request) -> ApiResult<Value> {
        match request {
            Request::GetRecords(r) => to_json(&self.api.get_records(&r)?),
            Request::GetRecordById(id) => to_json(&self.api.get_record_by_id(id)?),
            Request::GetSamples(r) => to_json(&self.api.get_samples(&r)?),
            Request::GetSampleById(id) => to_json(&self.api.get_sample_by_id(id)?),
            Request::GetPhenotypes(r) => to_json(&self.api.get_phenotypes(&r)?),
            Request::GetRecordsMeta => to_json(self.api.get_records_meta()?),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(data: &T) -> ApiResult<Value> {
    serde_json::to_value(data)
        .map_err(|e| ApiError::invalid_request(format!("response not serializable: {}", e)))
}
