//! API request types
//!
//! JSON request parsing for all supported operations:
//! `{"op": "getRecords", "query": {...}, "sort": [...], "page": 0, "size": 10, "sampleIds": [0]}`

use serde::Deserialize;
use serde_json::Value;

use crate::query::{Query, SortOrder};

use super::errors::{ApiError, ApiResult};

/// Filtered, sorted and paged item listing
#[derive(Debug, Clone, Default)]
pub struct ItemsRequest {
    pub query: Option<Query>,
    pub sort: Vec<SortOrder>,
    pub page: usize,
    /// Falls back to the configured default page size
    pub size: Option<usize>,
}

/// Record listing with an optional sample projection
#[derive(Debug, Clone, Default)]
pub struct RecordsRequest {
    pub query: Option<Query>,
    pub sort: Vec<SortOrder>,
    pub page: usize,
    pub size: Option<usize>,
    /// `None` keeps every sample, an empty list drops all sample data
    pub sample_ids: Option<Vec<usize>>,
}

impl From<ItemsRequest> for RecordsRequest {
    fn from(items: ItemsRequest) -> Self {
        Self {
            query: items.query,
            sort: items.sort,
            page: items.page,
            size: items.size,
            sample_ids: None,
        }
    }
}

/// Unified request envelope
#[derive(Debug, Clone)]
pub enum Request {
    GetRecords(RecordsRequest),
    GetRecordById(i64),
    GetSamples(ItemsRequest),
    GetSampleById(usize),
    GetPhenotypes(ItemsRequest),
    GetRecordsMeta,
}

/// Raw request for parsing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    op: String,
    #[serde(default)]
    query: Option<Value>,
    #[serde(default)]
    sort: Option<Value>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    size: Option<usize>,
    #[serde(default)]
    sample_ids: Option<Vec<usize>>,
    #[serde(default)]
    id: Option<i64>,
}

impl RawRequest {
    fn items(&self) -> ApiResult<ItemsRequest> {
        let query = match &self.query {
            None | Some(Value::Null) => None,
            Some(json) => Some(Query::from_json(json).map_err(ApiError::invalid_request)?),
        };
        let sort = match &self.sort {
            None => Vec::new(),
            Some(json) => SortOrder::list_from_json(json).map_err(ApiError::invalid_request)?,
        };
        Ok(ItemsRequest {
            query,
            sort,
            page: self.page.unwrap_or(0),
            size: self.size,
        })
    }

    fn id(&self) -> ApiResult<i64> {
        self.id
            .ok_or_else(|| ApiError::invalid_request(format!("{} requires an 'id'", self.op)))
    }
}

impl Request {
    /// Parse a request from a JSON string
    pub fn parse(json: &str) -> ApiResult<Self> {
        let raw: RawRequest = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        match raw.op.as_str() {
            "getRecords" => {
                let mut request = RecordsRequest::from(raw.items()?);
                request.sample_ids = raw.sample_ids;
                Ok(Request::GetRecords(request))
            }
            "getRecordById" => Ok(Request::GetRecordById(raw.id()?)),
            "getSamples" => Ok(Request::GetSamples(raw.items()?)),
            "getSampleById" => {
                let id = raw.id()?;
                let id = usize::try_from(id)
                    .map_err(|_| ApiError::invalid_request(format!("invalid sample id {}", id)))?;
                Ok(Request::GetSampleById(id))
            }
            "getPhenotypes" => Ok(Request::GetPhenotypes(raw.items()?)),
            "getRecordsMeta" => Ok(Request::GetRecordsMeta),
            other => Err(ApiError::invalid_request(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDirection;

    #[test]
    fn test_parse_get_records() {
        let req = Request::parse(
            r#"{"op": "getRecords",
                "query": {"selector": ["n", "DP"], "operator": ">", "args": 10},
                "sort": [{"property": "p", "compare": "desc"}],
                "page": 2, "size": 5, "sampleIds": [0, 2]}"#,
        )
        .unwrap();
        match req {
            Request::GetRecords(r) => {
                assert!(r.query.is_some());
                assert_eq!(r.sort[0].direction, SortDirection::Desc);
                assert_eq!(r.page, 2);
                assert_eq!(r.size, Some(5));
                assert_eq!(r.sample_ids, Some(vec![0, 2]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        match Request::parse(r#"{"op": "getSamples"}"#).unwrap() {
            Request::GetSamples(r) => {
                assert!(r.query.is_none());
                assert!(r.sort.is_empty());
                assert_eq!(r.page, 0);
                assert_eq!(r.size, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lookups_require_id() {
        assert!(matches!(
            Request::parse(r#"{"op": "getRecordById", "id": 3}"#).unwrap(),
            Request::GetRecordById(3)
        ));
        let err = Request::parse(r#"{"op": "getSampleById"}"#).unwrap_err();
        assert_eq!(err.code(), "VCF_INVALID_REQUEST");
        let err = Request::parse(r#"{"op": "getSampleById", "id": -1}"#).unwrap_err();
        assert_eq!(err.code(), "VCF_INVALID_REQUEST");
    }

    #[test]
    fn test_invalid_requests() {
        for json in [
            "not json",
            r#"{"op": "drop"}"#,
            r#"{"op": "getRecords", "query": {"selector": "p", "operator": "=~"}}"#,
            r#"{"op": "getRecords", "sort": {"compare": "asc"}}"#,
        ] {
            assert_eq!(Request::parse(json).unwrap_err().code(), "VCF_INVALID_REQUEST");
        }
    }
}
