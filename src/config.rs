//! Dataset handle configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {"database_path": "report.db", "default_page_size": 10, "max_page_size": 10000}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult};

/// Configuration of a report dataset handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// SQLite report database, opened read-only
    pub database_path: PathBuf,

    /// Page size used when a request names none (default: 10)
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest accepted page size (default: 10000)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    10000
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ReportConfig {
    /// Config for a database path with default paging
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Default::default()
        }
    }

    /// Reads and validates a JSON config file
    pub fn load(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ApiError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ReportConfig = serde_json::from_str(&text)
            .map_err(|e| ApiError::config(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.max_page_size == 0 {
            return Err(ApiError::config("max_page_size must be positive"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ApiError::config(format!(
                "default_page_size must be in 1..={}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }

    /// Resolves a requested page size against the configured bounds
    pub fn page_size(&self, requested: Option<usize>) -> ApiResult<usize> {
        match requested.unwrap_or(self.default_page_size) {
            0 => Err(ApiError::invalid_request("page size must be positive")),
            size if size > self.max_page_size => Err(ApiError::invalid_request(format!(
                "page size {} exceeds maximum {}",
                size, self.max_page_size
            ))),
            size => Ok(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: ReportConfig =
            serde_json::from_str(r#"{"database_path": "report.db"}"#).unwrap();
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 10000);
        assert_eq!(config.database_path, PathBuf::from("report.db"));
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"database_path": "r.db", "default_page_size": 50, "max_page_size": 20}}"#
        )
        .unwrap();
        let err = ReportConfig::load(&path).unwrap_err();
        assert_eq!(err.code(), "VCF_CONFIG_INVALID");

        let err = ReportConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code(), "VCF_CONFIG_INVALID");
    }

    #[test]
    fn test_page_size_bounds() {
        let config = ReportConfig {
            max_page_size: 100,
            ..ReportConfig::with_database("r.db")
        };
        assert_eq!(config.page_size(None).unwrap(), 10);
        assert_eq!(config.page_size(Some(100)).unwrap(), 100);
        assert_eq!(config.page_size(Some(0)).unwrap_err().code(), "VCF_INVALID_REQUEST");
        assert_eq!(config.page_size(Some(101)).unwrap_err().code(), "VCF_INVALID_REQUEST");
    }
}
