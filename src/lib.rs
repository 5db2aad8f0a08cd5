//! vcfquery - typed, composable queries over VCF report databases
//!
//! A report database holds the records of one VCF file together with the
//! metadata describing every INFO and FORMAT field. This crate compiles
//! selector-based queries into parameterized SQLite filters, decodes the
//! stored tokens back into typed values and pages the results.
//!
//! # Layers
//!
//! - [`metadata`]: field descriptors and the arena-backed metadata graph
//! - [`codec`]: stored token <-> typed value conversion
//! - [`model`]: records, genotypes, samples and phenotypes
//! - [`query`]: query AST, selector resolution and SQL compilation
//! - [`store`]: the relational store seams and their SQLite implementation
//! - [`executor`]: record assembly, in-memory evaluation, sorting, paging
//! - [`api`]: the dataset handle and its JSON envelope

pub mod api;
pub mod codec;
pub mod config;
pub mod executor;
pub mod metadata;
pub mod model;
pub mod query;
pub mod store;

pub use api::{ApiError, ApiHandler, ApiResult, ReportApi};
pub use config::ReportConfig;
