//! Relational store subsystem
//!
//! The query layer reads a dataset through two seams:
//! - [`MetadataSource`]: field descriptors, header lines, samples, phenotypes
//! - [`RowSource`]: compiled SQL in, flat rows of primitive tokens out
//!
//! [`SqliteStore`] implements both over a read-only SQLite connection.
//! [`ReportWriter`] builds such databases; it is never used at query time.

mod errors;
pub mod schema;
mod sqlite;
mod writer;

use std::collections::HashMap;

pub use errors::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use writer::ReportWriter;

use crate::codec::Token;
use crate::metadata::FieldDescriptor;
use crate::model::{Phenotype, Sample};
use crate::query::SqlFragment;

/// One result row: column alias -> stored primitive
pub type Row = HashMap<String, Token>;

/// Provider of dataset-level metadata
pub trait MetadataSource {
    /// Flat field descriptors in declaration order
    fn field_descriptors(&self) -> StoreResult<Vec<FieldDescriptor>>;

    /// Raw header lines, passed through unmodified
    fn header_lines(&self) -> StoreResult<Vec<String>>;

    /// Samples ordered by sample index
    fn samples(&self) -> StoreResult<Vec<Sample>>;

    /// Phenotypes, one per individual with observed features
    fn phenotypes(&self) -> StoreResult<Vec<Phenotype>>;
}

/// Executor of compiled SQL
pub trait RowSource {
    /// Column names of `table` in declaration order
    fn table_columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Runs a SELECT and returns every row keyed by column alias
    fn fetch_rows(&self, query: &SqlFragment) -> StoreResult<Vec<Row>>;

    /// Runs a SELECT whose first column of the first row is a count
    fn count(&self, query: &SqlFragment) -> StoreResult<u64>;
}
