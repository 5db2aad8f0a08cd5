//! Query execution
//!
//! Records are filtered, sorted and paged inside SQLite and then assembled
//! from joined rows. Samples and phenotypes are small and evaluated in
//! memory with the same operator table and ordering rules.
//!
//! # Invariants
//!
//! - Results are deterministic: the record id is always the final sort key
//! - `page.totalElements` counts matches independent of paging
//! - Absent and null values stay distinct during in-memory evaluation

mod assembler;
mod errors;
mod filters;
mod records;
mod result;
mod sorter;

pub use assembler::{RecordAssembler, TableLayout};
pub use errors::{ExecutorError, ExecutorResult};
pub use filters::ValueFilter;
pub use records::RecordExecutor;
pub use result::{Page, PageRequest, PagedItems};
pub use sorter::{compare_values, ValueSorter};
