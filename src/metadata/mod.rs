//! Field metadata subsystem
//!
//! Describes every queryable INFO and FORMAT field of a dataset: value
//! type, cardinality, categorical dictionary and nesting. The graph is
//! built once when a dataset is opened and is read-only afterwards.
//!
//! Construction failures are fatal for the dataset handle.

mod categories;
mod errors;
mod graph;
mod types;
mod view;

pub use categories::{Categories, Category};
pub use errors::{MetadataError, MetadataErrorCode, MetadataResult, Severity};
pub use graph::{MetadataGraph, DEFAULT_SEPARATOR};
pub use types::{
    Cardinality, CategoryDescriptor, FieldDescriptor, FieldId, FieldMetadata, FieldShape,
    FieldType, NestedFields, ValueType,
};
pub use view::VcfMetadata;
