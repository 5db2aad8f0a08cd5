//! Field metadata type definitions
//!
//! Value types:
//! - CHARACTER: single character
//! - STRING: percent-escaped text
//! - INTEGER: 64-bit signed integer
//! - FLOAT: 64-bit floating point, including infinities and not-a-number
//! - FLAG: boolean stored as 0/1
//! - CATEGORICAL: small integer key resolved through a dictionary
//!
//! Cardinalities mirror the VCF `Number` attribute.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::categories::Categories;
use super::errors::{MetadataError, MetadataResult};

/// Top-level container a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Per-record field
    Info,
    /// Per-sample field
    Format,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Info => "INFO",
            FieldType::Format => "FORMAT",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "INFO" => Some(FieldType::Info),
            "FORMAT" => Some(FieldType::Format),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Character,
    String,
    Integer,
    Float,
    Flag,
    Categorical,
}

impl ValueType {
    /// Parses a value type token (case-insensitive)
    pub fn parse(field: &str, token: &str) -> MetadataResult<Self> {
        match token.to_ascii_uppercase().as_str() {
            "CHARACTER" => Ok(ValueType::Character),
            "STRING" => Ok(ValueType::String),
            "INTEGER" => Ok(ValueType::Integer),
            "FLOAT" => Ok(ValueType::Float),
            "FLAG" => Ok(ValueType::Flag),
            "CATEGORICAL" => Ok(ValueType::Categorical),
            _ => Err(MetadataError::unknown_value_type(field, token)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Character => "CHARACTER",
            ValueType::String => "STRING",
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::Flag => "FLAG",
            ValueType::Categorical => "CATEGORICAL",
        }
    }

    /// Returns true for INTEGER and FLOAT
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// Returns true for value types stored as text
    pub fn is_textual(&self) -> bool {
        matches!(self, ValueType::Character | ValueType::String)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many values a field holds per record (or per sample)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Fixed count
    Number(u32),
    /// One value per alternate allele
    PerAlt,
    /// One value per allele, reference included
    PerAltAndRef,
    /// One value per possible genotype
    PerGenotype,
    /// Variable count
    Other,
}

impl Cardinality {
    /// Parses a cardinality from its type token and optional count.
    ///
    /// Accepts both the long names (`NUMBER`, `PER_ALT`, ...) and the VCF
    /// shorthands (`A`, `R`, `G`, `.`, or a literal count).
    pub fn parse(field: &str, token: &str, count: Option<u32>) -> MetadataResult<Self> {
        match token.to_ascii_uppercase().as_str() {
            "NUMBER" => count
                .map(Cardinality::Number)
                .ok_or_else(|| MetadataError::unknown_cardinality(field, "NUMBER without count")),
            "PER_ALT" | "A" => Ok(Cardinality::PerAlt),
            "PER_ALT_AND_REF" | "R" => Ok(Cardinality::PerAltAndRef),
            "PER_GENOTYPE" | "G" => Ok(Cardinality::PerGenotype),
            "OTHER" | "." => Ok(Cardinality::Other),
            other => other
                .parse::<u32>()
                .map(Cardinality::Number)
                .map_err(|_| MetadataError::unknown_cardinality(field, token)),
        }
    }

    /// Returns true when a value holds at most one element
    pub fn is_scalar(&self) -> bool {
        matches!(self, Cardinality::Number(0) | Cardinality::Number(1))
    }

    /// Returns true when a value is an array
    pub fn is_multi(&self) -> bool {
        !self.is_scalar()
    }

    pub fn type_token(&self) -> &'static str {
        match self {
            Cardinality::Number(_) => "NUMBER",
            Cardinality::PerAlt => "PER_ALT",
            Cardinality::PerAltAndRef => "PER_ALT_AND_REF",
            Cardinality::PerGenotype => "PER_GENOTYPE",
            Cardinality::Other => "OTHER",
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            Cardinality::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One dictionary entry of a categorical field as delivered by a metadata source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub key: i64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Flat field descriptor as delivered by a metadata source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub nested: bool,
    #[serde(default)]
    pub separator: Option<String>,
    pub number_type: String,
    #[serde(default)]
    pub number_count: Option<u32>,
    pub value_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryDescriptor>,
    #[serde(default)]
    pub required: bool,
}

impl FieldDescriptor {
    /// Creates a top-level descriptor with the given type and cardinality tokens
    pub fn new(
        field_type: FieldType,
        id: impl Into<String>,
        value_type: impl Into<String>,
        number_type: impl Into<String>,
        number_count: Option<u32>,
    ) -> Self {
        Self {
            id: id.into(),
            field_type,
            parent: None,
            nested: false,
            separator: None,
            number_type: number_type.into(),
            number_count,
            value_type: value_type.into(),
            label: None,
            description: None,
            categories: Vec::new(),
            required: false,
        }
    }

    /// Creates a scalar INFO descriptor
    pub fn info(id: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self::new(FieldType::Info, id, value_type, "NUMBER", Some(1))
    }

    /// Creates a scalar FORMAT descriptor
    pub fn format(id: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self::new(FieldType::Format, id, value_type, "NUMBER", Some(1))
    }

    /// Sets the cardinality tokens
    pub fn with_number(mut self, number_type: impl Into<String>, count: Option<u32>) -> Self {
        self.number_type = number_type.into();
        self.number_count = count;
        self
    }

    /// Marks the descriptor as a nested container with the given separator
    pub fn with_nested(mut self, separator: impl Into<String>) -> Self {
        self.nested = true;
        self.separator = Some(separator.into());
        self
    }

    /// Sets the parent field id
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds a categorical dictionary entry
    pub fn with_category(mut self, key: i64, label: impl Into<String>) -> Self {
        self.categories.push(CategoryDescriptor {
            key,
            label: label.into(),
            description: None,
        });
        self
    }

    /// Sets the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Index of a node in the metadata arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Children of a nested (composite) field
#[derive(Debug, Clone, PartialEq)]
pub struct NestedFields {
    pub separator: String,
    pub children: Vec<FieldId>,
}

/// Resolved metadata of one field
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub id: String,
    pub field_type: FieldType,
    pub value_type: ValueType,
    pub cardinality: Cardinality,
    pub categories: Option<Categories>,
    pub nested: Option<NestedFields>,
    pub parent: Option<FieldId>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub required: bool,
}

impl FieldMetadata {
    /// Returns the decoding shape of this field
    pub fn shape(&self) -> FieldShape<'_> {
        FieldShape {
            value_type: self.value_type,
            cardinality: self.cardinality,
            categories: self.categories.as_ref(),
        }
    }

    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }
}

/// What the codec needs to know to interpret a stored token
#[derive(Debug, Clone, Copy)]
pub struct FieldShape<'a> {
    pub value_type: ValueType,
    pub cardinality: Cardinality,
    pub categories: Option<&'a Categories>,
}

impl<'a> FieldShape<'a> {
    /// Scalar shape without dictionary
    pub const fn scalar(value_type: ValueType) -> Self {
        Self {
            value_type,
            cardinality: Cardinality::Number(1),
            categories: None,
        }
    }

    /// Variable-length array shape without dictionary
    pub const fn array(value_type: ValueType) -> Self {
        Self {
            value_type,
            cardinality: Cardinality::Other,
            categories: None,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.cardinality.is_multi()
    }

    /// Shape of a single element of this (possibly multi-valued) shape
    pub fn element(&self) -> FieldShape<'a> {
        FieldShape {
            value_type: self.value_type,
            cardinality: Cardinality::Number(1),
            categories: self.categories,
        }
    }
}
