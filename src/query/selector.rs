//! Selector resolution
//!
//! Against metadata (for compilation):
//! - `[c|p|i|r|a|q|f]` fixed record column, optional element index on arrays
//! - `[n, FIELD]` top-level INFO field, optional element index
//! - `[n, FIELD, CHILD]` nested child, joined per nested row
//! - `[n, FIELD, *, CHILD]` nested child of any nested row
//! - `[n, FIELD, k, CHILD]` nested child of the k-th nested row
//! - `[s, k|*, FIELD]` FORMAT field of one or any sample; `GT` takes a part `a|p|t`
//!
//! Against an in-memory value tree (for direct evaluation and sorting):
//! object member access, array/object indexing and wildcard mapping.

use crate::codec::Value;
use crate::metadata::{FieldId, FieldShape, MetadataGraph, ValueType};
use crate::model::{genotype, record};

use super::ast::{Selector, SelectorPart};
use super::errors::{QueryError, QueryResult};

/// FORMAT field holding the genotype call
pub const GENOTYPE_FIELD: &str = "GT";

/// Fixed columns of the variant table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedColumn {
    Chrom,
    Pos,
    Ids,
    Ref,
    Alt,
    Qual,
    Filter,
}

impl FixedColumn {
    pub const ALL: [FixedColumn; 7] = [
        FixedColumn::Chrom,
        FixedColumn::Pos,
        FixedColumn::Ids,
        FixedColumn::Ref,
        FixedColumn::Alt,
        FixedColumn::Qual,
        FixedColumn::Filter,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Selector key
    pub fn key(&self) -> &'static str {
        match self {
            FixedColumn::Chrom => record::CHROM,
            FixedColumn::Pos => record::POS,
            FixedColumn::Ids => record::IDS,
            FixedColumn::Ref => record::REF,
            FixedColumn::Alt => record::ALT,
            FixedColumn::Qual => record::QUAL,
            FixedColumn::Filter => record::FILTER,
        }
    }

    /// Column name in the variant table
    pub fn column(&self) -> &'static str {
        match self {
            FixedColumn::Chrom => "chrom",
            FixedColumn::Pos => "pos",
            FixedColumn::Ids => "idVcf",
            FixedColumn::Ref => "ref",
            FixedColumn::Alt => "alt",
            FixedColumn::Qual => "qual",
            FixedColumn::Filter => "filter",
        }
    }

    pub fn shape(&self) -> FieldShape<'static> {
        match self {
            FixedColumn::Chrom | FixedColumn::Ref => FieldShape::scalar(ValueType::String),
            FixedColumn::Pos => FieldShape::scalar(ValueType::Integer),
            FixedColumn::Qual => FieldShape::scalar(ValueType::Float),
            FixedColumn::Ids | FixedColumn::Alt | FixedColumn::Filter => {
                FieldShape::array(ValueType::String)
            }
        }
    }
}

/// Part of the genotype structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypePart {
    Alleles,
    Phased,
    Type,
}

impl GenotypePart {
    pub const ALL: [GenotypePart; 3] = [
        GenotypePart::Alleles,
        GenotypePart::Phased,
        GenotypePart::Type,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            GenotypePart::Alleles => genotype::ALLELES,
            GenotypePart::Phased => genotype::PHASED,
            GenotypePart::Type => genotype::TYPE,
        }
    }

    /// Column name in the format table
    pub fn column(&self) -> String {
        format!("{}_{}", GENOTYPE_FIELD, self.key())
    }

    pub fn shape(&self) -> FieldShape<'static> {
        match self {
            GenotypePart::Alleles => FieldShape::array(ValueType::Integer),
            GenotypePart::Phased => FieldShape::scalar(ValueType::Flag),
            GenotypePart::Type => FieldShape::scalar(ValueType::String),
        }
    }
}

/// Which rows of a one-to-many relation a selector addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The joined row (one join per nested field)
    Row,
    /// The k-th row
    Index(usize),
    /// Any row (existence test)
    Any,
}

/// A selector resolved against the metadata graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Fixed {
        column: FixedColumn,
        element: Option<usize>,
    },
    Info {
        field: FieldId,
        element: Option<usize>,
    },
    Nested {
        parent: FieldId,
        child: FieldId,
        scope: Scope,
        element: Option<usize>,
    },
    Format {
        scope: Scope,
        field: FieldId,
        part: Option<GenotypePart>,
        element: Option<usize>,
    },
}

impl Resolved {
    /// Shape of the addressed value, before any one-to-many expansion
    pub fn shape<'g>(&self, graph: &'g MetadataGraph) -> FieldShape<'g> {
        let (base, element) = match self {
            Resolved::Fixed { column, element } => (column.shape(), *element),
            Resolved::Info { field, element } => (graph.field(*field).shape(), *element),
            Resolved::Nested { child, element, .. } => (graph.field(*child).shape(), *element),
            Resolved::Format {
                part: Some(part),
                element,
                ..
            } => (part.shape(), *element),
            Resolved::Format { field, element, .. } => (graph.field(*field).shape(), *element),
        };
        match element {
            Some(_) => base.element(),
            None => base,
        }
    }
}

/// Resolves a selector against the metadata graph
pub fn resolve(graph: &MetadataGraph, selector: &Selector) -> QueryResult<Resolved> {
    let parts = selector.parts();
    let head = match parts.first() {
        Some(SelectorPart::Name(name)) => name.as_str(),
        Some(other) => {
            return Err(QueryError::unknown_field(
                selector,
                format!("selector must start with a field name, found '{}'", other),
            ))
        }
        None => return Err(QueryError::unknown_field(selector, "empty selector")),
    };

    if let Some(column) = FixedColumn::from_key(head) {
        let element = trailing_element(selector, &parts[1..], column.shape())?;
        return Ok(Resolved::Fixed { column, element });
    }

    match head {
        record::INFO => resolve_info(graph, selector, &parts[1..]),
        record::SAMPLES => resolve_format(graph, selector, &parts[1..]),
        other => Err(QueryError::unknown_field(
            selector,
            format!("'{}' is not a record field", other),
        )),
    }
}

fn resolve_info(graph: &MetadataGraph, selector: &Selector, rest: &[SelectorPart]) -> QueryResult<Resolved> {
    let name = expect_name(selector, rest.first(), "INFO field")?;
    let field = graph
        .info(name)
        .ok_or_else(|| QueryError::unknown_field(selector, format!("no INFO field '{}'", name)))?;

    if !graph.field(field).is_nested() {
        let element = trailing_element(selector, &rest[1..], graph.field(field).shape())?;
        return Ok(Resolved::Info { field, element });
    }

    let (scope, child_part, tail) = match rest.get(1) {
        Some(SelectorPart::Wildcard) => (Scope::Any, rest.get(2), rest.get(3..).unwrap_or(&[])),
        Some(SelectorPart::Index(k)) => (Scope::Index(*k), rest.get(2), rest.get(3..).unwrap_or(&[])),
        Some(SelectorPart::Name(_)) => (Scope::Row, rest.get(1), rest.get(2..).unwrap_or(&[])),
        None => {
            return Err(QueryError::unsupported_operator(
                selector,
                "selector",
                "nested field requires a child field",
            ))
        }
    };
    let child_name = expect_name(selector, child_part, "nested child field")?;
    let child = graph.child(field, child_name).ok_or_else(|| {
        QueryError::unknown_field(
            selector,
            format!("no child '{}' in {}", child_name, graph.path(field)),
        )
    })?;
    let element = trailing_element(selector, tail, graph.field(child).shape())?;
    Ok(Resolved::Nested {
        parent: field,
        child,
        scope,
        element,
    })
}

fn resolve_format(
    graph: &MetadataGraph,
    selector: &Selector,
    rest: &[SelectorPart],
) -> QueryResult<Resolved> {
    let scope = match rest.first() {
        Some(SelectorPart::Index(k)) => Scope::Index(*k),
        Some(SelectorPart::Wildcard) => Scope::Any,
        Some(SelectorPart::Name(name)) => {
            return Err(QueryError::unknown_field(
                selector,
                format!("samples are addressed by index, found '{}'", name),
            ))
        }
        None => return Err(QueryError::unknown_field(selector, "missing sample index")),
    };
    let name = match rest.get(1) {
        Some(part) => expect_name(selector, Some(part), "FORMAT field")?,
        None => {
            return Err(QueryError::unsupported_operator(
                selector,
                "selector",
                "sample requires a FORMAT field",
            ))
        }
    };
    let field = graph
        .format(name)
        .ok_or_else(|| QueryError::unknown_field(selector, format!("no FORMAT field '{}'", name)))?;
    if graph.field(field).is_nested() {
        return Err(QueryError::unsupported_operator(
            selector,
            "selector",
            "nested FORMAT fields are only available in-memory",
        ));
    }
    let tail = rest.get(2..).unwrap_or(&[]);

    if name == GENOTYPE_FIELD {
        let part = match tail.first() {
            Some(SelectorPart::Name(key)) => GenotypePart::from_key(key).ok_or_else(|| {
                QueryError::unknown_field(selector, format!("no genotype part '{}'", key))
            })?,
            _ => {
                return Err(QueryError::unsupported_operator(
                    selector,
                    "selector",
                    "genotype requires a part 'a', 'p' or 't'",
                ))
            }
        };
        let element = trailing_element(selector, &tail[1..], part.shape())?;
        return Ok(Resolved::Format {
            scope,
            field,
            part: Some(part),
            element,
        });
    }

    let element = trailing_element(selector, tail, graph.field(field).shape())?;
    Ok(Resolved::Format {
        scope,
        field,
        part: None,
        element,
    })
}

fn expect_name<'s>(
    selector: &Selector,
    part: Option<&'s SelectorPart>,
    what: &str,
) -> QueryResult<&'s str> {
    match part {
        Some(SelectorPart::Name(name)) => Ok(name),
        Some(other) => Err(QueryError::unknown_field(
            selector,
            format!("expected {} name, found '{}'", what, other),
        )),
        None => Err(QueryError::unknown_field(selector, format!("missing {}", what))),
    }
}

/// Resolves what may follow a leaf field: nothing, or one index into an array
fn trailing_element(
    selector: &Selector,
    tail: &[SelectorPart],
    shape: FieldShape<'_>,
) -> QueryResult<Option<usize>> {
    match tail {
        [] => Ok(None),
        [SelectorPart::Index(k), rest @ ..] => {
            if !shape.is_multi() {
                Err(QueryError::type_mismatch(
                    selector,
                    "array field",
                    k,
                    shape.value_type.as_str(),
                ))
            } else if let Some(extra) = rest.first() {
                Err(QueryError::unknown_field(
                    selector,
                    format!("'{}' follows an array element", extra),
                ))
            } else {
                Ok(Some(*k))
            }
        }
        [SelectorPart::Wildcard, ..] => Err(QueryError::type_mismatch(
            selector,
            "samples or nested rows before '*'",
            "*",
            "array field",
        )),
        [SelectorPart::Name(name), ..] => Err(QueryError::unknown_field(
            selector,
            format!("'{}' follows a leaf field", name),
        )),
    }
}

/// Walks a value tree.
///
/// Returns `None` when the addressed value is absent. A wildcard maps the
/// rest of the selector over every element (absent elements become null).
pub fn select(value: &Value, selector: &Selector) -> QueryResult<Option<Value>> {
    select_parts(value, selector.parts(), selector)
}

fn select_parts(
    value: &Value,
    parts: &[SelectorPart],
    selector: &Selector,
) -> QueryResult<Option<Value>> {
    let (part, rest) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(Some(value.clone())),
    };
    match (part, value) {
        (_, Value::Null) => Ok(None),
        (SelectorPart::Name(name), Value::Object(_)) => match value.get(name) {
            Some(member) => select_parts(member, rest, selector),
            None => Ok(None),
        },
        (SelectorPart::Name(name), Value::Array(_)) => Err(QueryError::type_mismatch(
            selector,
            "object",
            name,
            "array",
        )),
        (SelectorPart::Name(name), other) => Err(QueryError::unknown_field(
            selector,
            format!("'{}' applied to a {} value", name, other.type_name()),
        )),
        (SelectorPart::Index(k), Value::Array(items)) => match items.get(*k) {
            Some(item) => select_parts(item, rest, selector),
            None => Ok(None),
        },
        (SelectorPart::Index(k), Value::Object(_)) => match value.get(&k.to_string()) {
            Some(member) => select_parts(member, rest, selector),
            None => Ok(None),
        },
        (SelectorPart::Wildcard, Value::Array(items)) => {
            map_wildcard(items.iter(), rest, selector)
        }
        (SelectorPart::Wildcard, Value::Object(members)) => {
            map_wildcard(members.iter().map(|(_, v)| v), rest, selector)
        }
        (part, other) => Err(QueryError::type_mismatch(
            selector,
            "array",
            part,
            other.type_name(),
        )),
    }
}

fn map_wildcard<'v>(
    items: impl Iterator<Item = &'v Value>,
    rest: &[SelectorPart],
    selector: &Selector,
) -> QueryResult<Option<Value>> {
    items
        .map(|item| select_parts(item, rest, selector).map(|v| v.unwrap_or(Value::Null)))
        .collect::<QueryResult<Vec<_>>>()
        .map(|items| Some(Value::Array(items)))
}
