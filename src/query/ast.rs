//! Query AST and its JSON wire format
//!
//! Clause: `{"selector": ["n", "DP"], "operator": ">", "args": 10}`
//! Composed: `{"operator": "and", "args": [...]}` or the short form `{"and": [...]}`
//!
//! A clause keeps the difference between an absent `args` key and an
//! explicit `null`; several operators match differently on the two.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::codec::Value;

/// One part of a selector path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorPart {
    Name(String),
    Index(usize),
    Wildcard,
}

impl SelectorPart {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            SelectorPart::Name(name) => Some(name),
            _ => None,
        }
    }

    fn from_json(json: &Json) -> Result<Self, String> {
        match json {
            Json::String(s) if s == "*" => Ok(SelectorPart::Wildcard),
            Json::String(s) => Ok(SelectorPart::Name(s.clone())),
            Json::Number(n) => n
                .as_u64()
                .map(|i| SelectorPart::Index(i as usize))
                .ok_or_else(|| format!("selector index must be a non-negative integer, got {}", n)),
            other => Err(format!("invalid selector part {}", other)),
        }
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorPart::Name(name) => f.write_str(name),
            SelectorPart::Index(i) => write!(f, "{}", i),
            SelectorPart::Wildcard => f.write_str("*"),
        }
    }
}

/// Path addressing a value inside an item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Selector(pub Vec<SelectorPart>);

impl Selector {
    pub fn new(parts: Vec<SelectorPart>) -> Self {
        Self(parts)
    }

    /// Parses `"p"`, `5` or `["s", "*", "GT", "t"]`
    pub fn from_json(json: &Json) -> Result<Self, String> {
        match json {
            Json::Array(parts) => parts
                .iter()
                .map(SelectorPart::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Selector),
            other => SelectorPart::from_json(other).map(|part| Selector(vec![part])),
        }
    }

    pub fn parts(&self) -> &[SelectorPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// Builds a selector from path literals: `selector!["s", "*", "GT", "t"]`
#[macro_export]
macro_rules! selector {
    ($($part:expr),* $(,)?) => {
        $crate::query::Selector::new(vec![$($crate::query::SelectorPart::from($part)),*])
    };
}

impl From<&str> for SelectorPart {
    fn from(s: &str) -> Self {
        if s == "*" {
            SelectorPart::Wildcard
        } else {
            SelectorPart::Name(s.to_string())
        }
    }
}

impl From<usize> for SelectorPart {
    fn from(i: usize) -> Self {
        SelectorPart::Index(i)
    }
}

/// Clause operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    In,
    NotIn,
    HasAny,
    NotHasAny,
    AnyHasAny,
    NotAnyHasAny,
    Search,
    SearchAny,
    AnySearchAny,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "==" => Operator::Eq,
            "!=" => Operator::NotEq,
            "in" => Operator::In,
            "!in" => Operator::NotIn,
            "has_any" => Operator::HasAny,
            "!has_any" => Operator::NotHasAny,
            "any_has_any" => Operator::AnyHasAny,
            "!any_has_any" => Operator::NotAnyHasAny,
            "~=" => Operator::Search,
            "~=_any" => Operator::SearchAny,
            "any_~=_any" => Operator::AnySearchAny,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::In => "in",
            Operator::NotIn => "!in",
            Operator::HasAny => "has_any",
            Operator::NotHasAny => "!has_any",
            Operator::AnyHasAny => "any_has_any",
            Operator::NotAnyHasAny => "!any_has_any",
            Operator::Search => "~=",
            Operator::SearchAny => "~=_any",
            Operator::AnySearchAny => "any_~=_any",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }

    /// `>`, `>=`, `<`, `<=`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }

    /// SQL comparison symbol of an ordering operator
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::NotEq => "!=",
            _ => "=",
        }
    }

    /// Returns the positive operator and whether this one negates it
    pub fn split_negation(&self) -> (Operator, bool) {
        match self {
            Operator::NotEq => (Operator::Eq, true),
            Operator::NotIn => (Operator::In, true),
            Operator::NotHasAny => (Operator::HasAny, true),
            Operator::NotAnyHasAny => (Operator::AnyHasAny, true),
            other => (*other, false),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean composition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    And,
    Or,
}

/// A leaf predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub selector: Selector,
    pub operator: Operator,
    /// `None` when the `args` key is absent, `Some(Json::Null)` for explicit null
    pub args: Option<Json>,
}

impl Clause {
    pub fn new(selector: Selector, operator: Operator, args: Json) -> Self {
        Self {
            selector,
            operator,
            args: Some(args),
        }
    }

    /// Clause without an `args` key
    pub fn without_args(selector: Selector, operator: Operator) -> Self {
        Self {
            selector,
            operator,
            args: None,
        }
    }
}

/// Composable query
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Json")]
pub enum Query {
    Clause(Clause),
    Composed(Composition, Vec<Query>),
}

impl Query {
    pub fn clause(selector: Selector, operator: Operator, args: Json) -> Self {
        Query::Clause(Clause::new(selector, operator, args))
    }

    pub fn and(children: Vec<Query>) -> Self {
        Query::Composed(Composition::And, children)
    }

    pub fn or(children: Vec<Query>) -> Self {
        Query::Composed(Composition::Or, children)
    }

    /// Parses the JSON wire form
    pub fn from_json(json: &Json) -> Result<Self, String> {
        let obj = json
            .as_object()
            .ok_or_else(|| format!("query must be an object, got {}", json))?;

        for (key, composition) in [("and", Composition::And), ("or", Composition::Or)] {
            if let Some(children) = obj.get(key) {
                return Self::composed(composition, children);
            }
        }

        let operator = obj
            .get("operator")
            .and_then(Json::as_str)
            .ok_or_else(|| "query requires an 'operator'".to_string())?;
        match operator {
            "and" => Self::composed(Composition::And, obj.get("args").unwrap_or(&Json::Null)),
            "or" => Self::composed(Composition::Or, obj.get("args").unwrap_or(&Json::Null)),
            token => {
                let operator =
                    Operator::parse(token).ok_or_else(|| format!("unknown operator '{}'", token))?;
                let selector = obj
                    .get("selector")
                    .ok_or_else(|| "clause requires a 'selector'".to_string())
                    .and_then(Selector::from_json)?;
                Ok(Query::Clause(Clause {
                    selector,
                    operator,
                    args: obj.get("args").cloned(),
                }))
            }
        }
    }

    fn composed(composition: Composition, children: &Json) -> Result<Self, String> {
        let children = children
            .as_array()
            .ok_or_else(|| "composed query requires an array of queries".to_string())?;
        children
            .iter()
            .map(Query::from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(|children| Query::Composed(composition, children))
    }
}

impl TryFrom<Json> for Query {
    type Error = String;

    fn try_from(json: Json) -> Result<Self, Self::Error> {
        Query::from_json(&json)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Caller-supplied comparison used in place of the built-in ordering
pub type CompareFn = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// One sort key
#[derive(Clone)]
pub struct SortOrder {
    pub selector: Selector,
    pub direction: SortDirection,
    pub compare: Option<CompareFn>,
}

impl SortOrder {
    pub fn asc(selector: Selector) -> Self {
        Self {
            selector,
            direction: SortDirection::Asc,
            compare: None,
        }
    }

    pub fn desc(selector: Selector) -> Self {
        Self {
            selector,
            direction: SortDirection::Desc,
            compare: None,
        }
    }

    /// Sort key with a custom comparison (in-memory evaluation only)
    pub fn with_compare(selector: Selector, compare: CompareFn) -> Self {
        Self {
            selector,
            direction: SortDirection::Asc,
            compare: Some(compare),
        }
    }

    /// Parses `{"property": ..., "compare": "asc"|"desc"}`
    pub fn from_json(json: &Json) -> Result<Self, String> {
        let property = json
            .get("property")
            .ok_or_else(|| "sort order requires a 'property'".to_string())?;
        let selector = Selector::from_json(property)?;
        let direction = match json.get("compare") {
            None | Some(Json::Null) => SortDirection::Asc,
            Some(Json::String(s)) if s == "asc" => SortDirection::Asc,
            Some(Json::String(s)) if s == "desc" => SortDirection::Desc,
            Some(other) => return Err(format!("invalid sort compare {}", other)),
        };
        Ok(Self {
            selector,
            direction,
            compare: None,
        })
    }

    /// Parses a single sort order or an array of them
    pub fn list_from_json(json: &Json) -> Result<Vec<Self>, String> {
        match json {
            Json::Null => Ok(Vec::new()),
            Json::Array(items) => items.iter().map(SortOrder::from_json).collect(),
            other => SortOrder::from_json(other).map(|order| vec![order]),
        }
    }
}

impl fmt::Debug for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortOrder")
            .field("selector", &self.selector)
            .field("direction", &self.direction)
            .field("compare", &self.compare.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
