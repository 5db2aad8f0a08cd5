//! In-memory query evaluation
//!
//! Evaluates a query over value trees with the same operator table as the
//! SQL compiler. Absent values (selector walked off the tree) and explicit
//! nulls are kept apart: `== null` matches both, an absent `args` only
//! matches an absent value.

use serde_json::Value as Json;

use crate::codec::Value;
use crate::query::{
    select, Clause, Composition, Operator, Query, QueryError, QueryResult, Selector,
};

/// Predicate evaluator over value trees
pub struct ValueFilter;

impl ValueFilter {
    /// Returns true if `value` satisfies `query`
    pub fn matches(query: &Query, value: &Value) -> QueryResult<bool> {
        match query {
            Query::Composed(Composition::And, children) => {
                for child in children {
                    if !Self::matches(child, value)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Query::Composed(Composition::Or, children) => {
                for child in children {
                    if Self::matches(child, value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Query::Clause(clause) => Self::matches_clause(clause, value),
        }
    }

    /// Keeps the items whose projection satisfies `query`
    pub fn filter<T>(
        items: Vec<T>,
        query: Option<&Query>,
        project: impl Fn(&T) -> Value,
    ) -> QueryResult<Vec<T>> {
        let query = match query {
            Some(query) => query,
            None => return Ok(items),
        };
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if Self::matches(query, &project(&item))? {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    fn matches_clause(clause: &Clause, value: &Value) -> QueryResult<bool> {
        let selected = select(value, &clause.selector)?;
        let (operator, negated) = clause.operator.split_negation();
        let ctx = Context {
            selector: &clause.selector,
            operator: clause.operator,
        };
        let args = clause.args.as_ref();
        let matched = match operator {
            Operator::Eq | Operator::NotEq => match (args, &selected) {
                (None, selected) => selected.is_none(),
                (Some(Json::Null), selected) => selected.as_ref().map_or(true, Value::is_null),
                (Some(arg), Some(v)) => loose_eq(v, &Value::from_json(arg)),
                (Some(_), None) => false,
            },
            Operator::In | Operator::NotIn => {
                let wanted = ctx.array_args(args)?;
                match &selected {
                    // array values match element-wise
                    Some(Value::Array(items)) => wanted
                        .iter()
                        .any(|arg| items.iter().any(|item| member_matches(Some(item), arg))),
                    _ => wanted
                        .iter()
                        .any(|arg| member_matches(selected.as_ref(), arg)),
                }
            }
            Operator::HasAny | Operator::NotHasAny => ctx.has_any(selected.as_ref(), args)?,
            Operator::AnyHasAny | Operator::NotAnyHasAny => match array_of(selected.as_ref()) {
                None => args.is_none(),
                Some(inner) => {
                    let mut any = false;
                    for item in inner {
                        if !item.is_null() && ctx.has_any(Some(item), args)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
            },
            Operator::Search => match &selected {
                None => args.is_none(),
                Some(v) => search(v, &Value::from_json(args.unwrap_or(&Json::Null))),
            },
            Operator::SearchAny => ctx.search_any(selected.as_ref(), args)?,
            Operator::AnySearchAny => match array_of(selected.as_ref()) {
                None => args.is_none(),
                Some(inner) => {
                    let mut any = false;
                    for item in inner {
                        if !item.is_null() && ctx.search_any(Some(item), args)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
            },
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                ctx.ordering(operator, selected.as_ref(), args)?
            }
        };
        Ok(matched != negated)
    }
}

struct Context<'a> {
    selector: &'a Selector,
    operator: Operator,
}

impl Context<'_> {
    fn array_args<'j>(&self, args: Option<&'j Json>) -> QueryResult<&'j [Json]> {
        match args {
            Some(Json::Array(items)) => Ok(items),
            Some(other) => Err(QueryError::type_mismatch(
                self.selector,
                "array",
                other,
                Value::from_json(other).type_name(),
            )),
            None => Err(QueryError::type_mismatch(
                self.selector,
                "array",
                "undefined",
                "undefined",
            )),
        }
    }

    fn has_any(&self, selected: Option<&Value>, args: Option<&Json>) -> QueryResult<bool> {
        let items = match selected {
            None | Some(Value::Null) => return Ok(args.is_none()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(QueryError::unsupported_operator(
                    self.selector,
                    self.operator,
                    format!("value is a {}, not an array", other.type_name()),
                ))
            }
        };
        if args.is_none() {
            return Ok(false);
        }
        let wanted = self.array_args(args)?;
        Ok(wanted
            .iter()
            .any(|arg| items.iter().any(|item| member_matches(Some(item), arg))))
    }

    fn search_any(&self, selected: Option<&Value>, args: Option<&Json>) -> QueryResult<bool> {
        let items = match selected {
            None | Some(Value::Null) => return Ok(args.is_none()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(QueryError::unsupported_operator(
                    self.selector,
                    self.operator,
                    format!("value is a {}, not an array", other.type_name()),
                ))
            }
        };
        let terms: Vec<Value> = match args {
            None => return Ok(false),
            Some(Json::Array(terms)) => terms.iter().map(Value::from_json).collect(),
            Some(term) => vec![Value::from_json(term)],
        };
        Ok(terms
            .iter()
            .any(|term| items.iter().any(|item| search(item, term))))
    }

    fn ordering(
        &self,
        operator: Operator,
        selected: Option<&Value>,
        args: Option<&Json>,
    ) -> QueryResult<bool> {
        let bound = match args {
            Some(Json::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(other) => {
                return Err(QueryError::type_mismatch(
                    self.selector,
                    "number",
                    other,
                    Value::from_json(other).type_name(),
                ))
            }
            None => {
                return Err(QueryError::type_mismatch(
                    self.selector,
                    "number",
                    "undefined",
                    "undefined",
                ))
            }
        };
        let value = match selected {
            None | Some(Value::Null) => return Ok(false),
            Some(v @ (Value::Integer(_) | Value::Float(_))) => v.as_f64().unwrap_or(f64::NAN),
            Some(other) => {
                return Err(QueryError::type_mismatch(
                    self.selector,
                    "number",
                    other,
                    other.type_name(),
                ))
            }
        };
        Ok(match operator {
            Operator::Gt => value > bound,
            Operator::Gte => value >= bound,
            Operator::Lt => value < bound,
            _ => value <= bound,
        })
    }
}

fn array_of(selected: Option<&Value>) -> Option<&[Value]> {
    match selected {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Membership of one `in`/`has_any` argument; a null argument matches null
/// or absent values
fn member_matches(value: Option<&Value>, arg: &Json) -> bool {
    match (value, arg) {
        (None, Json::Null) => true,
        (None, _) => false,
        (Some(v), arg) => loose_eq(v, &Value::from_json(arg)),
    }
}

/// Equality across numeric representations and single characters
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
                _ => false,
            }
        }
        (Value::Char(_) | Value::String(_), Value::Char(_) | Value::String(_)) => {
            a.as_text() == b.as_text()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        _ => a == b,
    }
}

/// Case-insensitive prefix match for two strings, equality otherwise
fn search(value: &Value, term: &Value) -> bool {
    match (value, term) {
        (Value::String(_) | Value::Char(_), Value::String(_) | Value::Char(_)) => {
            let value = value.as_text().unwrap_or_default().to_uppercase();
            let term = term.as_text().unwrap_or_default().to_uppercase();
            value.starts_with(&term)
        }
        _ => loose_eq(value, term),
    }
}
