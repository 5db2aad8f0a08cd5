//! In-memory sort comparator
//!
//! Ordering rules:
//! - null sorts after every non-null value ascending
//! - descending compares `(b, a)`, so nulls come first
//! - numbers numerically, strings by uppercased codepoints, `true` before `false`
//! - arrays by their first element after sorting each in the key's direction
//! - an empty array sorts after any non-empty one in both directions
//!
//! Objects and mixed types are not comparable.

use std::cmp::Ordering;

use crate::codec::Value;
use crate::query::{select, QueryError, QueryResult, SortDirection, SortOrder};

/// Compares two values for one sort key
pub fn compare_values(a: &Value, b: &Value, direction: SortDirection) -> QueryResult<Ordering> {
    if let (Value::Array(x), Value::Array(y)) = (a, b) {
        return match (x.is_empty(), y.is_empty()) {
            (true, true) => Ok(Ordering::Equal),
            (true, false) => Ok(Ordering::Greater),
            (false, true) => Ok(Ordering::Less),
            (false, false) => {
                let x = sorted(x, direction)?;
                let y = sorted(y, direction)?;
                compare_values(&x[0], &y[0], direction)
            }
        };
    }
    match direction {
        SortDirection::Asc => base_compare(a, b),
        SortDirection::Desc => base_compare(b, a),
    }
}

/// Copy of `items` sorted in `direction`
fn sorted(items: &[Value], direction: SortDirection) -> QueryResult<Vec<Value>> {
    let mut items = items.to_vec();
    let mut error = None;
    items.sort_by(|a, b| match compare_values(a, b, direction) {
        Ok(ordering) => ordering,
        Err(err) => {
            error.get_or_insert(err);
            Ordering::Equal
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(items),
    }
}

fn base_compare(a: &Value, b: &Value) -> QueryResult<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Greater),
        (_, Value::Null) => Ok(Ordering::Less),
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            Ok(x.total_cmp(&y))
        }
        (Value::Bool(x), Value::Bool(y)) => Ok(y.cmp(x)),
        (Value::String(_) | Value::Char(_), Value::String(_) | Value::Char(_)) => {
            let x = a.as_text().unwrap_or_default().to_uppercase();
            let y = b.as_text().unwrap_or_default().to_uppercase();
            Ok(x.cmp(&y))
        }
        _ => Err(QueryError::not_comparable(a.type_name(), b.type_name())),
    }
}

/// Sorts items by a list of sort keys evaluated on their value trees.
///
/// The first key that differs decides; the sort is stable.
pub struct ValueSorter;

impl ValueSorter {
    pub fn sort<T>(
        items: Vec<T>,
        sort: &[SortOrder],
        project: impl Fn(&T) -> Value,
    ) -> QueryResult<Vec<T>> {
        if sort.is_empty() {
            return Ok(items);
        }
        let mut keyed = items
            .into_iter()
            .map(|item| {
                let tree = project(&item);
                let keys = sort
                    .iter()
                    .map(|order| {
                        select(&tree, &order.selector).map(|v| v.unwrap_or(Value::Null))
                    })
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok((keys, item))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let mut error = None;
        keyed.sort_by(|(a, _), (b, _)| {
            for (i, order) in sort.iter().enumerate() {
                let ordering = match &order.compare {
                    Some(compare) => Ok(compare(&a[i], &b[i])),
                    None => compare_values(&a[i], &b[i], order.direction)
                        .map_err(|e| e.with_selector(&order.selector)),
                };
                match ordering {
                    Ok(Ordering::Equal) => continue,
                    Ok(ordering) => return ordering,
                    Err(err) => {
                        error.get_or_insert(err);
                        return Ordering::Equal;
                    }
                }
            }
            Ordering::Equal
        });
        match error {
            Some(err) => Err(err),
            None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
        }
    }
}
