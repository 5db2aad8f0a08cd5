//! ORDER BY compilation
//!
//! Mirrors the in-memory comparator:
//! - text compares case-insensitively, categories by label; stored text is
//!   keyed through the `vcf_text_key` SQL function the store registers
//! - `true` sorts before `false`
//! - nulls sort last ascending and first descending
//! - empty arrays sort last in both directions
//! - an array sorts by its first element after sorting it in the key's direction

use crate::metadata::ValueType;

use super::ast::{SortDirection, SortOrder};
use super::compiler::{qualified, Column, QueryCompiler, Target, ELEMENT_ALIAS, VCF_ALIAS};
use super::errors::{QueryError, QueryResult};
use super::fragment::{SqlFragment, SqlParam};
use super::selector::{resolve, Resolved, Scope};
use crate::store::schema::ID;

/// SQL function mapping stored text to [`crate::codec::text_sort_key`]
pub const TEXT_KEY_FN: &str = "vcf_text_key";

impl<'g> QueryCompiler<'g> {
    /// Compiles sort keys into a comma-separated ORDER BY list.
    ///
    /// The record id is always appended as the final tiebreak.
    pub fn compile_order(&mut self, sort: &[SortOrder]) -> QueryResult<SqlFragment> {
        let mut terms = Vec::new();
        for order in sort {
            terms.extend(self.sort_terms(order)?);
        }
        let mut tiebreak = qualified(VCF_ALIAS, ID);
        tiebreak.push(" ASC");
        terms.push(tiebreak);
        Ok(SqlFragment::join(&terms, ", "))
    }

    fn sort_terms(&mut self, order: &SortOrder) -> QueryResult<Vec<SqlFragment>> {
        if order.compare.is_some() {
            return Err(QueryError::unsupported_operator(
                &order.selector,
                "compare",
                "custom comparators are only evaluated in memory",
            ));
        }
        let resolved = match resolve(self.graph, &order.selector)? {
            // a row-scoped nested field sorts by all of its rows
            Resolved::Nested {
                parent,
                child,
                scope: Scope::Row,
                element,
            } => Resolved::Nested {
                parent,
                child,
                scope: Scope::Any,
                element,
            },
            other => other,
        };
        let direction = order.direction;
        let terms = match self.build_target(resolved) {
            Target::Scalar(column) if column.shape.is_multi() => {
                let elements = sort_key(&column.elements());
                let mut empty = SqlFragment::raw("COALESCE(json_array_length(");
                empty.append(&column.expr).push("), 0) = 0");

                let mut source = SqlFragment::raw("json_each(");
                source.append(&column.expr).push(") AS ").push(ELEMENT_ALIAS);
                let key = aggregate(&elements, &source, None, direction);
                key_terms(Some(empty), key, direction)
            }
            Target::Scalar(column) => key_terms(None, sort_key(&column), direction),
            Target::Each {
                from,
                correlate,
                column,
            } => {
                if column.shape.is_multi() {
                    return Err(QueryError::unsupported_operator(
                        &order.selector,
                        "sort",
                        "cannot sort by arrays nested in a wildcard",
                    ));
                }
                let mut empty = SqlFragment::raw("NOT EXISTS (SELECT 1 FROM ");
                empty.append(&from).push(" WHERE ").append(&correlate).push(")");
                let key = aggregate(&sort_key(&column), &from, Some(&correlate), direction);
                key_terms(Some(empty), key, direction)
            }
        };
        Ok(terms)
    }
}

/// Expression whose SQL ordering matches the value ordering
fn sort_key(column: &Column<'_>) -> SqlFragment {
    let expr = &column.expr;
    match column.shape.value_type {
        ValueType::String | ValueType::Character => {
            let mut frag = SqlFragment::raw(TEXT_KEY_FN);
            frag.push("(");
            frag.append(expr).push(")");
            frag
        }
        ValueType::Categorical => match column.shape.categories {
            Some(categories) if !categories.is_empty() => {
                let mut frag = SqlFragment::raw("CASE ");
                frag.append(expr);
                for (key, category) in categories.iter() {
                    frag.push(" WHEN ")
                        .push_param(key)
                        .push(" THEN ")
                        .push_param(SqlParam::Text(category.label.to_uppercase()));
                }
                frag.push(" END");
                frag
            }
            _ => expr.clone(),
        },
        ValueType::Flag => {
            let mut frag = SqlFragment::raw("(1 - ");
            frag.append(expr).push(")");
            frag
        }
        ValueType::Integer | ValueType::Float => expr.clone(),
    }
}

/// First value of a group sorted in `direction`, nulls last ascending and
/// first descending
fn aggregate(
    key: &SqlFragment,
    source: &SqlFragment,
    correlate: Option<&SqlFragment>,
    direction: SortDirection,
) -> SqlFragment {
    let mut frag = SqlFragment::raw("(SELECT ");
    match direction {
        SortDirection::Asc => {
            frag.push("MIN(").append(key).push(")");
        }
        SortDirection::Desc => {
            frag.push("CASE WHEN COUNT(*) > COUNT(")
                .append(key)
                .push(") THEN NULL ELSE MAX(")
                .append(key)
                .push(") END");
        }
    }
    frag.push(" FROM ").append(source);
    if let Some(correlate) = correlate {
        frag.push(" WHERE ").append(correlate);
    }
    frag.push(")");
    frag
}

fn key_terms(
    empty: Option<SqlFragment>,
    key: SqlFragment,
    direction: SortDirection,
) -> Vec<SqlFragment> {
    let dir = match direction {
        SortDirection::Asc => " ASC",
        SortDirection::Desc => " DESC",
    };
    let mut terms = Vec::with_capacity(3);
    if let Some(mut empty) = empty {
        empty.push(" ASC");
        terms.push(empty);
    }
    let mut nulls = key.clone();
    nulls.push(" IS NULL").push(dir);
    terms.push(nulls);
    let mut key = key;
    key.push(dir);
    terms.push(key);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldDescriptor, MetadataGraph};
    use crate::query::QueryErrorCode;
    use crate::selector;
    use std::sync::Arc;

    fn graph() -> MetadataGraph {
        MetadataGraph::build(&[
            FieldDescriptor::info("n_number2", "INTEGER"),
            FieldDescriptor::info("CLASS", "CATEGORICAL")
                .with_category(0, "lp")
                .with_category(1, "P"),
            FieldDescriptor::format("GT", "STRING"),
            FieldDescriptor::format("AD", "INTEGER").with_number("R", None),
        ])
        .unwrap()
    }

    fn order(graph: &MetadataGraph, sort: &[SortOrder]) -> QueryResult<SqlFragment> {
        QueryCompiler::new(graph).compile_order(sort)
    }

    #[test]
    fn test_default_order_is_record_id() {
        let g = graph();
        assert_eq!(order(&g, &[]).unwrap().sql, "v.\"id\" ASC");
    }

    #[test]
    fn test_scalar_nulls_follow_direction() {
        let g = graph();
        let frag = order(&g, &[SortOrder::desc(selector!["n", "n_number2"])]).unwrap();
        assert_eq!(
            frag.sql,
            "i.\"n_number2\" IS NULL DESC, i.\"n_number2\" DESC, v.\"id\" ASC"
        );
        let frag = order(&g, &[SortOrder::asc(selector!["c"])]).unwrap();
        assert_eq!(
            frag.sql,
            "vcf_text_key(v.\"chrom\") IS NULL ASC, vcf_text_key(v.\"chrom\") ASC, v.\"id\" ASC"
        );
    }

    #[test]
    fn test_categories_sort_by_label() {
        let g = graph();
        let frag = order(&g, &[SortOrder::asc(selector!["n", "CLASS"])]).unwrap();
        assert!(frag.sql.starts_with("CASE i.\"CLASS\" WHEN ? THEN ? WHEN ? THEN ? END"));
        assert_eq!(frag.params[1], SqlParam::Text("LP".to_string()));
    }

    #[test]
    fn test_array_sorts_by_first_element() {
        let g = graph();
        let frag = order(&g, &[SortOrder::asc(selector!["a"])]).unwrap();
        assert!(frag
            .sql
            .starts_with("COALESCE(json_array_length(v.\"alt\"), 0) = 0 ASC, (SELECT MIN(vcf_text_key(j.\"value\")) FROM json_each(v.\"alt\") AS j)"));
    }

    #[test]
    fn test_wildcard_sort_aggregates_rows() {
        let g = graph();
        let frag = order(&g, &[SortOrder::desc(selector!["s", "*", "GT", "t"])]).unwrap();
        assert!(frag.sql.starts_with(
            "NOT EXISTS (SELECT 1 FROM \"format\" AS x WHERE x.\"variantId\" = v.\"id\") ASC"
        ));
        assert!(frag.sql.contains("CASE WHEN COUNT(*) > COUNT(vcf_text_key(x.\"GT_t\"))"));

        let err = order(&g, &[SortOrder::asc(selector!["s", "*", "AD"])]).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_custom_comparator_rejected() {
        let g = graph();
        let sort = SortOrder::with_compare(selector!["p"], Arc::new(|a, b| a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(std::cmp::Ordering::Equal)));
        let err = order(&g, &[sort]).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedOperator);
    }
}
