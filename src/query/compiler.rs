//! Query compiler
//!
//! Compiles a `Query` into a parameterized filter over the report schema.
//!
//! Aliases:
//! - `v`: the `vcf` table
//! - `i`: the `info` table (always LEFT JOINed)
//! - `n<k>`: a nested INFO table joined for row-level clauses
//! - `x`: the one-to-many table inside a correlated subquery
//! - `j`: `json_each` over a multi-valued column
//!
//! Negated operators are compiled as `NOT COALESCE(<positive>, 0)` so that a
//! NULL comparison counts as a non-match on both sides.

use std::collections::BTreeSet;

use serde_json::Value as Json;
use tracing::warn;

use crate::codec::{encode_value, Token, Value};
use crate::metadata::{FieldId, FieldShape, MetadataGraph, ValueType};
use crate::store::schema::{
    nested_table, FORMAT_TABLE, ID, INFO_TABLE, SAMPLE_INDEX, VARIANT_ID, VCF_TABLE,
};

use super::ast::{Clause, Composition, Operator, Query, Selector, SortOrder};
use super::errors::{QueryError, QueryResult};
use super::fragment::{SqlFragment, SqlParam};
use super::selector::{resolve, Resolved, Scope};

pub const VCF_ALIAS: &str = "v";
pub const INFO_ALIAS: &str = "i";
pub const ROW_ALIAS: &str = "x";
pub const ELEMENT_ALIAS: &str = "j";

/// Alias of a joined nested table
pub fn nested_alias(field: FieldId) -> String {
    format!("n{}", field.index())
}

/// `alias."column"`
pub fn qualified(alias: &str, column: &str) -> SqlFragment {
    let mut frag = SqlFragment::raw(alias);
    frag.push(".").push_ident(column);
    frag
}

/// A single-valued SQL expression with the shape of the value it yields
#[derive(Debug, Clone)]
pub struct Column<'g> {
    pub expr: SqlFragment,
    pub shape: FieldShape<'g>,
    /// Expression reads `json_each` output, where non-finite floats are strings
    pub json_element: bool,
}

impl<'g> Column<'g> {
    fn new(expr: SqlFragment, shape: FieldShape<'g>) -> Self {
        Self {
            expr,
            shape,
            json_element: false,
        }
    }

    /// Column over the elements of this multi-valued column
    pub(crate) fn elements(&self) -> Column<'g> {
        Column {
            expr: qualified(ELEMENT_ALIAS, "value"),
            shape: self.shape.element(),
            json_element: true,
        }
    }

    /// `json_each(<expr>) AS j`
    fn json_each(&self) -> SqlFragment {
        let mut frag = SqlFragment::raw("json_each(");
        frag.append(&self.expr).push(") AS ").push(ELEMENT_ALIAS);
        frag
    }
}

/// What a selector compiles to
#[derive(Debug, Clone)]
pub enum Target<'g> {
    /// One value per outer row
    Scalar(Column<'g>),
    /// One value per row of a correlated one-to-many relation
    Each {
        from: SqlFragment,
        correlate: SqlFragment,
        column: Column<'g>,
    },
}

/// Filter, order and join plan of one request
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub filter: SqlFragment,
    pub order: SqlFragment,
    /// Nested fields joined row-wise by the filter
    pub joins: Vec<FieldId>,
}

/// Compiles an optional query and sort list against a metadata graph
pub fn compile(
    graph: &MetadataGraph,
    query: Option<&Query>,
    sort: &[SortOrder],
) -> QueryResult<CompiledQuery> {
    let mut compiler = QueryCompiler::new(graph);
    let filter = match query {
        Some(query) => compiler.compile_filter(query)?,
        None => SqlFragment::raw("1"),
    };
    let order = compiler.compile_order(sort)?;
    Ok(CompiledQuery {
        filter,
        order,
        joins: compiler.joins.into_iter().collect(),
    })
}

/// `FROM vcf AS v LEFT JOIN info AS i ... LEFT JOIN info_<F> AS n<k> ...`
pub fn from_clause(graph: &MetadataGraph, joins: &[FieldId]) -> SqlFragment {
    let mut frag = SqlFragment::raw(" FROM ");
    frag.push_ident(VCF_TABLE)
        .push(" AS ")
        .push(VCF_ALIAS)
        .push(" LEFT JOIN ")
        .push_ident(INFO_TABLE)
        .push(" AS ")
        .push(INFO_ALIAS)
        .push(" ON ")
        .append(&qualified(INFO_ALIAS, VARIANT_ID))
        .push(" = ")
        .append(&qualified(VCF_ALIAS, ID));
    for field in joins {
        let alias = nested_alias(*field);
        frag.push(" LEFT JOIN ")
            .push_ident(&nested_table(&graph.field(*field).id))
            .push(" AS ")
            .push(&alias)
            .push(" ON ")
            .append(&qualified(&alias, VARIANT_ID))
            .push(" = ")
            .append(&qualified(VCF_ALIAS, ID));
    }
    frag
}

/// Stateful compiler; collects the nested joins its clauses need
pub struct QueryCompiler<'g> {
    pub(crate) graph: &'g MetadataGraph,
    joins: BTreeSet<FieldId>,
}

impl<'g> QueryCompiler<'g> {
    pub fn new(graph: &'g MetadataGraph) -> Self {
        Self {
            graph,
            joins: BTreeSet::new(),
        }
    }

    /// Nested fields joined so far
    pub fn joins(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.joins.iter().copied()
    }

    /// Compiles a query into a boolean SQL expression
    pub fn compile_filter(&mut self, query: &Query) -> QueryResult<SqlFragment> {
        match query {
            Query::Composed(composition, children) => {
                let (separator, empty) = match composition {
                    Composition::And => (" AND ", "1"),
                    Composition::Or => (" OR ", "0"),
                };
                if children.is_empty() {
                    return Ok(SqlFragment::raw(empty));
                }
                let parts = children
                    .iter()
                    .map(|child| self.compile_filter(child))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(SqlFragment::join(&parts, separator).parenthesized())
            }
            Query::Clause(clause) => self.compile_clause(clause),
        }
    }

    fn compile_clause(&mut self, clause: &Clause) -> QueryResult<SqlFragment> {
        let target = self.target(&clause.selector)?;
        let ctx = ClauseContext {
            selector: &clause.selector,
            operator: clause.operator,
        };
        let (operator, negated) = clause.operator.split_negation();
        let args = clause.args.as_ref();
        let positive = match &target {
            Target::Scalar(column) => self.predicate(&ctx, column, operator, args)?,
            Target::Each {
                from,
                correlate,
                column,
            } => self.exists(&ctx, from, correlate, column, operator, args)?,
        };
        Ok(if negated { negate(&positive) } else { positive })
    }

    /// Resolves a selector and builds its SQL target
    pub(crate) fn target(&mut self, selector: &Selector) -> QueryResult<Target<'g>> {
        let resolved = resolve(self.graph, selector)?;
        Ok(self.build_target(resolved))
    }

    pub(crate) fn build_target(&mut self, resolved: Resolved) -> Target<'g> {
        let graph = self.graph;
        let shape = resolved.shape(graph);
        match resolved {
            Resolved::Fixed { column, element } => Target::Scalar(Column::new(
                with_element(qualified(VCF_ALIAS, column.column()), element),
                shape,
            )),
            Resolved::Info { field, element } => Target::Scalar(Column::new(
                with_element(qualified(INFO_ALIAS, &graph.field(field).id), element),
                shape,
            )),
            Resolved::Nested {
                parent,
                child,
                scope,
                element,
            } => {
                let table = nested_table(&graph.field(parent).id);
                let child = &graph.field(child).id;
                match scope {
                    Scope::Row => {
                        self.joins.insert(parent);
                        let alias = nested_alias(parent);
                        Target::Scalar(Column::new(
                            with_element(qualified(&alias, child), element),
                            shape,
                        ))
                    }
                    Scope::Index(k) => {
                        let Some(offset) = row_position(k) else {
                            return Target::Scalar(Column::new(SqlFragment::raw("NULL"), shape));
                        };
                        let expr = with_element(qualified(ROW_ALIAS, child), element);
                        let mut sub = SqlFragment::raw("(SELECT ");
                        sub.append(&expr)
                            .push(" FROM ")
                            .append(&row_source(&table))
                            .push(" WHERE ")
                            .append(&correlation())
                            .push(" ORDER BY ")
                            .append(&qualified(ROW_ALIAS, ID))
                            .push(" LIMIT 1 OFFSET ")
                            .push_param(offset)
                            .push(")");
                        Target::Scalar(Column::new(sub, shape))
                    }
                    Scope::Any => Target::Each {
                        from: row_source(&table),
                        correlate: correlation(),
                        column: Column::new(with_element(qualified(ROW_ALIAS, child), element), shape),
                    },
                }
            }
            Resolved::Format {
                scope,
                field,
                part,
                element,
            } => {
                let name = part
                    .map(|p| p.column())
                    .unwrap_or_else(|| graph.field(field).id.clone());
                let expr = with_element(qualified(ROW_ALIAS, &name), element);
                match scope {
                    Scope::Index(k) => {
                        let Some(index) = row_position(k) else {
                            return Target::Scalar(Column::new(SqlFragment::raw("NULL"), shape));
                        };
                        let mut sub = SqlFragment::raw("(SELECT ");
                        sub.append(&expr)
                            .push(" FROM ")
                            .append(&row_source(FORMAT_TABLE))
                            .push(" WHERE ")
                            .append(&correlation())
                            .push(" AND ")
                            .append(&qualified(ROW_ALIAS, SAMPLE_INDEX))
                            .push(" = ")
                            .push_param(index)
                            .push(")");
                        Target::Scalar(Column::new(sub, shape))
                    }
                    Scope::Any | Scope::Row => Target::Each {
                        from: row_source(FORMAT_TABLE),
                        correlate: correlation(),
                        column: Column::new(expr, shape),
                    },
                }
            }
        }
    }

    /// Positive predicate over a single-valued expression
    fn predicate(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        operator: Operator,
        args: Option<&Json>,
    ) -> QueryResult<SqlFragment> {
        match operator {
            Operator::Eq => self.equals(ctx, column, args),
            Operator::In => match args {
                Some(Json::Array(_)) if column.shape.is_multi() => {
                    self.any_element(column, |elements| self.member_of(ctx, elements, args))
                }
                _ => self.member_of(ctx, column, args),
            },
            Operator::HasAny => {
                require_multi(ctx, column)?;
                match args {
                    None => Ok(is_null(column)),
                    Some(_) => {
                        self.any_element(column, |elements| self.member_of(ctx, elements, args))
                    }
                }
            }
            Operator::Search => {
                if column.shape.is_multi() {
                    return Err(ctx.unsupported("value is an array, use '~=_any'"));
                }
                self.search(ctx, column, &[args.unwrap_or(&Json::Null)])
            }
            Operator::SearchAny => {
                require_multi(ctx, column)?;
                let terms = search_terms(args);
                self.any_element(column, |elements| self.search(ctx, elements, &terms))
            }
            Operator::AnyHasAny | Operator::AnySearchAny => {
                Err(ctx.unsupported("requires a wildcard over array values"))
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                self.ordering(ctx, column, operator, args)
            }
            Operator::NotEq | Operator::NotIn | Operator::NotHasAny | Operator::NotAnyHasAny => {
                let (positive, _) = operator.split_negation();
                self.predicate(ctx, column, positive, args)
                    .map(|frag| negate(&frag))
            }
        }
    }

    /// Existence test over the rows of a one-to-many relation
    fn exists(
        &self,
        ctx: &ClauseContext<'_>,
        from: &SqlFragment,
        correlate: &SqlFragment,
        column: &Column<'g>,
        operator: Operator,
        args: Option<&Json>,
    ) -> QueryResult<SqlFragment> {
        let element_operator = match operator {
            Operator::HasAny => Some(Operator::In),
            Operator::AnyHasAny => Some(Operator::HasAny),
            Operator::SearchAny => Some(Operator::Search),
            Operator::AnySearchAny => Some(Operator::SearchAny),
            _ => None,
        };
        if element_operator.is_some() && args.is_none() {
            // the expanded array always exists, so absent args never match
            return Ok(SqlFragment::raw("0"));
        }
        let inner = match element_operator {
            Some(Operator::Search) => self.search(ctx, column, &search_terms(args))?,
            Some(op) => self.predicate(ctx, column, op, args)?,
            None => self.predicate(ctx, column, operator, args)?,
        };
        let mut frag = SqlFragment::raw("EXISTS (SELECT 1 FROM ");
        frag.append(from)
            .push(" WHERE ")
            .append(correlate)
            .push(" AND ")
            .append(&inner)
            .push(")");
        Ok(frag)
    }

    /// `EXISTS (SELECT 1 FROM json_each(<column>) AS j WHERE <inner>)`
    fn any_element(
        &self,
        column: &Column<'g>,
        inner: impl FnOnce(&Column<'g>) -> QueryResult<SqlFragment>,
    ) -> QueryResult<SqlFragment> {
        let condition = inner(&column.elements())?;
        let mut frag = SqlFragment::raw("EXISTS (SELECT 1 FROM ");
        frag.append(&column.json_each())
            .push(" WHERE ")
            .append(&condition)
            .push(")");
        Ok(frag)
    }

    fn equals(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        args: Option<&Json>,
    ) -> QueryResult<SqlFragment> {
        let arg = match args {
            None | Some(Json::Null) => return Ok(is_null(column)),
            Some(arg) => arg,
        };
        let param = match arg {
            Json::Array(_) if column.shape.is_multi() => self.bind_array(ctx, column, arg)?,
            Json::Array(_) => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    column.shape.value_type.as_str(),
                    arg,
                    "array",
                ))
            }
            _ if column.shape.is_multi() => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    "array",
                    arg,
                    Value::from_json(arg).type_name(),
                ))
            }
            _ => self.bind(ctx, column, arg)?,
        };
        Ok(match param {
            Some(param) => {
                let mut frag = column.expr.clone();
                frag.push(" = ").push_param(param);
                frag
            }
            None => SqlFragment::raw("0"),
        })
    }

    /// `<column> IN (...)`, or'ed with `IS NULL` when the list holds null
    fn member_of(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        args: Option<&Json>,
    ) -> QueryResult<SqlFragment> {
        let items = match args {
            Some(Json::Array(items)) => items,
            Some(other) => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    "array",
                    other,
                    Value::from_json(other).type_name(),
                ))
            }
            None => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    "array",
                    "undefined",
                    "undefined",
                ))
            }
        };
        let mut params = Vec::new();
        let mut has_null = false;
        for item in items {
            if item.is_null() {
                has_null = true;
            } else if let Some(param) = self.bind(ctx, column, item)? {
                params.push(param);
            }
        }

        let mut parts = Vec::new();
        if !params.is_empty() {
            let mut frag = column.expr.clone();
            frag.push(" IN (").push_params(params).push(")");
            parts.push(frag);
        }
        if has_null {
            parts.push(is_null(column));
        }
        Ok(match parts.len() {
            0 => SqlFragment::raw("0"),
            1 => parts.remove(0),
            _ => SqlFragment::join(&parts, " OR ").parenthesized(),
        })
    }

    /// Case-insensitive prefix match for text, exact match otherwise
    fn search(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        terms: &[&Json],
    ) -> QueryResult<SqlFragment> {
        let mut parts = Vec::new();
        for term in terms {
            let frag = match (term, column.shape.value_type) {
                (Json::String(s), vt) if vt.is_textual() => {
                    let mut frag = column.expr.clone();
                    frag.push(" LIKE ")
                        .push_param(like_prefix(&crate::codec::escape(s)))
                        .push(" ESCAPE '\\'");
                    frag
                }
                (Json::String(s), ValueType::Categorical) => {
                    let keys = column
                        .shape
                        .categories
                        .map(|cats| cats.keys_with_prefix(s))
                        .unwrap_or_default();
                    if keys.is_empty() {
                        SqlFragment::raw("0")
                    } else {
                        let mut frag = column.expr.clone();
                        frag.push(" IN (").push_params(keys).push(")");
                        frag
                    }
                }
                _ => self.equals(ctx, column, Some(*term))?,
            };
            parts.push(frag);
        }
        Ok(match parts.len() {
            0 => SqlFragment::raw("0"),
            1 => parts.remove(0),
            _ => SqlFragment::join(&parts, " OR ").parenthesized(),
        })
    }

    fn ordering(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        operator: Operator,
        args: Option<&Json>,
    ) -> QueryResult<SqlFragment> {
        let number = match args {
            Some(Json::Number(n)) => n,
            Some(other) => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    "number",
                    other,
                    Value::from_json(other).type_name(),
                ))
            }
            None => {
                return Err(QueryError::type_mismatch(
                    ctx.selector,
                    "number",
                    "undefined",
                    "undefined",
                ))
            }
        };
        if column.shape.is_multi() || !column.shape.value_type.is_numeric() {
            return Err(QueryError::type_mismatch(
                ctx.selector,
                "single-valued numeric field",
                number,
                column.shape.value_type.as_str(),
            ));
        }
        let param = match number.as_i64() {
            Some(i) => SqlParam::Integer(i),
            None => SqlParam::Real(number.as_f64().unwrap_or(f64::NAN)),
        };
        let mut frag = SqlFragment::raw("(typeof(");
        frag.append(&column.expr)
            .push(") IN ('integer', 'real') AND ")
            .append(&column.expr)
            .push(" ")
            .push(operator.sql_symbol())
            .push(" ")
            .push_param(param)
            .push(")");
        Ok(frag)
    }

    /// Encodes one argument for comparison with `column`.
    ///
    /// Returns `None` for a categorical label missing from the dictionary.
    fn bind(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        arg: &Json,
    ) -> QueryResult<Option<SqlParam>> {
        let shape = column.shape.element();
        let value = Value::from_json(arg);
        if shape.value_type == ValueType::Categorical {
            let label = value.as_text().ok_or_else(|| {
                QueryError::type_mismatch(ctx.selector, "category label", arg, value.type_name())
            })?;
            return Ok(match shape.categories.and_then(|cats| cats.key(&label)) {
                Some(key) => Some(SqlParam::Integer(key)),
                None => {
                    warn!(selector = %ctx.selector, label = %label, "dropping unknown category label");
                    None
                }
            });
        }
        let token = encode_value(shape, &value).map_err(|_| {
            QueryError::type_mismatch(ctx.selector, shape.value_type.as_str(), arg, value.type_name())
        })?;
        Ok(Some(element_param(token, column.json_element)))
    }

    /// Encodes an array argument as the stored JSON text of a multi-valued column
    fn bind_array(
        &self,
        ctx: &ClauseContext<'_>,
        column: &Column<'g>,
        arg: &Json,
    ) -> QueryResult<Option<SqlParam>> {
        let value = Value::from_json(arg);
        if column.shape.value_type == ValueType::Categorical {
            let items = value.as_array().unwrap_or(&[]);
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                let label = item.as_text();
                match label.as_deref().and_then(|l| column.shape.categories?.key(l)) {
                    Some(key) => keys.push(Json::from(key)),
                    None if item.is_null() => keys.push(Json::Null),
                    None => {
                        warn!(selector = %ctx.selector, value = %item, "dropping unknown category label");
                        return Ok(None);
                    }
                }
            }
            return Ok(Some(SqlParam::Text(Json::Array(keys).to_string())));
        }
        let token = encode_value(column.shape, &value).map_err(|_| {
            QueryError::type_mismatch(
                ctx.selector,
                column.shape.value_type.as_str(),
                arg,
                "array",
            )
        })?;
        Ok(Some(SqlParam::from(token)))
    }
}

/// Clause being compiled, for error context
pub(crate) struct ClauseContext<'a> {
    pub selector: &'a Selector,
    pub operator: Operator,
}

impl ClauseContext<'_> {
    fn unsupported(&self, reason: &str) -> QueryError {
        QueryError::unsupported_operator(self.selector, self.operator, reason)
    }
}

fn require_multi(ctx: &ClauseContext<'_>, column: &Column<'_>) -> QueryResult<()> {
    if column.shape.is_multi() {
        Ok(())
    } else {
        Err(ctx.unsupported("value is not an array"))
    }
}

/// Search terms: the elements of an array argument, or the argument itself
fn search_terms(args: Option<&Json>) -> Vec<&Json> {
    match args {
        Some(Json::Array(items)) => items.iter().collect(),
        Some(arg) => vec![arg],
        None => Vec::new(),
    }
}

/// Inside JSON arrays non-finite floats are stored as strings
fn element_param(token: Token, json_element: bool) -> SqlParam {
    match token {
        Token::Real(f) if json_element && !f.is_finite() => {
            SqlParam::Text(crate::codec::format_real(f))
        }
        other => SqlParam::from(other),
    }
}

/// LIKE pattern matching values that start with `prefix`
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_null(column: &Column<'_>) -> SqlFragment {
    let mut frag = column.expr.clone();
    frag.push(" IS NULL");
    frag
}

/// Row position as an SQL integer; `None` when no row can sit there
fn row_position(k: usize) -> Option<i64> {
    i64::try_from(k).ok()
}

fn negate(positive: &SqlFragment) -> SqlFragment {
    let mut frag = SqlFragment::raw("NOT COALESCE(");
    frag.append(positive).push(", 0)");
    frag
}

/// `json_extract(<expr>, '$[k]')` when an element index is given
fn with_element(expr: SqlFragment, element: Option<usize>) -> SqlFragment {
    match element {
        None => expr,
        Some(k) => {
            let mut frag = SqlFragment::raw("json_extract(");
            frag.append(&expr)
                .push(", ")
                .push_param(format!("$[{}]", k))
                .push(")");
            frag
        }
    }
}

/// `"table" AS x`
pub(crate) fn row_source(table: &str) -> SqlFragment {
    let mut frag = SqlFragment::new();
    frag.push_ident(table).push(" AS ").push(ROW_ALIAS);
    frag
}

/// `x."variantId" = v."id"`
pub(crate) fn correlation() -> SqlFragment {
    let mut frag = qualified(ROW_ALIAS, VARIANT_ID);
    frag.push(" = ").append(&qualified(VCF_ALIAS, ID));
    frag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldDescriptor;
    use crate::query::QueryErrorCode;
    use crate::selector;
    use serde_json::json;

    fn graph() -> MetadataGraph {
        MetadataGraph::build(&[
            FieldDescriptor::info("n_number2", "INTEGER"),
            FieldDescriptor::info("AF", "FLOAT").with_number("A", None),
            FieldDescriptor::info("CLASS", "CATEGORICAL")
                .with_category(0, "LP")
                .with_category(1, "P"),
            FieldDescriptor::info("CSQ", "STRING")
                .with_number("OTHER", None)
                .with_nested("|"),
            FieldDescriptor::info("Gene", "STRING").with_parent("CSQ"),
            FieldDescriptor::info("Consequence", "STRING")
                .with_parent("CSQ")
                .with_number("OTHER", None),
            FieldDescriptor::format("GT", "STRING"),
            FieldDescriptor::format("DP", "INTEGER"),
        ])
        .unwrap()
    }

    fn filter(graph: &MetadataGraph, query: Query) -> QueryResult<SqlFragment> {
        QueryCompiler::new(graph).compile_filter(&query)
    }

    #[test]
    fn test_equality_binds_parameters() {
        let g = graph();
        let frag = filter(&g, Query::clause(selector!["p"], Operator::Eq, json!(10042538))).unwrap();
        assert_eq!(frag.sql, "v.\"pos\" = ?");
        assert_eq!(frag.params, vec![SqlParam::Integer(10042538)]);
    }

    #[test]
    fn test_null_and_empty_array_equality() {
        let g = graph();
        let frag = filter(&g, Query::clause(selector!["q"], Operator::Eq, Json::Null)).unwrap();
        assert_eq!(frag.sql, "v.\"qual\" IS NULL");

        let frag = filter(&g, Query::clause(selector!["q"], Operator::NotEq, Json::Null)).unwrap();
        assert_eq!(frag.sql, "NOT COALESCE(v.\"qual\" IS NULL, 0)");

        let frag = filter(&g, Query::clause(selector!["f"], Operator::Eq, json!([]))).unwrap();
        assert_eq!(frag.sql, "v.\"filter\" = ?");
        assert_eq!(frag.params, vec![SqlParam::Text("[]".to_string())]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_unaddressable_row_index_is_null() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "CSQ", usize::MAX, "Gene"], Operator::Eq, json!("BRCA2")),
        )
        .unwrap();
        assert_eq!(frag.sql, "NULL = ?");

        let frag = filter(
            &g,
            Query::clause(selector!["s", usize::MAX, "DP"], Operator::Eq, json!(1)),
        )
        .unwrap();
        assert_eq!(frag.sql, "NULL = ?");

        let frag = filter(
            &g,
            Query::clause(selector!["n", "CSQ", 1usize, "Gene"], Operator::Eq, json!("BRCA2")),
        )
        .unwrap();
        assert!(frag.sql.contains("LIMIT 1 OFFSET ?"));
        assert_eq!(frag.params[0], SqlParam::Integer(1));
    }

    #[test]
    fn test_strings_are_escaped_before_binding() {
        let g = graph();
        let frag = filter(&g, Query::clause(selector!["c"], Operator::Eq, json!("a;b"))).unwrap();
        assert_eq!(frag.params, vec![SqlParam::Text("a%3Bb".to_string())]);
    }

    #[test]
    fn test_in_with_null_member() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "n_number2"], Operator::In, json!([1, null])),
        )
        .unwrap();
        assert_eq!(frag.sql, "(i.\"n_number2\" IN (?) OR i.\"n_number2\" IS NULL)");

        let frag = filter(
            &g,
            Query::clause(selector!["n", "n_number2"], Operator::NotIn, json!([1])),
        )
        .unwrap();
        assert_eq!(frag.sql, "NOT COALESCE(i.\"n_number2\" IN (?), 0)");

        let err = filter(
            &g,
            Query::clause(selector!["n", "n_number2"], Operator::In, json!(1)),
        )
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
    }

    #[test]
    fn test_ordering_requires_number() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "n_number2"], Operator::Gt, json!(0)),
        )
        .unwrap();
        assert_eq!(
            frag.sql,
            "(typeof(i.\"n_number2\") IN ('integer', 'real') AND i.\"n_number2\" > ?)"
        );

        for args in [json!(null), json!("1")] {
            let err = filter(
                &g,
                Query::clause(selector!["n", "n_number2"], Operator::Lte, args),
            )
            .unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
        }
        let absent = Query::Clause(Clause::without_args(selector!["p"], Operator::Gt));
        assert!(filter(&g, absent).is_err());

        let err = filter(&g, Query::clause(selector!["c"], Operator::Gt, json!(1))).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
    }

    #[test]
    fn test_categorical_labels_rewritten() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "CLASS"], Operator::In, json!(["P", "VUS"])),
        )
        .unwrap();
        assert_eq!(frag.sql, "i.\"CLASS\" IN (?)");
        assert_eq!(frag.params, vec![SqlParam::Integer(1)]);

        let frag = filter(
            &g,
            Query::clause(selector!["n", "CLASS"], Operator::Eq, json!("VUS")),
        )
        .unwrap();
        assert_eq!(frag.sql, "0");
    }

    #[test]
    fn test_has_any_over_samples() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(
                selector!["s", "*", "GT", "t"],
                Operator::HasAny,
                json!(["hom_a", "hom_r"]),
            ),
        )
        .unwrap();
        assert_eq!(
            frag.sql,
            "EXISTS (SELECT 1 FROM \"format\" AS x WHERE x.\"variantId\" = v.\"id\" AND x.\"GT_t\" IN (?, ?))"
        );

        let frag = filter(
            &g,
            Query::Clause(Clause::without_args(
                selector!["s", "*", "GT", "t"],
                Operator::NotHasAny,
            )),
        )
        .unwrap();
        assert_eq!(frag.sql, "NOT COALESCE(0, 0)");
    }

    #[test]
    fn test_has_any_on_arrays() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "AF"], Operator::HasAny, json!([0.5, null])),
        )
        .unwrap();
        assert_eq!(
            frag.sql,
            "EXISTS (SELECT 1 FROM json_each(i.\"AF\") AS j WHERE (j.\"value\" IN (?) OR j.\"value\" IS NULL))"
        );

        let frag = filter(
            &g,
            Query::Clause(Clause::without_args(selector!["n", "AF"], Operator::HasAny)),
        )
        .unwrap();
        assert_eq!(frag.sql, "i.\"AF\" IS NULL");

        let err = filter(
            &g,
            Query::clause(selector!["p"], Operator::HasAny, json!([1])),
        )
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_any_has_any_over_nested_rows() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(
                selector!["n", "CSQ", "*", "Consequence"],
                Operator::AnyHasAny,
                json!(["stop_gained"]),
            ),
        )
        .unwrap();
        assert_eq!(
            frag.sql,
            "EXISTS (SELECT 1 FROM \"info_CSQ\" AS x WHERE x.\"variantId\" = v.\"id\" AND EXISTS (SELECT 1 FROM json_each(x.\"Consequence\") AS j WHERE j.\"value\" IN (?)))"
        );
    }

    #[test]
    fn test_nested_row_scope_joins_once() {
        let g = graph();
        let mut compiler = QueryCompiler::new(&g);
        let query = Query::and(vec![
            Query::clause(selector!["n", "CSQ", "Gene"], Operator::Eq, json!("BRCA1")),
            Query::clause(
                selector!["n", "CSQ", "Consequence"],
                Operator::HasAny,
                json!(["missense_variant"]),
            ),
        ]);
        let frag = compiler.compile_filter(&query).unwrap();
        let csq = g.info("CSQ").unwrap();
        assert_eq!(compiler.joins().collect::<Vec<_>>(), vec![csq]);
        let alias = nested_alias(csq);
        assert!(frag.sql.starts_with(&format!("({}.\"Gene\" = ?", alias)));
    }

    #[test]
    fn test_indexed_sample_subquery() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["s", 1usize, "DP"], Operator::Gte, json!(10)),
        )
        .unwrap();
        assert!(frag.sql.contains("x.\"sampleIndex\" = ?"));
        assert_eq!(
            frag.params,
            vec![
                SqlParam::Integer(1),
                SqlParam::Integer(1),
                SqlParam::Integer(10)
            ]
        );
    }

    #[test]
    fn test_search_prefix() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["n", "CSQ", "Gene"], Operator::Search, json!("br_")),
        )
        .unwrap();
        assert!(frag.sql.ends_with("LIKE ? ESCAPE '\\'"));
        assert_eq!(frag.params, vec![SqlParam::Text("br\\_%".to_string())]);

        let frag = filter(
            &g,
            Query::clause(selector!["n", "CLASS"], Operator::Search, json!("l")),
        )
        .unwrap();
        assert_eq!(frag.sql, "i.\"CLASS\" IN (?)");
        assert_eq!(frag.params, vec![SqlParam::Integer(0)]);
    }

    #[test]
    fn test_composition() {
        let g = graph();
        let frag = filter(
            &g,
            Query::or(vec![
                Query::clause(selector!["p"], Operator::Eq, json!(1)),
                Query::clause(selector!["r"], Operator::Eq, json!("G")),
            ]),
        )
        .unwrap();
        assert_eq!(frag.sql, "(v.\"pos\" = ? OR v.\"ref\" = ?)");
        assert_eq!(filter(&g, Query::and(vec![])).unwrap().sql, "1");
        assert_eq!(filter(&g, Query::or(vec![])).unwrap().sql, "0");
    }

    #[test]
    fn test_element_index_binds_path() {
        let g = graph();
        let frag = filter(
            &g,
            Query::clause(selector!["a", 0usize], Operator::Eq, json!("T")),
        )
        .unwrap();
        assert_eq!(frag.sql, "json_extract(v.\"alt\", ?) = ?");
        assert_eq!(
            frag.params,
            vec![
                SqlParam::Text("$[0]".to_string()),
                SqlParam::Text("T".to_string())
            ]
        );
    }
}
