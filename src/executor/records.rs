//! Record query execution
//!
//! # Execution Flow (strict order)
//!
//! 1. Count the unfiltered dataset
//! 2. Count distinct records matching the filter
//! 3. Select the page of record ids in sort order
//! 4. Fetch every column of those records with the filter re-applied
//! 5. Assemble records and restore page order
//!
//! All filtering and ordering runs in SQLite; only the rows of one page are
//! materialized.

use std::collections::HashMap;

use tracing::debug;

use crate::metadata::MetadataGraph;
use crate::model::Record;
use crate::query::{
    compile, from_clause, nested_alias, qualified, CompiledQuery, FixedColumn, Query, SortOrder,
    SqlFragment, INFO_ALIAS, VCF_ALIAS,
};
use crate::store::schema::{FORMAT_TABLE, ID, SAMPLE_INDEX, VARIANT_ID, VCF_TABLE};
use crate::store::{RowSource, StoreError};

use super::assembler::{RecordAssembler, TableLayout, FORMAT_PREFIX, INFO_PREFIX, KEY_MARKER};
use super::errors::ExecutorResult;
use super::result::{Page, PageRequest, PagedItems};

/// Alias of the joined format table
const SAMPLE_ALIAS: &str = "s";

/// Runs record queries against one dataset
pub struct RecordExecutor<'a, S: RowSource + ?Sized> {
    store: &'a S,
    graph: &'a MetadataGraph,
    layout: &'a TableLayout,
}

impl<'a, S: RowSource + ?Sized> RecordExecutor<'a, S> {
    pub fn new(store: &'a S, graph: &'a MetadataGraph, layout: &'a TableLayout) -> Self {
        Self {
            store,
            graph,
            layout,
        }
    }

    /// Executes a filtered, sorted and paged record query.
    ///
    /// `samples`: `None` includes every sample, an empty slice none.
    pub fn execute(
        &self,
        query: Option<&Query>,
        sort: &[SortOrder],
        page: PageRequest,
        samples: Option<&[usize]>,
    ) -> ExecutorResult<PagedItems<Record>> {
        let compiled = compile(self.graph, query, sort)?;
        let from = from_clause(self.graph, &compiled.joins);

        let mut total = SqlFragment::raw("SELECT COUNT(*) FROM ");
        total.push_ident(VCF_TABLE);
        let total = self.store.count(&total)?;

        let mut matched = SqlFragment::raw("SELECT COUNT(DISTINCT ");
        matched
            .append(&qualified(VCF_ALIAS, ID))
            .push(")")
            .append(&from)
            .push(" WHERE ")
            .append(&compiled.filter);
        let total_elements = self.store.count(&matched)?;

        // an offset past i64::MAX lies beyond every stored record
        let page_ids = match i64::try_from(page.offset()) {
            Ok(offset) => self.page_ids(&compiled, &from, page.size, offset)?,
            Err(_) => Vec::new(),
        };
        debug!(
            total,
            matched = total_elements,
            page = page.number,
            returned = page_ids.len(),
            "selected record page"
        );

        let items = if page_ids.is_empty() {
            Vec::new()
        } else {
            let rows = self.store.fetch_rows(&self.rows_query(
                &page_ids,
                Some(&compiled.filter),
                samples,
            ))?;
            let mut records: HashMap<i64, Record> = RecordAssembler::new(self.graph)
                .assemble(&rows)?
                .into_iter()
                .map(|r| (r.id, r))
                .collect();
            page_ids
                .iter()
                .filter_map(|id| records.remove(id))
                .collect()
        };

        Ok(PagedItems {
            items,
            total,
            page: Page {
                number: page.number,
                size: page.size,
                total_elements,
            },
        })
    }

    /// Record ids of one page in sort order
    fn page_ids(
        &self,
        compiled: &CompiledQuery,
        from: &SqlFragment,
        size: usize,
        offset: i64,
    ) -> ExecutorResult<Vec<i64>> {
        let mut ids = SqlFragment::raw("SELECT ");
        ids.append(&qualified(VCF_ALIAS, ID))
            .push(" AS ")
            .push_ident(ID)
            .append(from)
            .push(" WHERE ")
            .append(&compiled.filter)
            .push(" GROUP BY ")
            .append(&qualified(VCF_ALIAS, ID))
            .push(" ORDER BY ")
            .append(&compiled.order)
            .push(" LIMIT ")
            .push_param(i64::try_from(size).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_param(offset);
        let ids = self
            .store
            .fetch_rows(&ids)?
            .iter()
            .map(|row| {
                row.get(ID)
                    .and_then(|t| t.as_i64())
                    .ok_or_else(|| StoreError::corrupt(VCF_TABLE, "page row without record id"))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(ids)
    }

    /// Loads one record with all of its samples
    pub fn record_by_id(&self, id: i64) -> ExecutorResult<Option<Record>> {
        let rows = self.store.fetch_rows(&self.rows_query(&[id], None, None))?;
        Ok(RecordAssembler::new(self.graph)
            .assemble(&rows)?
            .into_iter()
            .next())
    }

    /// Every column of the given records, nested tables and samples joined
    fn rows_query(
        &self,
        ids: &[i64],
        filter: Option<&SqlFragment>,
        samples: Option<&[usize]>,
    ) -> SqlFragment {
        let nested = self.layout.nested_fields();
        let include_samples = samples.map_or(true, |s| !s.is_empty());

        let mut columns = vec![aliased(&qualified(VCF_ALIAS, ID), ID)];
        for column in FixedColumn::ALL {
            columns.push(aliased(
                &qualified(VCF_ALIAS, column.column()),
                column.column(),
            ));
        }
        for column in &self.layout.info {
            columns.push(aliased(
                &qualified(INFO_ALIAS, column),
                &format!("{}/{}", INFO_PREFIX, column),
            ));
        }
        for (field, children) in &self.layout.nested {
            let alias = nested_alias(*field);
            let name = &self.graph.field(*field).id;
            columns.push(aliased(
                &qualified(&alias, ID),
                &format!("{}/{}/{}{}", INFO_PREFIX, name, KEY_MARKER, ID),
            ));
            for child in children {
                columns.push(aliased(
                    &qualified(&alias, child),
                    &format!("{}/{}/{}", INFO_PREFIX, name, child),
                ));
            }
        }
        if include_samples {
            columns.push(aliased(
                &qualified(SAMPLE_ALIAS, SAMPLE_INDEX),
                &format!("{}/{}{}", FORMAT_PREFIX, KEY_MARKER, SAMPLE_INDEX),
            ));
            for column in &self.layout.format {
                columns.push(aliased(
                    &qualified(SAMPLE_ALIAS, column),
                    &format!("{}/{}", FORMAT_PREFIX, column),
                ));
            }
        }

        let mut query = SqlFragment::raw("SELECT ");
        query
            .append(&SqlFragment::join(&columns, ", "))
            .append(&from_clause(self.graph, &nested));
        if include_samples {
            query
                .push(" LEFT JOIN ")
                .push_ident(FORMAT_TABLE)
                .push(" AS ")
                .push(SAMPLE_ALIAS)
                .push(" ON ")
                .append(&qualified(SAMPLE_ALIAS, VARIANT_ID))
                .push(" = ")
                .append(&qualified(VCF_ALIAS, ID));
            if let Some(samples) = samples {
                query
                    .push(" AND ")
                    .append(&qualified(SAMPLE_ALIAS, SAMPLE_INDEX))
                    .push(" IN (")
                    .push_params(samples.iter().filter_map(|s| i64::try_from(*s).ok()))
                    .push(")");
            }
        }
        query
            .push(" WHERE ")
            .append(&qualified(VCF_ALIAS, ID))
            .push(" IN (")
            .push_params(ids.iter().copied())
            .push(")");
        if let Some(filter) = filter {
            query.push(" AND ").append(&filter.parenthesized());
        }

        let mut order = vec![qualified(VCF_ALIAS, ID)];
        order.extend(nested.iter().map(|f| qualified(&nested_alias(*f), ID)));
        if include_samples {
            order.push(qualified(SAMPLE_ALIAS, SAMPLE_INDEX));
        }
        query.push(" ORDER BY ").append(&SqlFragment::join(&order, ", "));
        query
    }
}

/// `<expr> AS "<alias>"`
fn aliased(expr: &SqlFragment, alias: &str) -> SqlFragment {
    let mut frag = expr.clone();
    frag.push(" AS ").push_ident(alias);
    frag
}
