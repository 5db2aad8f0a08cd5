//! Report dataset handle
//!
//! Opening is the only fallible setup step: the store is opened and the
//! metadata graph is built before the handle is returned. Derived state
//! (table layout, samples, phenotypes) is initialized once on first use.

use once_cell::sync::OnceCell;
use tracing::info;

use crate::codec::Value;
use crate::config::ReportConfig;
use crate::executor::{
    PageRequest, PagedItems, RecordExecutor, TableLayout, ValueFilter, ValueSorter,
};
use crate::metadata::{MetadataGraph, VcfMetadata};
use crate::model::{Phenotype, Record, Sample};
use crate::store::{MetadataSource, RowSource, SqliteStore};

use super::errors::{ApiError, ApiResult};
use super::request::{ItemsRequest, RecordsRequest};

/// Read-only query handle over one report dataset
pub struct ReportApi<S> {
    store: S,
    config: ReportConfig,
    metadata: OnceCell<VcfMetadata>,
    layout: OnceCell<TableLayout>,
    samples: OnceCell<Vec<Sample>>,
    phenotypes: OnceCell<Vec<Phenotype>>,
}

impl ReportApi<SqliteStore> {
    /// Opens the configured SQLite report database
    pub fn open(config: ReportConfig) -> ApiResult<Self> {
        config.validate()?;
        let store = SqliteStore::open(&config.database_path)?;
        Self::with_store(store, config)
    }
}

impl<S: MetadataSource + RowSource> ReportApi<S> {
    /// Wraps an opened store; fails if its metadata does not form a graph
    pub fn with_store(store: S, config: ReportConfig) -> ApiResult<Self> {
        let api = Self {
            store,
            config,
            metadata: OnceCell::new(),
            layout: OnceCell::new(),
            samples: OnceCell::new(),
            phenotypes: OnceCell::new(),
        };
        let metadata = api.metadata()?;
        info!(
            fields = metadata.graph.len(),
            info = metadata.graph.info_fields().len(),
            format = metadata.graph.format_fields().len(),
            samples = metadata.samples.len(),
            "opened report dataset"
        );
        Ok(api)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn metadata(&self) -> ApiResult<&VcfMetadata> {
        self.metadata.get_or_try_init(|| {
            let descriptors = self.store.field_descriptors()?;
            let graph = MetadataGraph::build(&descriptors)?;
            let lines = self.store.header_lines()?;
            let samples = self
                .samples()?
                .iter()
                .map(|s| s.person.individual_id.clone())
                .collect();
            Ok::<_, ApiError>(VcfMetadata::new(graph, lines, samples))
        })
    }

    fn graph(&self) -> ApiResult<&MetadataGraph> {
        Ok(&self.metadata()?.graph)
    }

    fn layout(&self) -> ApiResult<&TableLayout> {
        let graph = self.graph()?;
        self.layout
            .get_or_try_init(|| Ok::<_, ApiError>(TableLayout::load(&self.store, graph)?))
    }

    fn samples(&self) -> ApiResult<&[Sample]> {
        self.samples
            .get_or_try_init(|| Ok::<_, ApiError>(self.store.samples()?))
            .map(Vec::as_slice)
    }

    fn phenotypes(&self) -> ApiResult<&[Phenotype]> {
        self.phenotypes
            .get_or_try_init(|| Ok::<_, ApiError>(self.store.phenotypes()?))
            .map(Vec::as_slice)
    }

    /// Filtered, sorted and paged records
    pub fn get_records(&self, request: &RecordsRequest) -> ApiResult<PagedItems<Record>> {
        let size = self.config.page_size(request.size)?;
        let executor = RecordExecutor::new(&self.store, self.graph()?, self.layout()?);
        Ok(executor.execute(
            request.query.as_ref(),
            &request.sort,
            PageRequest::new(request.page, size),
            request.sample_ids.as_deref(),
        )?)
    }

    pub fn get_record_by_id(&self, id: i64) -> ApiResult<Record> {
        let executor = RecordExecutor::new(&self.store, self.graph()?, self.layout()?);
        executor
            .record_by_id(id)?
            .ok_or_else(|| ApiError::not_found("record", id))
    }

    pub fn get_samples(&self, request: &ItemsRequest) -> ApiResult<PagedItems<Sample>> {
        self.list(self.samples()?, request, Sample::to_value)
    }

    pub fn get_sample_by_id(&self, id: usize) -> ApiResult<Sample> {
        self.samples()?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("sample", id))
    }

    pub fn get_phenotypes(&self, request: &ItemsRequest) -> ApiResult<PagedItems<Phenotype>> {
        self.list(self.phenotypes()?, request, Phenotype::to_value)
    }

    /// Metadata graph, header lines and sample names
    pub fn get_records_meta(&self) -> ApiResult<&VcfMetadata> {
        self.metadata()
    }

    /// In-memory filter, sort and page over a small collection
    fn list<T: Clone>(
        &self,
        items: &[T],
        request: &ItemsRequest,
        project: impl Fn(&T) -> Value,
    ) -> ApiResult<PagedItems<T>> {
        let size = self.config.page_size(request.size)?;
        let matched = ValueFilter::filter(items.to_vec(), request.query.as_ref(), &project)?;
        let sorted = ValueSorter::sort(matched, &request.sort, &project)?;
        Ok(PagedItems::paginate(
            sorted,
            items.len() as u64,
            PageRequest::new(request.page, size),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldDescriptor;
    use crate::model::{Person, Sex};
    use crate::query::{Operator, Query, SortOrder};
    use crate::selector;
    use crate::store::ReportWriter;
    use serde_json::json;

    fn api() -> ReportApi<SqliteStore> {
        let mut writer =
            ReportWriter::in_memory(&[FieldDescriptor::info("DP", "INTEGER")]).unwrap();
        let sample = |id: usize, name: &str, sex: Sex, proband: bool| Sample {
            id,
            person: Person {
                individual_id: name.to_string(),
                sex,
                ..Default::default()
            },
            proband,
        };
        writer
            .write_samples(&[
                sample(0, "Patient", Sex::Female, true),
                sample(1, "Father", Sex::Male, false),
                sample(2, "Mother", Sex::Female, false),
            ])
            .unwrap();
        let store = SqliteStore::from_connection(writer.finish()).unwrap();
        ReportApi::with_store(store, ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_metadata_lists_samples() {
        let api = api();
        let meta = api.get_records_meta().unwrap();
        assert_eq!(meta.samples, vec!["Patient", "Father", "Mother"]);
        assert!(meta.graph.info("DP").is_some());
    }

    #[test]
    fn test_samples_filter_sort_page() {
        let api = api();
        let request = ItemsRequest {
            query: Some(Query::clause(
                selector!["person", "sex"],
                Operator::Eq,
                json!("FEMALE"),
            )),
            sort: vec![SortOrder::asc(selector!["person", "individualId"])],
            page: 0,
            size: Some(1),
        };
        let page = api.get_samples(&request).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page.total_elements, 2);
        assert_eq!(page.items[0].person.individual_id, "Mother");
    }

    #[test]
    fn test_lookups() {
        let api = api();
        assert_eq!(api.get_sample_by_id(1).unwrap().person.individual_id, "Father");
        assert_eq!(
            api.get_sample_by_id(9).unwrap_err().code(),
            "VCF_LOOKUP_NOT_FOUND"
        );
        assert_eq!(
            api.get_record_by_id(1).unwrap_err().code(),
            "VCF_LOOKUP_NOT_FOUND"
        );
    }

    #[test]
    fn test_page_size_rejected() {
        let api = api();
        let request = ItemsRequest {
            size: Some(0),
            ..Default::default()
        };
        assert_eq!(
            api.get_samples(&request).unwrap_err().code(),
            "VCF_INVALID_REQUEST"
        );
    }
}
