//! Report database builder
//!
//! Lays down the relational schema for a set of field descriptors and
//! fills it with typed records through the value encoder, the exact
//! inverse of what the query layer decodes.

use std::path::Path;

use rusqlite::{params_from_iter, Connection, Transaction};
use tracing::info;

use crate::codec::{encode_value, Value, ValueCodec};
use crate::metadata::{FieldDescriptor, FieldId, MetadataGraph};
use crate::model::{Genotype, Phenotype, Record, Sample};
use crate::query::{quote_ident, FixedColumn, GenotypePart, SqlParam, GENOTYPE_FIELD};

use super::errors::{StoreError, StoreResult};
use super::schema::{
    create_statements, nested_table, FORMAT_TABLE, INFO_TABLE, SAMPLE_INDEX, VARIANT_ID,
    VCF_TABLE,
};

/// Writes a fresh report database
pub struct ReportWriter {
    connection: Connection,
    graph: MetadataGraph,
}

impl ReportWriter {
    /// Creates the database file at `path` with the schema for `descriptors`
    pub fn create(path: impl AsRef<Path>, descriptors: &[FieldDescriptor]) -> StoreResult<Self> {
        Self::new(Connection::open(path)?, descriptors)
    }

    /// Creates an in-memory database
    pub fn in_memory(descriptors: &[FieldDescriptor]) -> StoreResult<Self> {
        Self::new(Connection::open_in_memory()?, descriptors)
    }

    /// Lays down the schema on an empty connection and stores the metadata
    pub fn new(mut connection: Connection, descriptors: &[FieldDescriptor]) -> StoreResult<Self> {
        let graph = MetadataGraph::build(descriptors)?;
        connection.execute_batch(&create_statements(&graph))?;

        let tx = connection.transaction()?;
        {
            let mut field = tx.prepare(
                "INSERT INTO metadata (ord, id, parent, fieldType, nested, separator, numberType, \
                 numberCount, type, label, description, required) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            let mut category = tx.prepare(
                "INSERT INTO categories (fieldType, parent, field, value, label, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (ord, d) in descriptors.iter().enumerate() {
                field.execute(rusqlite::params![
                    ord as i64,
                    d.id,
                    d.parent,
                    d.field_type.as_str(),
                    d.nested,
                    d.separator,
                    d.number_type,
                    d.number_count,
                    d.value_type,
                    d.label,
                    d.description,
                    d.required,
                ])?;
                for entry in &d.categories {
                    category.execute(rusqlite::params![
                        d.field_type.as_str(),
                        d.parent,
                        d.id,
                        entry.key,
                        entry.label,
                        entry.description,
                    ])?;
                }
            }
        }
        tx.commit()?;
        info!(fields = graph.len(), "created report schema");
        Ok(Self { connection, graph })
    }

    pub fn graph(&self) -> &MetadataGraph {
        &self.graph
    }

    /// Stores raw header lines in order
    pub fn write_header(&mut self, lines: &[String]) -> StoreResult<()> {
        let tx = self.connection.transaction()?;
        {
            let mut insert = tx.prepare("INSERT INTO header (line) VALUES (?1)")?;
            for line in lines {
                insert.execute([line])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn write_samples(&mut self, samples: &[Sample]) -> StoreResult<()> {
        let tx = self.connection.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO sample (sampleIndex, familyId, individualId, paternalId, maternalId, \
                 sex, affectedStatus, proband) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for sample in samples {
                let person = &sample.person;
                insert.execute(rusqlite::params![
                    sample.id as i64,
                    person.family_id,
                    person.individual_id,
                    person.paternal_id,
                    person.maternal_id,
                    person.sex.as_str(),
                    person.affected_status.as_str(),
                    sample.proband,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stores one row per phenotypic feature
    pub fn write_phenotypes(&mut self, phenotypes: &[Phenotype]) -> StoreResult<()> {
        let tx = self.connection.transaction()?;
        {
            let mut insert =
                tx.prepare("INSERT INTO phenotype (individualId, hpoId, label) VALUES (?1, ?2, ?3)")?;
            for phenotype in phenotypes {
                for feature in &phenotype.phenotypic_features_list {
                    insert.execute(rusqlite::params![
                        phenotype.subject.id,
                        feature.feature_type.id,
                        feature.feature_type.label,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stores records in order; ids are assigned sequentially and returned
    pub fn write_records(&mut self, records: &[Record]) -> StoreResult<Vec<i64>> {
        let tx = self.connection.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(insert_record(&tx, &self.graph, record)?);
        }
        tx.commit()?;
        info!(records = ids.len(), "wrote records");
        Ok(ids)
    }

    /// Returns the connection for reading
    pub fn finish(self) -> Connection {
        self.connection
    }
}

fn insert_row(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[String],
    params: &[SqlParam],
) -> StoreResult<i64> {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let columns = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns,
        placeholders
    );
    tx.execute(&sql, params_from_iter(params.iter()))?;
    Ok(tx.last_insert_rowid())
}

fn insert_record(tx: &Transaction<'_>, graph: &MetadataGraph, record: &Record) -> StoreResult<i64> {
    let codec = ValueCodec::new(graph);
    let value = record.to_value();

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for column in FixedColumn::ALL {
        let member = value.get(column.key()).unwrap_or(&Value::Null);
        let token = encode_value(column.shape(), member).map_err(|e| e.at(column.column()))?;
        columns.push(column.column().to_string());
        params.push(SqlParam::from(token));
    }
    let variant_id = insert_row(tx, VCF_TABLE, &columns, &params)?;

    let mut columns = vec![VARIANT_ID.to_string()];
    let mut params = vec![SqlParam::Integer(variant_id)];
    for id in graph.info_fields() {
        let field = graph.field(*id);
        let member = record.info.get(&field.id).unwrap_or(&Value::Null);
        if field.is_nested() {
            insert_nested(tx, graph, *id, variant_id, member)?;
            continue;
        }
        columns.push(field.id.clone());
        params.push(SqlParam::from(codec.encode(*id, member)?));
    }
    insert_row(tx, INFO_TABLE, &columns, &params)?;

    for (index, values) in &record.samples {
        let mut columns = vec![VARIANT_ID.to_string(), SAMPLE_INDEX.to_string()];
        let mut params = vec![SqlParam::Integer(variant_id), SqlParam::Integer(*index as i64)];
        for id in graph.format_fields() {
            let field = graph.field(*id);
            let member = values.get(&field.id).unwrap_or(&Value::Null);
            if field.id == GENOTYPE_FIELD {
                let genotype = match member {
                    Value::Null => None,
                    other => Some(Genotype::from_value(other).ok_or_else(|| {
                        StoreError::corrupt(FORMAT_TABLE, format!("invalid genotype {}", other))
                    })?),
                };
                for part in GenotypePart::ALL {
                    let part_value = genotype
                        .as_ref()
                        .map(|gt| gt.to_value())
                        .and_then(|v| v.get(part.key()).cloned())
                        .unwrap_or(Value::Null);
                    columns.push(part.column());
                    params.push(SqlParam::from(encode_value(part.shape(), &part_value)?));
                }
                continue;
            }
            columns.push(field.id.clone());
            params.push(SqlParam::from(codec.encode(*id, member)?));
        }
        insert_row(tx, FORMAT_TABLE, &columns, &params)?;
    }
    Ok(variant_id)
}

/// One row per nested value: an array of objects or a single object
fn insert_nested(
    tx: &Transaction<'_>,
    graph: &MetadataGraph,
    field: FieldId,
    variant_id: i64,
    value: &Value,
) -> StoreResult<()> {
    let table = nested_table(&graph.field(field).id);
    let items: Vec<&Value> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for item in items {
        let mut columns = vec![VARIANT_ID.to_string()];
        let mut params = vec![SqlParam::Integer(variant_id)];
        for child in graph.children(field) {
            let meta = graph.field(*child);
            let member = item.get(&meta.id).unwrap_or(&Value::Null);
            let token = encode_value(meta.shape(), member).map_err(|e| e.at(graph.path(*child)))?;
            columns.push(meta.id.clone());
            params.push(SqlParam::from(token));
        }
        insert_row(tx, &table, &columns, &params)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MetadataSource, RowSource, SqliteStore};
    use crate::query::SqlFragment;
    use std::collections::BTreeMap;

    #[test]
    fn test_round_trip_metadata_and_rows() {
        let descriptors = vec![
            FieldDescriptor::info("DP", "INTEGER"),
            FieldDescriptor::info("CLASS", "CATEGORICAL").with_category(3, "P"),
            FieldDescriptor::format("GT", "STRING"),
        ];
        let mut writer = ReportWriter::in_memory(&descriptors).unwrap();
        let record = Record {
            chrom: "1".to_string(),
            pos: 100,
            ref_allele: "A".to_string(),
            alt: vec![Some("T".to_string())],
            info: BTreeMap::from([("DP".to_string(), Value::Integer(7))]),
            samples: BTreeMap::from([(
                0,
                BTreeMap::from([(
                    "GT".to_string(),
                    Genotype::parse("0/1").unwrap().to_value(),
                )]),
            )]),
            ..Default::default()
        };
        assert_eq!(writer.write_records(&[record]).unwrap(), vec![1]);

        let store = SqliteStore::from_connection(writer.finish()).unwrap();
        assert_eq!(store.field_descriptors().unwrap(), descriptors);

        let rows = store
            .fetch_rows(&SqlFragment::raw(
                "SELECT \"GT_a\", \"GT_p\", \"GT_t\" FROM \"format\"",
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["GT_a"], crate::codec::Token::from("[0,1]"));
        assert_eq!(rows[0]["GT_p"], crate::codec::Token::Integer(0));
        assert_eq!(rows[0]["GT_t"], crate::codec::Token::from("het"));

        let count = store
            .count(&SqlFragment::raw("SELECT COUNT(*) FROM \"vcf\""))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            store.table_columns("info").unwrap(),
            vec!["variantId", "DP", "CLASS"]
        );
    }
}
