//! Record assembly from joined rows
//!
//! The rows query yields one flat row per (record, nested row..., sample)
//! combination. Columns carry unique aliases:
//! - fixed columns by name (`id`, `chrom`, `pos`, ...)
//! - `INFO/<field>` for top-level INFO values
//! - `INFO/<field>/@id` and `INFO/<field>/<child>` for nested rows
//! - `FORMAT/@sampleIndex` and `FORMAT/<column>` for per-sample values
//!
//! Rows are grouped by record id in first-seen order. Nested rows and
//! samples are deduplicated by their own keys, since joining several
//! one-to-many tables repeats each of them.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::codec::{decode_value, Token, Value, ValueCodec};
use crate::metadata::{FieldId, MetadataGraph};
use crate::model::{Record, SampleValues};
use crate::query::{FixedColumn, GenotypePart, QueryError, GENOTYPE_FIELD};
use crate::store::schema::{
    nested_table, FORMAT_TABLE, ID, INFO_TABLE, SAMPLE_INDEX, VARIANT_ID, VCF_TABLE,
};
use crate::store::{Row, RowSource, StoreError, StoreResult};

use super::errors::ExecutorResult;

pub const INFO_PREFIX: &str = "INFO";
pub const FORMAT_PREFIX: &str = "FORMAT";
/// Alias suffix of a one-to-many row key
pub const KEY_MARKER: &str = "@";

/// Dynamic columns of the info, nested and format tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableLayout {
    pub info: Vec<String>,
    pub nested: Vec<(FieldId, Vec<String>)>,
    pub format: Vec<String>,
}

impl TableLayout {
    /// Introspects the dataset tables; key columns are left out
    pub fn load<S: RowSource + ?Sized>(source: &S, graph: &MetadataGraph) -> StoreResult<Self> {
        let info = source
            .table_columns(INFO_TABLE)?
            .into_iter()
            .filter(|c| c != VARIANT_ID)
            .collect();
        let mut nested = Vec::new();
        for id in graph.info_fields() {
            let field = graph.field(*id);
            if !field.is_nested() {
                continue;
            }
            let columns = source
                .table_columns(&nested_table(&field.id))?
                .into_iter()
                .filter(|c| c != ID && c != VARIANT_ID)
                .collect();
            nested.push((*id, columns));
        }
        let format = source
            .table_columns(FORMAT_TABLE)?
            .into_iter()
            .filter(|c| c != ID && c != VARIANT_ID && c != SAMPLE_INDEX)
            .collect();
        Ok(Self {
            info,
            nested,
            format,
        })
    }

    pub fn nested_fields(&self) -> Vec<FieldId> {
        self.nested.iter().map(|(id, _)| *id).collect()
    }
}

/// What a result column feeds into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Id,
    Fixed(FixedColumn),
    Info(FieldId),
    NestedKey(FieldId),
    Nested(FieldId, FieldId),
    SampleKey,
    Genotype(GenotypePart),
    Format(FieldId),
}

fn slot(graph: &MetadataGraph, alias: &str) -> ExecutorResult<Slot> {
    let unknown = |reason: &str| QueryError::unknown_field(alias, reason);
    if alias == ID {
        return Ok(Slot::Id);
    }
    if let Some(column) = FixedColumn::ALL.into_iter().find(|c| c.column() == alias) {
        return Ok(Slot::Fixed(column));
    }
    let parts: Vec<&str> = alias.split('/').collect();
    let slot = match parts.as_slice() {
        [INFO_PREFIX, field] => graph
            .info(field)
            .map(Slot::Info)
            .ok_or_else(|| unknown("no INFO field with this id"))?,
        [INFO_PREFIX, parent, child] => {
            let parent = graph
                .info(parent)
                .filter(|p| graph.field(*p).is_nested())
                .ok_or_else(|| unknown("no nested INFO field with this id"))?;
            match child.strip_prefix(KEY_MARKER) {
                Some(ID) => Slot::NestedKey(parent),
                Some(_) => return Err(unknown("unknown nested row key").into()),
                None => graph
                    .child(parent, child)
                    .map(|c| Slot::Nested(parent, c))
                    .ok_or_else(|| unknown("no such nested child"))?,
            }
        }
        [FORMAT_PREFIX, column] => match column.strip_prefix(KEY_MARKER) {
            Some(SAMPLE_INDEX) => Slot::SampleKey,
            Some(_) => return Err(unknown("unknown sample row key").into()),
            None => match GenotypePart::ALL.into_iter().find(|p| p.column() == *column) {
                Some(part) if graph.format(GENOTYPE_FIELD).is_some() => Slot::Genotype(part),
                _ => graph
                    .format(column)
                    .map(Slot::Format)
                    .ok_or_else(|| unknown("no FORMAT field with this id"))?,
            },
        },
        _ => return Err(unknown("result column has no metadata").into()),
    };
    Ok(slot)
}

/// Record being accumulated from its rows
struct Draft {
    record: Record,
    nested: BTreeMap<FieldId, Vec<Value>>,
    seen_nested: HashSet<(FieldId, i64)>,
}

/// Builds typed records from flat joined rows
pub struct RecordAssembler<'g> {
    graph: &'g MetadataGraph,
    codec: ValueCodec<'g>,
}

impl<'g> RecordAssembler<'g> {
    pub fn new(graph: &'g MetadataGraph) -> Self {
        Self {
            graph,
            codec: ValueCodec::new(graph),
        }
    }

    /// Assembles one record per distinct `id`, in first-seen order
    pub fn assemble(&self, rows: &[Row]) -> ExecutorResult<Vec<Record>> {
        let first = match rows.first() {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };
        let mut plan = first
            .keys()
            .map(|alias| Ok((alias.clone(), slot(self.graph, alias)?)))
            .collect::<ExecutorResult<Vec<_>>>()?;
        plan.sort_by(|(a, _), (b, _)| a.cmp(b));

        let nested_fields: Vec<FieldId> = plan
            .iter()
            .filter_map(|(_, s)| match s {
                Slot::NestedKey(field) => Some(*field),
                _ => None,
            })
            .collect();

        let mut drafts: Vec<Draft> = Vec::new();
        let mut by_id: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            let id = row
                .get(ID)
                .and_then(Token::as_i64)
                .ok_or_else(|| StoreError::corrupt(VCF_TABLE, "result row without record id"))?;
            let index = match by_id.get(&id) {
                Some(index) => *index,
                None => {
                    let record = self.fixed_and_info(id, row, &plan)?;
                    drafts.push(Draft {
                        record,
                        nested: BTreeMap::new(),
                        seen_nested: HashSet::new(),
                    });
                    by_id.insert(id, drafts.len() - 1);
                    drafts.len() - 1
                }
            };
            let draft = &mut drafts[index];
            for field in &nested_fields {
                self.nested_row(draft, *field, row, &plan)?;
            }
            self.sample_row(&mut draft.record, row, &plan)?;
        }

        Ok(drafts
            .into_iter()
            .map(|mut draft| {
                for field in &nested_fields {
                    let meta = self.graph.field(*field);
                    let mut items = draft.nested.remove(field).unwrap_or_default();
                    let value = if meta.cardinality.is_multi() {
                        Value::Array(items)
                    } else if items.is_empty() {
                        Value::Null
                    } else {
                        items.swap_remove(0)
                    };
                    draft.record.info.insert(meta.id.clone(), value);
                }
                draft.record
            })
            .collect())
    }

    fn fixed_and_info(&self, id: i64, row: &Row, plan: &[(String, Slot)]) -> ExecutorResult<Record> {
        let mut record = Record {
            id,
            ..Default::default()
        };
        for (alias, slot) in plan {
            let token = row.get(alias).unwrap_or(&Token::Null);
            match slot {
                Slot::Fixed(column) => {
                    let value = decode_value(column.shape(), token)
                        .map_err(|e| e.at(column.column()))?;
                    set_fixed(&mut record, *column, value)?;
                }
                Slot::Info(field) => {
                    let value = self.codec.decode(*field, token)?;
                    record.info.insert(self.graph.field(*field).id.clone(), value);
                }
                _ => {}
            }
        }
        Ok(record)
    }

    fn nested_row(
        &self,
        draft: &mut Draft,
        field: FieldId,
        row: &Row,
        plan: &[(String, Slot)],
    ) -> ExecutorResult<()> {
        let key = plan
            .iter()
            .find(|(_, s)| *s == Slot::NestedKey(field))
            .and_then(|(alias, _)| row.get(alias))
            .and_then(Token::as_i64);
        let key = match key {
            Some(key) => key,
            None => return Ok(()),
        };
        if !draft.seen_nested.insert((field, key)) {
            return Ok(());
        }
        let mut values: HashMap<FieldId, Value> = HashMap::new();
        for (alias, slot) in plan {
            if let Slot::Nested(parent, child) = slot {
                if *parent == field {
                    let token = row.get(alias).unwrap_or(&Token::Null);
                    let value = decode_value(self.graph.field(*child).shape(), token)
                        .map_err(|e| e.at(self.graph.path(*child)))?;
                    values.insert(*child, value);
                }
            }
        }
        let members = self
            .graph
            .children(field)
            .iter()
            .filter_map(|child| {
                values
                    .remove(child)
                    .map(|v| (self.graph.field(*child).id.clone(), v))
            })
            .collect();
        draft
            .nested
            .entry(field)
            .or_default()
            .push(Value::Object(members));
        Ok(())
    }

    fn sample_row(&self, record: &mut Record, row: &Row, plan: &[(String, Slot)]) -> ExecutorResult<()> {
        let index = plan
            .iter()
            .find(|(_, s)| *s == Slot::SampleKey)
            .and_then(|(alias, _)| row.get(alias))
            .and_then(Token::as_i64);
        let index = match index {
            Some(index) if index >= 0 => index as usize,
            _ => return Ok(()),
        };
        if record.samples.contains_key(&index) {
            return Ok(());
        }
        let mut values = SampleValues::new();
        let mut genotype: Vec<(&'static str, Value)> = Vec::new();
        for (alias, slot) in plan {
            let token = row.get(alias).unwrap_or(&Token::Null);
            match slot {
                Slot::Genotype(part) => {
                    let value = decode_value(part.shape(), token)
                        .map_err(|e| e.at(part.column()))?;
                    genotype.push((part.key(), value));
                }
                Slot::Format(field) => {
                    let value = self.codec.decode(*field, token)?;
                    values.insert(self.graph.field(*field).id.clone(), value);
                }
                _ => {}
            }
        }
        if !genotype.is_empty() {
            values.insert(GENOTYPE_FIELD.to_string(), genotype_value(genotype));
        }
        record.samples.insert(index, values);
        Ok(())
    }
}

/// Rebuilds `{a, p, t}`; a call without a classification is null
fn genotype_value(mut parts: Vec<(&'static str, Value)>) -> Value {
    let classified = parts
        .iter()
        .any(|(key, value)| *key == GenotypePart::Type.key() && !value.is_null());
    if !classified {
        return Value::Null;
    }
    parts.sort_by_key(|(key, _)| {
        GenotypePart::ALL
            .iter()
            .position(|p| p.key() == *key)
            .unwrap_or(usize::MAX)
    });
    Value::object(parts)
}

fn required_text(id: i64, column: FixedColumn, value: &Value) -> ExecutorResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(StoreError::corrupt(
            VCF_TABLE,
            format!("record {} has {} {}", id, column.column(), other),
        )
        .into()),
    }
}

fn set_fixed(record: &mut Record, column: FixedColumn, value: Value) -> ExecutorResult<()> {
    let strings = |value: &Value| -> Vec<String> {
        value
            .as_array()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_text)
            .collect()
    };
    match column {
        FixedColumn::Chrom => record.chrom = required_text(record.id, column, &value)?,
        FixedColumn::Ref => record.ref_allele = required_text(record.id, column, &value)?,
        FixedColumn::Pos => {
            record.pos = match value {
                Value::Integer(n) => n,
                other => {
                    return Err(StoreError::corrupt(
                        VCF_TABLE,
                        format!("record {} has position {}", record.id, other),
                    )
                    .into())
                }
            }
        }
        FixedColumn::Qual => record.qual = value.as_f64(),
        FixedColumn::Ids => record.ids = strings(&value),
        FixedColumn::Filter => record.filter = strings(&value),
        FixedColumn::Alt => {
            record.alt = value
                .as_array()
                .unwrap_or_default()
                .iter()
                .map(Value::as_text)
                .collect()
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorError;
    use crate::metadata::FieldDescriptor;
    use crate::query::QueryErrorCode;

    fn graph() -> MetadataGraph {
        MetadataGraph::build(&[
            FieldDescriptor::info("DP", "INTEGER"),
            FieldDescriptor::info("CSQ", "STRING")
                .with_number("OTHER", None)
                .with_nested("|"),
            FieldDescriptor::info("Gene", "STRING").with_parent("CSQ"),
            FieldDescriptor::info("Consequence", "STRING").with_parent("CSQ"),
            FieldDescriptor::format("GT", "STRING"),
            FieldDescriptor::format("DP", "INTEGER"),
        ])
        .unwrap()
    }

    fn row(pairs: &[(&str, Token)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn joined(id: i64, csq: Option<(i64, &str)>, sample: Option<(i64, &str)>) -> Row {
        let csq_id = csq.map(|(k, _)| Token::Integer(k)).unwrap_or(Token::Null);
        let gene = csq.map(|(_, g)| Token::from(g)).unwrap_or(Token::Null);
        let index = sample.map(|(k, _)| Token::Integer(k)).unwrap_or(Token::Null);
        let kind = sample.map(|(_, t)| Token::from(t)).unwrap_or(Token::Null);
        row(&[
            ("id", Token::Integer(id)),
            ("chrom", Token::from("1")),
            ("pos", Token::Integer(100 + id)),
            ("idVcf", Token::from("[\"rs1\"]")),
            ("ref", Token::from("A")),
            ("alt", Token::from("[\"T\"]")),
            ("qual", Token::Null),
            ("filter", Token::from("[\"PASS\"]")),
            ("INFO/DP", Token::Integer(30)),
            ("INFO/CSQ/@id", csq_id),
            ("INFO/CSQ/Gene", gene),
            ("INFO/CSQ/Consequence", Token::Null),
            ("FORMAT/@sampleIndex", index),
            ("FORMAT/GT_a", Token::from("[0,1]")),
            ("FORMAT/GT_p", Token::Integer(0)),
            ("FORMAT/GT_t", kind),
            ("FORMAT/DP", Token::Integer(12)),
        ])
    }

    #[test]
    fn test_groups_and_deduplicates() {
        let graph = graph();
        let rows = vec![
            joined(2, Some((7, "BRCA1")), Some((0, "het"))),
            joined(2, Some((7, "BRCA1")), Some((1, "het"))),
            joined(2, Some((8, "TP53")), Some((0, "het"))),
            joined(2, Some((8, "TP53")), Some((1, "het"))),
            joined(1, None, None),
        ];
        let records = RecordAssembler::new(&graph).assemble(&rows).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[1].id, 1);

        let first = &records[0];
        assert_eq!(first.pos, 102);
        assert_eq!(first.ids, vec!["rs1".to_string()]);
        assert_eq!(first.alt, vec![Some("T".to_string())]);
        assert_eq!(first.qual, None);
        assert_eq!(first.info["DP"], Value::Integer(30));
        let csq = first.info["CSQ"].as_array().unwrap();
        assert_eq!(csq.len(), 2);
        assert_eq!(csq[0].get("Gene"), Some(&Value::from("BRCA1")));
        assert_eq!(csq[1].get("Gene"), Some(&Value::from("TP53")));
        assert_eq!(first.samples.len(), 2);
        let gt = &first.samples[&0]["GT"];
        assert_eq!(gt.get("t"), Some(&Value::from("het")));
        assert_eq!(first.samples[&1]["DP"], Value::Integer(12));

        let second = &records[1];
        assert_eq!(second.info["CSQ"], Value::Array(vec![]));
        assert!(second.samples.is_empty());
    }

    #[test]
    fn test_unknown_column_fails() {
        let graph = graph();
        let mut bad = joined(1, None, None);
        bad.insert("INFO/XX".to_string(), Token::Integer(1));
        let err = RecordAssembler::new(&graph).assemble(&[bad]).unwrap_err();
        match err {
            ExecutorError::Query(err) => assert_eq!(err.code(), QueryErrorCode::UnknownField),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_fixed_text_is_corrupt() {
        let graph = graph();
        for column in ["chrom", "ref"] {
            let mut bad = joined(1, None, None);
            bad.insert(column.to_string(), Token::Null);
            let err = RecordAssembler::new(&graph).assemble(&[bad]).unwrap_err();
            assert!(matches!(err, ExecutorError::Store(_)), "unexpected {:?}", err);
            assert_eq!(err.code(), "VCF_STORE_FAILED");
        }
    }
}
