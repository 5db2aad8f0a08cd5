//! Variant record

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::codec::Value;

/// Selector keys of the fixed record columns
pub const CHROM: &str = "c";
pub const POS: &str = "p";
pub const IDS: &str = "i";
pub const REF: &str = "r";
pub const ALT: &str = "a";
pub const QUAL: &str = "q";
pub const FILTER: &str = "f";
pub const INFO: &str = "n";
pub const SAMPLES: &str = "s";

/// Per-sample FORMAT values keyed by field id
pub type SampleValues = BTreeMap<String, Value>;

/// One genomic variant with its decoded INFO and FORMAT values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: i64,
    pub chrom: String,
    pub pos: i64,
    pub ids: Vec<String>,
    pub ref_allele: String,
    pub alt: Vec<Option<String>>,
    pub qual: Option<f64>,
    pub filter: Vec<String>,
    pub info: BTreeMap<String, Value>,
    /// Sample index -> FORMAT values
    pub samples: BTreeMap<usize, SampleValues>,
}

impl Record {
    /// Value tree addressed by selectors (`c p i r a q f n s`)
    pub fn to_value(&self) -> Value {
        Value::Object(self.members())
    }

    fn members(&self) -> Vec<(String, Value)> {
        let strings = |items: &[String]| {
            Value::Array(items.iter().map(|s| Value::from(s.as_str())).collect())
        };
        vec![
            (CHROM.to_string(), Value::from(self.chrom.as_str())),
            (POS.to_string(), Value::Integer(self.pos)),
            (IDS.to_string(), strings(&self.ids)),
            (REF.to_string(), Value::from(self.ref_allele.as_str())),
            (
                ALT.to_string(),
                Value::Array(
                    self.alt
                        .iter()
                        .map(|a| a.as_deref().map(Value::from).unwrap_or(Value::Null))
                        .collect(),
                ),
            ),
            (
                QUAL.to_string(),
                self.qual.map(Value::Float).unwrap_or(Value::Null),
            ),
            (FILTER.to_string(), strings(&self.filter)),
            (
                INFO.to_string(),
                Value::Object(
                    self.info
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
            ),
            (
                SAMPLES.to_string(),
                Value::Object(
                    self.samples
                        .iter()
                        .map(|(index, values)| {
                            (
                                index.to_string(),
                                Value::Object(
                                    values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                                ),
                            )
                        })
                        .collect(),
                ),
            ),
        ]
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let members = self.members();
        let mut map = serializer.serialize_map(Some(members.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (k, v) in &members {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        let mut samples = BTreeMap::new();
        samples.insert(
            0,
            SampleValues::from([("DP".to_string(), Value::Integer(12))]),
        );
        Record {
            id: 4,
            chrom: "1".to_string(),
            pos: 10042538,
            ids: vec!["rs1".to_string()],
            ref_allele: "C".to_string(),
            alt: vec![Some("T".to_string()), None],
            qual: None,
            filter: vec!["PASS".to_string()],
            info: BTreeMap::from([("DP".to_string(), Value::Integer(30))]),
            samples,
        }
    }

    #[test]
    fn test_value_tree_keys() {
        let value = record().to_value();
        assert_eq!(value.get(POS), Some(&Value::Integer(10042538)));
        assert_eq!(value.get(QUAL), Some(&Value::Null));
        assert_eq!(
            value.get(SAMPLES).and_then(|s| s.get("0")).and_then(|s| s.get("DP")),
            Some(&Value::Integer(12))
        );
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["a"], json!(["T", null]));
        assert_eq!(json["n"]["DP"], 30);
        assert_eq!(json["s"]["0"]["DP"], 12);
    }
}
