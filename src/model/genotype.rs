//! Derived genotype structure

use std::fmt;

use crate::codec::Value;

/// Member keys of the genotype object
pub const ALLELES: &str = "a";
pub const PHASED: &str = "p";
pub const TYPE: &str = "t";

/// Genotype classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenotypeType {
    Het,
    HomAlt,
    HomRef,
    Missing,
    Partial,
}

impl GenotypeType {
    /// Classifies a call from its allele indices (`None` = missing allele)
    pub fn classify(alleles: &[Option<i64>]) -> Self {
        let called: Vec<i64> = alleles.iter().flatten().copied().collect();
        if called.is_empty() {
            GenotypeType::Missing
        } else if called.len() < alleles.len() {
            GenotypeType::Partial
        } else if called.iter().all(|a| *a == 0) {
            GenotypeType::HomRef
        } else if called.iter().all(|a| *a == called[0]) {
            GenotypeType::HomAlt
        } else {
            GenotypeType::Het
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenotypeType::Het => "het",
            GenotypeType::HomAlt => "hom_a",
            GenotypeType::HomRef => "hom_r",
            GenotypeType::Missing => "miss",
            GenotypeType::Partial => "part",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "het" => Some(GenotypeType::Het),
            "hom_a" => Some(GenotypeType::HomAlt),
            "hom_r" => Some(GenotypeType::HomRef),
            "miss" => Some(GenotypeType::Missing),
            "part" => Some(GenotypeType::Partial),
            _ => None,
        }
    }
}

impl fmt::Display for GenotypeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample's call at one record
#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    pub alleles: Vec<Option<i64>>,
    pub phased: bool,
    pub kind: GenotypeType,
}

impl Genotype {
    pub fn new(alleles: Vec<Option<i64>>, phased: bool) -> Self {
        let kind = GenotypeType::classify(&alleles);
        Self {
            alleles,
            phased,
            kind,
        }
    }

    /// Parses VCF call notation such as `0/1`, `1|1` or `./.`
    pub fn parse(call: &str) -> Option<Self> {
        let phased = call.contains('|');
        let alleles = call
            .split(['/', '|'])
            .map(|a| match a {
                "." => Some(None),
                n => n.parse::<i64>().ok().map(Some),
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(alleles, phased))
    }

    /// Value-tree form `{a: [...], p: bool, t: "het"}`
    pub fn to_value(&self) -> Value {
        Value::object([
            (
                ALLELES,
                Value::Array(
                    self.alleles
                        .iter()
                        .map(|a| a.map(Value::Integer).unwrap_or(Value::Null))
                        .collect(),
                ),
            ),
            (PHASED, Value::Bool(self.phased)),
            (TYPE, Value::from(self.kind.as_str())),
        ])
    }

    /// Reads the value-tree form back
    pub fn from_value(value: &Value) -> Option<Self> {
        let alleles = value
            .get(ALLELES)?
            .as_array()?
            .iter()
            .map(|a| match a {
                Value::Integer(n) => Some(Some(*n)),
                Value::Null => Some(None),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        let phased = matches!(value.get(PHASED), Some(Value::Bool(true)));
        Some(Self::new(alleles, phased))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(GenotypeType::classify(&[Some(0), Some(1)]), GenotypeType::Het);
        assert_eq!(GenotypeType::classify(&[Some(1), Some(2)]), GenotypeType::Het);
        assert_eq!(GenotypeType::classify(&[Some(0), Some(0)]), GenotypeType::HomRef);
        assert_eq!(GenotypeType::classify(&[Some(1), Some(1)]), GenotypeType::HomAlt);
        assert_eq!(GenotypeType::classify(&[Some(1)]), GenotypeType::HomAlt);
        assert_eq!(GenotypeType::classify(&[None, Some(1)]), GenotypeType::Partial);
        assert_eq!(GenotypeType::classify(&[None, None]), GenotypeType::Missing);
        assert_eq!(GenotypeType::classify(&[]), GenotypeType::Missing);
    }

    #[test]
    fn test_parse_call() {
        let gt = Genotype::parse("0|1").unwrap();
        assert!(gt.phased);
        assert_eq!(gt.kind, GenotypeType::Het);

        let gt = Genotype::parse("./.").unwrap();
        assert_eq!(gt.kind, GenotypeType::Missing);
        assert!(!gt.phased);

        assert!(Genotype::parse("0/x").is_none());
    }

    #[test]
    fn test_value_form() {
        let gt = Genotype::parse("./1").unwrap();
        let value = gt.to_value();
        assert_eq!(value.get(TYPE), Some(&Value::from("part")));
        assert_eq!(
            value.get(ALLELES),
            Some(&Value::Array(vec![Value::Null, Value::Integer(1)]))
        );
        assert_eq!(Genotype::from_value(&value), Some(gt));
    }

    #[test]
    fn test_type_strings() {
        for t in [
            GenotypeType::Het,
            GenotypeType::HomAlt,
            GenotypeType::HomRef,
            GenotypeType::Missing,
            GenotypeType::Partial,
        ] {
            assert_eq!(GenotypeType::parse(t.as_str()), Some(t));
        }
    }
}
