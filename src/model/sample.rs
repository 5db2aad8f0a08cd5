//! Samples and phenotypes

use serde::{Deserialize, Serialize};

use crate::codec::Value;

/// Pedigree sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
    #[default]
    UnknownSex,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
            Sex::UnknownSex => "UNKNOWN_SEX",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "MALE" => Sex::Male,
            "FEMALE" => Sex::Female,
            _ => Sex::UnknownSex,
        }
    }
}

/// Pedigree affected status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffectedStatus {
    Affected,
    Unaffected,
    #[default]
    Missing,
}

impl AffectedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffectedStatus::Affected => "AFFECTED",
            AffectedStatus::Unaffected => "UNAFFECTED",
            AffectedStatus::Missing => "MISSING",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "AFFECTED" => AffectedStatus::Affected,
            "UNAFFECTED" => AffectedStatus::Unaffected,
            _ => AffectedStatus::Missing,
        }
    }
}

/// Pedigree entry of a sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub family_id: Option<String>,
    pub individual_id: String,
    pub paternal_id: Option<String>,
    pub maternal_id: Option<String>,
    pub sex: Sex,
    pub affected_status: AffectedStatus,
}

/// A sample column of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Sample index in FORMAT data
    pub id: usize,
    pub person: Person,
    pub proband: bool,
}

impl Sample {
    /// Value tree addressed by selectors such as `["person", "individualId"]`
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self)
            .map(|json| Value::from_json(&json))
            .unwrap_or(Value::Null)
    }
}

/// Ontology term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyClass {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenotypicFeature {
    #[serde(rename = "type")]
    pub feature_type: OntologyClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
}

/// Phenotypic features observed for one individual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phenotype {
    pub id: usize,
    pub subject: Subject,
    pub phenotypic_features_list: Vec<PhenotypicFeature>,
}

impl Phenotype {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self)
            .map(|json| Value::from_json(&json))
            .unwrap_or(Value::Null)
    }
}
