//! Categorical dictionaries
//!
//! A categorical field stores a small integer key per value; the dictionary
//! maps keys to labels and back. Both directions are exact.

use std::collections::{BTreeMap, HashMap};

use super::errors::{MetadataError, MetadataResult};
use super::types::CategoryDescriptor;

/// One dictionary entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub description: Option<String>,
}

/// Key/label dictionary of a categorical field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories {
    by_key: BTreeMap<i64, Category>,
    by_label: HashMap<String, i64>,
}

impl Categories {
    /// Builds a dictionary, rejecting duplicate keys or labels
    pub fn from_descriptors(field: &str, entries: &[CategoryDescriptor]) -> MetadataResult<Self> {
        let mut categories = Categories::default();
        for entry in entries {
            categories.insert(field, entry.key, &entry.label, entry.description.clone())?;
        }
        Ok(categories)
    }

    fn insert(
        &mut self,
        field: &str,
        key: i64,
        label: &str,
        description: Option<String>,
    ) -> MetadataResult<()> {
        if self.by_key.contains_key(&key) {
            return Err(MetadataError::invalid_categories(
                field,
                format!("duplicate category key {}", key),
            ));
        }
        if self.by_label.contains_key(label) {
            return Err(MetadataError::invalid_categories(
                field,
                format!("duplicate category label '{}'", label),
            ));
        }
        self.by_label.insert(label.to_string(), key);
        self.by_key.insert(
            key,
            Category {
                label: label.to_string(),
                description,
            },
        );
        Ok(())
    }

    /// Returns the label for a key
    pub fn label(&self, key: i64) -> Option<&str> {
        self.by_key.get(&key).map(|c| c.label.as_str())
    }

    /// Returns the key for a label
    pub fn key(&self, label: &str) -> Option<i64> {
        self.by_label.get(label).copied()
    }

    /// Returns the full entry for a key
    pub fn get(&self, key: i64) -> Option<&Category> {
        self.by_key.get(&key)
    }

    /// Iterates entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Category)> {
        self.by_key.iter().map(|(k, c)| (*k, c))
    }

    /// Keys whose label starts with `prefix`, compared case-insensitively
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<i64> {
        let prefix = prefix.to_uppercase();
        self.by_key
            .iter()
            .filter(|(_, c)| c.label.to_uppercase().starts_with(&prefix))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: i64, label: &str) -> CategoryDescriptor {
        CategoryDescriptor {
            key,
            label: label.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_lookup_both_directions() {
        let cats =
            Categories::from_descriptors("IMPACT", &[entry(0, "HIGH"), entry(1, "MODERATE")])
                .unwrap();
        assert_eq!(cats.label(1), Some("MODERATE"));
        assert_eq!(cats.key("HIGH"), Some(0));
        assert_eq!(cats.label(7), None);
        assert_eq!(cats.key("LOW"), None);
        assert_eq!(cats.len(), 2);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = Categories::from_descriptors("IMPACT", &[entry(0, "HIGH"), entry(0, "LOW")])
            .unwrap_err();
        assert_eq!(err.code().code(), "VCF_METADATA_INVALID_CATEGORIES");
    }

    #[test]
    fn test_prefix_keys() {
        let cats = Categories::from_descriptors(
            "IMPACT",
            &[entry(0, "HIGH"), entry(1, "MODERATE"), entry(2, "MODIFIER")],
        )
        .unwrap();
        assert_eq!(cats.keys_with_prefix("mod"), vec![1, 2]);
        assert!(cats.keys_with_prefix("x").is_empty());
    }
}
