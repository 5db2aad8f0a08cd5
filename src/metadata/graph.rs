//! Arena-backed field metadata graph
//!
//! Nodes live in a single vector and refer to each other by `FieldId`.
//! Children are owned by position in their parent's child list; the parent
//! link is a plain index used for navigation only.

use std::collections::HashMap;

use super::categories::Categories;
use super::errors::{MetadataError, MetadataResult};
use super::types::{
    Cardinality, FieldDescriptor, FieldId, FieldMetadata, FieldType, NestedFields, ValueType,
};

/// Separator used when a nested descriptor does not declare one
pub const DEFAULT_SEPARATOR: &str = "|";

/// Immutable metadata graph for one dataset
#[derive(Debug, Clone, Default)]
pub struct MetadataGraph {
    nodes: Vec<FieldMetadata>,
    info: Vec<FieldId>,
    format: Vec<FieldId>,
    /// (field type, parent, name) -> node
    index: HashMap<(FieldType, Option<FieldId>, String), FieldId>,
}

impl MetadataGraph {
    /// Builds the graph from a flat descriptor list.
    ///
    /// Pass 1 creates one node per descriptor. Pass 2 links parents and
    /// collects children in declaration order.
    pub fn build(descriptors: &[FieldDescriptor]) -> MetadataResult<Self> {
        let mut nodes = Vec::with_capacity(descriptors.len());
        let mut by_name: HashMap<(FieldType, Option<&str>, &str), FieldId> = HashMap::new();

        for desc in descriptors {
            let key = (desc.field_type, desc.parent.as_deref(), desc.id.as_str());
            if by_name.contains_key(&key) {
                return Err(MetadataError::duplicate_field(qualified(desc)));
            }
            let id = FieldId(nodes.len());
            nodes.push(create_node(desc)?);
            by_name.insert(key, id);
        }

        let mut graph = MetadataGraph {
            nodes,
            ..Default::default()
        };

        for (i, desc) in descriptors.iter().enumerate() {
            let id = FieldId(i);
            match desc.parent.as_deref() {
                None => {
                    match desc.field_type {
                        FieldType::Info => graph.info.push(id),
                        FieldType::Format => graph.format.push(id),
                    }
                    graph.index.insert((desc.field_type, None, desc.id.clone()), id);
                }
                Some(parent_name) => {
                    let parent = by_name
                        .get(&(desc.field_type, None, parent_name))
                        .copied()
                        .ok_or_else(|| MetadataError::unknown_parent(qualified(desc), parent_name))?;
                    let container = graph.nodes[parent.0]
                        .nested
                        .as_mut()
                        .ok_or_else(|| MetadataError::unknown_parent(qualified(desc), parent_name))?;
                    container.children.push(id);
                    graph.nodes[i].parent = Some(parent);
                    graph
                        .index
                        .insert((desc.field_type, Some(parent), desc.id.clone()), id);
                }
            }
        }

        for (desc, node) in descriptors.iter().zip(&graph.nodes) {
            if node.nested.as_ref().map_or(false, |n| n.children.is_empty()) {
                return Err(MetadataError::missing_children(
                    qualified(desc),
                    "no child fields reference this field",
                ));
            }
        }

        Ok(graph)
    }

    /// Returns the metadata of a node
    pub fn field(&self, id: FieldId) -> &FieldMetadata {
        &self.nodes[id.0]
    }

    /// Looks up a top-level INFO field
    pub fn info(&self, name: &str) -> Option<FieldId> {
        self.index.get(&(FieldType::Info, None, name.to_string())).copied()
    }

    /// Looks up a top-level FORMAT field
    pub fn format(&self, name: &str) -> Option<FieldId> {
        self.index
            .get(&(FieldType::Format, None, name.to_string()))
            .copied()
    }

    /// Looks up a child of a nested field
    pub fn child(&self, parent: FieldId, name: &str) -> Option<FieldId> {
        let field_type = self.field(parent).field_type;
        self.index
            .get(&(field_type, Some(parent), name.to_string()))
            .copied()
    }

    /// Children of a nested field in declaration order; empty for leaves
    pub fn children(&self, id: FieldId) -> &[FieldId] {
        self.field(id)
            .nested
            .as_ref()
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: FieldId) -> Option<FieldId> {
        self.field(id).parent
    }

    /// Top-level INFO fields in declaration order
    pub fn info_fields(&self) -> &[FieldId] {
        &self.info
    }

    /// Top-level FORMAT fields in declaration order
    pub fn format_fields(&self) -> &[FieldId] {
        &self.format
    }

    /// Human-readable path such as `INFO/CSQ/Gene`
    pub fn path(&self, id: FieldId) -> String {
        let field = self.field(id);
        match field.parent {
            Some(parent) => format!("{}/{}", self.path(parent), field.id),
            None => format!("{}/{}", field.field_type, field.id),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn qualified(desc: &FieldDescriptor) -> String {
    match &desc.parent {
        Some(parent) => format!("{}/{}/{}", desc.field_type, parent, desc.id),
        None => format!("{}/{}", desc.field_type, desc.id),
    }
}

fn create_node(desc: &FieldDescriptor) -> MetadataResult<FieldMetadata> {
    let name = qualified(desc);
    let value_type = ValueType::parse(&name, &desc.value_type)?;
    let cardinality = Cardinality::parse(&name, &desc.number_type, desc.number_count)?;

    let categories = match value_type {
        ValueType::Categorical => Some(Categories::from_descriptors(&name, &desc.categories)?),
        _ if !desc.categories.is_empty() => {
            return Err(MetadataError::invalid_categories(
                name,
                format!("categories declared on a {} field", value_type),
            ));
        }
        _ => None,
    };

    let nested = desc.nested.then(|| NestedFields {
        separator: desc
            .separator
            .clone()
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        children: Vec::new(),
    });

    Ok(FieldMetadata {
        id: desc.id.clone(),
        field_type: desc.field_type,
        value_type,
        cardinality,
        categories,
        nested,
        parent: None,
        label: desc.label.clone(),
        description: desc.description.clone(),
        required: desc.required,
    })
}
