//! Serializable view of dataset metadata (`getRecordsMeta`)

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::graph::MetadataGraph;
use super::types::FieldId;

/// Metadata of an opened dataset: field graph, raw header lines, sample names
#[derive(Debug, Clone, Default)]
pub struct VcfMetadata {
    pub graph: MetadataGraph,
    pub lines: Vec<String>,
    pub samples: Vec<String>,
}

impl VcfMetadata {
    pub fn new(graph: MetadataGraph, lines: Vec<String>, samples: Vec<String>) -> Self {
        Self {
            graph,
            lines,
            samples,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryView<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct NestedView<'a> {
    separator: &'a str,
    items: Vec<FieldView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldView<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    value_type: &'static str,
    number_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<CategoryMapView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nested: Option<NestedView<'a>>,
    required: bool,
}

/// Dictionary serialized as an object keyed by the stringified key
struct CategoryMapView<'a>(Vec<(i64, CategoryView<'a>)>);

impl Serialize for CategoryMapView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, view) in &self.0 {
            map.serialize_entry(&key.to_string(), view)?;
        }
        map.end()
    }
}

fn field_view(graph: &MetadataGraph, id: FieldId) -> FieldView<'_> {
    let field = graph.field(id);
    FieldView {
        id: &field.id,
        value_type: field.value_type.as_str(),
        number_type: field.cardinality.type_token(),
        number_count: field.cardinality.count(),
        label: field.label.as_deref(),
        description: field.description.as_deref(),
        categories: field.categories.as_ref().map(|cats| {
            CategoryMapView(
                cats.iter()
                    .map(|(key, c)| {
                        (
                            key,
                            CategoryView {
                                label: &c.label,
                                description: c.description.as_deref(),
                            },
                        )
                    })
                    .collect(),
            )
        }),
        nested: field.nested.as_ref().map(|nested| NestedView {
            separator: &nested.separator,
            items: nested
                .children
                .iter()
                .map(|child| field_view(graph, *child))
                .collect(),
        }),
        required: field.required,
    }
}

struct FieldsView<'a> {
    graph: &'a MetadataGraph,
    ids: &'a [FieldId],
}

impl Serialize for FieldsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ids.len()))?;
        for id in self.ids {
            map.serialize_entry(&self.graph.field(*id).id, &field_view(self.graph, *id))?;
        }
        map.end()
    }
}

impl Serialize for VcfMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("lines", &self.lines)?;
        map.serialize_entry("samples", &self.samples)?;
        map.serialize_entry(
            "info",
            &FieldsView {
                graph: &self.graph,
                ids: self.graph.info_fields(),
            },
        )?;
        map.serialize_entry(
            "format",
            &FieldsView {
                graph: &self.graph,
                ids: self.graph.format_fields(),
            },
        )?;
        map.end()
    }
}
