//! Relational layout of a report database
//!
//! Tables:
//! - `metadata`, `categories`, `header`: dataset description
//! - `sample`, `phenotype`: pedigree and phenotypes
//! - `vcf`: fixed record columns
//! - `info`: one column per top-level non-nested INFO field
//! - `info_<FIELD>`: one table per nested INFO field, one row per nested value
//! - `format`: one row per (record, sample), genotype split into `GT_a`, `GT_p`, `GT_t`
//!
//! Dynamic columns are declared without a type so stored tokens keep their
//! storage class.

use crate::metadata::MetadataGraph;
use crate::query::{quote_ident, GenotypePart, GENOTYPE_FIELD};

pub const METADATA_TABLE: &str = "metadata";
pub const CATEGORIES_TABLE: &str = "categories";
pub const HEADER_TABLE: &str = "header";
pub const SAMPLE_TABLE: &str = "sample";
pub const PHENOTYPE_TABLE: &str = "phenotype";
pub const VCF_TABLE: &str = "vcf";
pub const INFO_TABLE: &str = "info";
pub const FORMAT_TABLE: &str = "format";

pub const ID: &str = "id";
pub const VARIANT_ID: &str = "variantId";
pub const SAMPLE_INDEX: &str = "sampleIndex";

/// Table holding the rows of a nested INFO field
pub fn nested_table(field: &str) -> String {
    format!("{}_{}", INFO_TABLE, field)
}

const STATIC_DDL: &str = r#"
CREATE TABLE metadata (
    ord INTEGER PRIMARY KEY,
    id TEXT NOT NULL,
    parent TEXT,
    fieldType TEXT NOT NULL,
    nested INTEGER NOT NULL,
    separator TEXT,
    numberType TEXT NOT NULL,
    numberCount INTEGER,
    type TEXT NOT NULL,
    label TEXT,
    description TEXT,
    required INTEGER NOT NULL
);
CREATE TABLE categories (
    fieldType TEXT NOT NULL,
    parent TEXT,
    field TEXT NOT NULL,
    value INTEGER NOT NULL,
    label TEXT NOT NULL,
    description TEXT
);
CREATE TABLE header (line TEXT NOT NULL);
CREATE TABLE sample (
    sampleIndex INTEGER PRIMARY KEY,
    familyId TEXT,
    individualId TEXT NOT NULL,
    paternalId TEXT,
    maternalId TEXT,
    sex TEXT NOT NULL,
    affectedStatus TEXT NOT NULL,
    proband INTEGER NOT NULL
);
CREATE TABLE phenotype (
    id INTEGER PRIMARY KEY,
    individualId TEXT NOT NULL,
    hpoId TEXT NOT NULL,
    label TEXT NOT NULL
);
CREATE TABLE vcf (
    id INTEGER PRIMARY KEY,
    chrom TEXT NOT NULL,
    pos INTEGER NOT NULL,
    idVcf TEXT,
    ref TEXT NOT NULL,
    alt TEXT,
    qual REAL,
    filter TEXT
);
"#;

/// Column names of the `format` table besides its keys
pub fn format_columns(graph: &MetadataGraph) -> Vec<String> {
    let mut columns = Vec::new();
    for id in graph.format_fields() {
        let field = graph.field(*id);
        if field.id == GENOTYPE_FIELD {
            columns.extend(GenotypePart::ALL.iter().map(|p| p.column()));
        } else {
            columns.push(field.id.clone());
        }
    }
    columns
}

/// Full DDL for a dataset described by `graph`
pub fn create_statements(graph: &MetadataGraph) -> String {
    let mut ddl = String::from(STATIC_DDL);

    let mut info_columns = vec![format!(
        "{} INTEGER PRIMARY KEY REFERENCES {}({})",
        VARIANT_ID, VCF_TABLE, ID
    )];
    for id in graph.info_fields() {
        let field = graph.field(*id);
        if !field.is_nested() {
            info_columns.push(quote_ident(&field.id));
        }
    }
    ddl.push_str(&format!(
        "CREATE TABLE {} (\n    {}\n);\n",
        INFO_TABLE,
        info_columns.join(",\n    ")
    ));

    for id in graph.info_fields() {
        let field = graph.field(*id);
        if !field.is_nested() {
            continue;
        }
        let table = nested_table(&field.id);
        let mut columns = vec![
            format!("{} INTEGER PRIMARY KEY", ID),
            format!("{} INTEGER NOT NULL", VARIANT_ID),
        ];
        columns.extend(
            graph
                .children(*id)
                .iter()
                .map(|child| quote_ident(&graph.field(*child).id)),
        );
        ddl.push_str(&format!(
            "CREATE TABLE {} (\n    {}\n);\nCREATE INDEX {} ON {} ({});\n",
            quote_ident(&table),
            columns.join(",\n    "),
            quote_ident(&format!("{}_{}", table, VARIANT_ID)),
            quote_ident(&table),
            VARIANT_ID
        ));
    }

    let mut format_columns_ddl = vec![
        format!("{} INTEGER PRIMARY KEY", ID),
        format!("{} INTEGER NOT NULL", VARIANT_ID),
        format!("{} INTEGER NOT NULL", SAMPLE_INDEX),
    ];
    format_columns_ddl.extend(format_columns(graph).iter().map(|c| quote_ident(c)));
    ddl.push_str(&format!(
        "CREATE TABLE {} (\n    {}\n);\nCREATE INDEX format_variant ON {} ({}, {});\n",
        FORMAT_TABLE,
        format_columns_ddl.join(",\n    "),
        FORMAT_TABLE,
        VARIANT_ID,
        SAMPLE_INDEX
    ));

    ddl
}
