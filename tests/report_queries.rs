//! End-to-end queries over a two-record report database
//!
//! Record A: pos 10042538, n_number2 = 1, genotypes [het, hom_r, hom_r]
//! Record B: pos 16376412, n_number2 = 0, genotypes [het, het, het]

use std::collections::BTreeMap;

use serde_json::{json, Value as Json};
use tempfile::TempDir;

use vcfquery::api::{ApiHandler, RecordsRequest, ReportApi};
use vcfquery::codec::Value;
use vcfquery::metadata::FieldDescriptor;
use vcfquery::model::{Genotype, Person, Record, Sample, Sex};
use vcfquery::query::{Operator, Query, Selector, SortOrder};
use vcfquery::store::{ReportWriter, SqliteStore};
use vcfquery::{selector, ReportConfig};

const POS_A: i64 = 10042538;
const POS_B: i64 = 16376412;

struct Fixture {
    _dir: TempDir,
    api: ReportApi<SqliteStore>,
}

fn descriptors() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::info("n_number2", "INTEGER"),
        FieldDescriptor::info("CLASS", "CATEGORICAL")
            .with_category(0, "LP")
            .with_category(1, "P"),
        FieldDescriptor::info("CSQ", "STRING")
            .with_number("OTHER", None)
            .with_nested("|"),
        FieldDescriptor::info("Gene", "STRING").with_parent("CSQ"),
        FieldDescriptor::format("GT", "STRING"),
        FieldDescriptor::format("DP", "INTEGER"),
    ]
}

fn record(pos: i64, reference: &str, number: i64, class: &str, calls: [&str; 3]) -> Record {
    let samples = calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let values = BTreeMap::from([
                ("GT".to_string(), Genotype::parse(call).unwrap().to_value()),
                ("DP".to_string(), Value::Integer(20 + index as i64)),
            ]);
            (index, values)
        })
        .collect();
    Record {
        chrom: "1".to_string(),
        pos,
        ids: vec![format!("rs{}", pos)],
        ref_allele: reference.to_string(),
        alt: vec![Some("T".to_string())],
        qual: Some(50.0),
        filter: vec!["PASS".to_string()],
        info: BTreeMap::from([
            ("n_number2".to_string(), Value::Integer(number)),
            ("CLASS".to_string(), Value::from(class)),
            (
                "CSQ".to_string(),
                Value::Array(vec![Value::object([("Gene", Value::from("BRCA2"))])]),
            ),
        ]),
        samples,
        ..Default::default()
    }
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.db");
    let mut writer = ReportWriter::create(&path, &descriptors()).unwrap();
    writer
        .write_header(&["##fileformat=VCFv4.2".to_string()])
        .unwrap();
    let samples: Vec<Sample> = ["Patient", "Father", "Mother"]
        .iter()
        .enumerate()
        .map(|(id, name)| Sample {
            id,
            person: Person {
                family_id: Some("FAM01".to_string()),
                individual_id: name.to_string(),
                sex: if *name == "Father" { Sex::Male } else { Sex::Female },
                ..Default::default()
            },
            proband: id == 0,
        })
        .collect();
    writer.write_samples(&samples).unwrap();
    writer
        .write_records(&[
            record(POS_A, "A", 1, "P", ["0/1", "0/0", "0/0"]),
            record(POS_B, "G", 0, "LP", ["0/1", "0/1", "1/0"]),
        ])
        .unwrap();
    drop(writer.finish());

    let api = ReportApi::open(ReportConfig::with_database(&path)).unwrap();
    Fixture { _dir: dir, api }
}

fn positions(api: &ReportApi<SqliteStore>, query: Query) -> Vec<i64> {
    let request = RecordsRequest {
        query: Some(query),
        ..Default::default()
    };
    api.get_records(&request)
        .unwrap()
        .items
        .iter()
        .map(|r| r.pos)
        .collect()
}

fn clause(selector: Selector, operator: Operator, args: Json) -> Query {
    Query::clause(selector, operator, args)
}

#[test]
fn test_position_equality() {
    let f = fixture();
    assert_eq!(
        positions(&f.api, clause(selector!["p"], Operator::Eq, json!(POS_A))),
        vec![POS_A]
    );
}

#[test]
fn test_numeric_info_comparisons() {
    let f = fixture();
    let field = || selector!["n", "n_number2"];
    assert_eq!(
        positions(&f.api, clause(field(), Operator::Gt, json!(0))),
        vec![POS_A]
    );
    assert_eq!(
        positions(&f.api, clause(field(), Operator::Lte, json!(1))),
        vec![POS_A, POS_B]
    );
}

#[test]
fn test_genotype_wildcard_has_any() {
    let f = fixture();
    let calls = || selector!["s", "*", "GT", "t"];
    assert_eq!(
        positions(&f.api, clause(calls(), Operator::HasAny, json!(["hom_a", "hom_r"]))),
        vec![POS_A]
    );
    assert_eq!(
        positions(&f.api, clause(calls(), Operator::NotHasAny, json!(["hom_a", "hom_r"]))),
        vec![POS_B]
    );
}

#[test]
fn test_composed_queries() {
    let f = fixture();
    let and = Query::and(vec![
        clause(selector!["p"], Operator::Eq, json!(POS_A)),
        clause(selector!["c"], Operator::Eq, json!("1")),
    ]);
    assert_eq!(positions(&f.api, and), vec![POS_A]);

    let or = Query::or(vec![
        clause(selector!["p"], Operator::Eq, json!(POS_A)),
        clause(selector!["r"], Operator::Eq, json!("G")),
    ]);
    assert_eq!(positions(&f.api, or), vec![POS_A, POS_B]);
}

#[test]
fn test_second_page() {
    let f = fixture();
    let request = RecordsRequest {
        page: 1,
        size: Some(1),
        ..Default::default()
    };
    let result = f.api.get_records(&request).unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].pos, POS_B);
    assert_eq!(result.page.total_elements, 2);
    assert_eq!(result.total, 2);
}

#[test]
fn test_huge_page_number_returns_nothing() {
    let f = fixture();
    let request = RecordsRequest {
        page: usize::MAX / 4,
        size: Some(10),
        ..Default::default()
    };
    let result = f.api.get_records(&request).unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.page.total_elements, 2);
}

#[test]
fn test_out_of_range_nested_index_matches_nothing() {
    let f = fixture();
    let gene = |k: usize| selector!["n", "CSQ", k, "Gene"];
    assert_eq!(
        positions(&f.api, clause(gene(0), Operator::Eq, json!("BRCA2"))),
        vec![POS_A, POS_B]
    );
    assert!(positions(&f.api, clause(gene(1), Operator::Eq, json!("BRCA2"))).is_empty());
    assert!(positions(&f.api, clause(gene(usize::MAX), Operator::Eq, json!("BRCA2"))).is_empty());
    assert!(positions(&f.api, clause(selector!["s", usize::MAX, "DP"], Operator::Eq, json!(20))).is_empty());
}

#[test]
fn test_categorical_labels() {
    let f = fixture();
    let class = || selector!["n", "CLASS"];
    assert_eq!(
        positions(&f.api, clause(class(), Operator::Eq, json!("LP"))),
        vec![POS_B]
    );
    assert!(positions(&f.api, clause(class(), Operator::Eq, json!("VUS"))).is_empty());
    assert_eq!(
        positions(&f.api, clause(class(), Operator::In, json!(["P", "VUS"]))),
        vec![POS_A]
    );
}

#[test]
fn test_invalid_selector_depth_fails() {
    let f = fixture();
    let request = RecordsRequest {
        query: Some(clause(
            selector!["n", "n_number2", "x"],
            Operator::Eq,
            json!(1),
        )),
        ..Default::default()
    };
    let err = f.api.get_records(&request).unwrap_err();
    assert!(
        ["VCF_QUERY_UNKNOWN_FIELD", "VCF_QUERY_TYPE_MISMATCH"].contains(&err.code()),
        "unexpected {}",
        err
    );
}

#[test]
fn test_ordering_requires_numeric_argument() {
    let f = fixture();
    let request = RecordsRequest {
        query: Some(clause(selector!["n", "n_number2"], Operator::Gt, json!("1"))),
        ..Default::default()
    };
    assert_eq!(
        f.api.get_records(&request).unwrap_err().code(),
        "VCF_QUERY_TYPE_MISMATCH"
    );
}

#[test]
fn test_sorting() {
    let f = fixture();
    let sorted = |sort: Vec<SortOrder>| -> Vec<i64> {
        let request = RecordsRequest {
            sort,
            ..Default::default()
        };
        f.api
            .get_records(&request)
            .unwrap()
            .items
            .iter()
            .map(|r| r.pos)
            .collect()
    };
    assert_eq!(sorted(vec![SortOrder::asc(selector!["n", "n_number2"])]), vec![POS_B, POS_A]);
    assert_eq!(sorted(vec![SortOrder::desc(selector!["p"])]), vec![POS_B, POS_A]);
    // categorical keys sort by label: "LP" < "P"
    assert_eq!(sorted(vec![SortOrder::asc(selector!["n", "CLASS"])]), vec![POS_B, POS_A]);
}

#[test]
fn test_decoded_record() {
    let f = fixture();
    let record = f.api.get_record_by_id(1).unwrap();
    assert_eq!(record.pos, POS_A);
    assert_eq!(record.ids, vec![format!("rs{}", POS_A)]);
    assert_eq!(record.qual, Some(50.0));
    assert_eq!(record.info["CLASS"], Value::from("P"));
    assert_eq!(
        record.info["CSQ"],
        Value::Array(vec![Value::object([("Gene", Value::from("BRCA2"))])])
    );
    assert_eq!(record.samples.len(), 3);
    assert_eq!(
        record.samples[&1]["GT"].get("t"),
        Some(&Value::from("hom_r"))
    );
    assert_eq!(record.samples[&2]["DP"], Value::Integer(22));
}

#[test]
fn test_sample_projection() {
    let f = fixture();
    let none = RecordsRequest {
        sample_ids: Some(vec![]),
        ..Default::default()
    };
    let result = f.api.get_records(&none).unwrap();
    assert!(result.items.iter().all(|r| r.samples.is_empty()));

    let proband = RecordsRequest {
        sample_ids: Some(vec![0]),
        ..Default::default()
    };
    let result = f.api.get_records(&proband).unwrap();
    for record in &result.items {
        assert_eq!(record.samples.keys().copied().collect::<Vec<_>>(), vec![0]);
    }
}

#[test]
fn test_handler_round_trip() {
    let f = fixture();
    let handler = ApiHandler::new(f.api);
    let response = handler
        .handle(
            r#"{"op": "getRecords",
                "query": {"selector": ["s", "*", "GT", "t"], "operator": "has_any", "args": ["hom_r"]},
                "sampleIds": [1]}"#,
        )
        .to_value();
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["page"]["totalElements"], 1);
    let item = &response["data"]["items"][0];
    assert_eq!(item["p"], POS_A);
    assert_eq!(item["s"]["1"]["GT"]["a"], json!([0, 0]));

    let samples = handler
        .handle(r#"{"op": "getSamples", "query": {"selector": "proband", "operator": "==", "args": true}}"#)
        .to_value();
    assert_eq!(samples["data"]["items"][0]["person"]["individualId"], "Patient");
    assert_eq!(samples["data"]["total"], 3);
}
