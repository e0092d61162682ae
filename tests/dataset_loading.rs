use collabnet_dash::data::{BreakdownKind, CANONICAL_DATASET};
use collabnet_dash::{Config, DatasetError, Registry};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn canonical_value() -> Value {
    serde_json::from_str(CANONICAL_DATASET).unwrap()
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[test]
fn loads_dataset_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.json");
    write_json(&path, &canonical_value());
    let registry = Registry::from_path(&path).unwrap();
    assert_eq!(registry.organizations(Some(1))[0].name, "FRAUNHOFER GESELLSCHAFT");
}

#[test]
fn config_prefers_dataset_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.json");
    let mut value = canonical_value();
    value["topics"] = json!([{ "name": "Women TechEU", "project_count": 179 }]);
    write_json(&path, &value);
    let cfg = Config {
        dataset_path: Some(path),
        ..Config::default()
    };
    let registry = cfg.load_registry().unwrap();
    assert_eq!(registry.topics(None).len(), 1);
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Registry::from_path(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, DatasetError::Io(_)));
}

#[test]
fn truncated_json_rejected() {
    let text = &CANONICAL_DATASET[..CANONICAL_DATASET.len() / 2];
    assert!(matches!(Registry::from_json(text), Err(DatasetError::Malformed(_))));
}

#[test]
fn bin_gap_rejected() {
    let mut value = canonical_value();
    value["degree_bins"][1]["range_label"] = json!("4-4");
    let err = Registry::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(err, DatasetError::BinGap { expected: 3, found: 4, .. }));
}

#[test]
fn unparseable_bin_rejected() {
    let mut value = canonical_value();
    value["degree_bins"][0]["range_label"] = json!("few");
    assert!(matches!(
        Registry::from_json(&value.to_string()),
        Err(DatasetError::BadBinLabel { .. })
    ));
}

#[test]
fn empty_degree_bins_rejected() {
    let mut value = canonical_value();
    value["degree_bins"] = json!([]);
    assert_eq!(
        Registry::from_json(&value.to_string()).unwrap_err(),
        DatasetError::EmptyTable("degree_bins")
    );
}

#[test]
fn bad_country_code_rejected() {
    let mut value = canonical_value();
    value["countries"][0]["code"] = json!("Germany");
    assert!(matches!(
        Registry::from_json(&value.to_string()),
        Err(DatasetError::BadCountryCode { table: "countries", .. })
    ));
}

#[test]
fn duplicate_country_rejected() {
    let mut value = canonical_value();
    value["countries"][1]["code"] = json!("DE");
    assert_eq!(
        Registry::from_json(&value.to_string()).unwrap_err(),
        DatasetError::DuplicateCountry("DE".into())
    );
}

#[test]
fn project_sizes_are_optional() {
    let mut value = canonical_value();
    value.as_object_mut().unwrap().remove("project_sizes");
    let registry = Registry::from_json(&value.to_string()).unwrap();
    assert!(registry.project_sizes().is_empty());
    assert_eq!(registry.breakdown(BreakdownKind::Duration).len(), 6);
}
