//! Integration tests for catalog loading, search and the file-backed provider

use std::fs;
use tempfile::TempDir;

use module_composer::logic::check;
use module_composer::{
    AppConfig, CatalogProvider, CatalogTree, ComposerError, FileCatalogStore, ModuleClassifier,
    SystemEntry,
};

const CATALOG: &str = r#"{
    "2023b": {
        "GCC/12": [
            {"name": "Python/3.10.8", "release": "2023b", "compiler": "GCC/12",
             "description": "The Python programming language"}
        ]
    },
    "2024a": {
        "None": [
            {"name": "zlib/1.3.1", "release": "2024a", "compiler": "none",
             "description": "Compression library"}
        ],
        "GCC/13": [
            {"name": "Python/3.11.5", "release": "2024a", "compiler": "GCC/13",
             "description": "The Python programming language"},
            {"name": "Boost/1.83.0", "release": "2024a", "compiler": "GCC/13"}
        ],
        "GCC/13-extensions": [
            {"name": "numpy/1.26.4", "release": "2024a", "compiler": "GCC/13"}
        ],
        "Intel/2024": [
            {"name": "Boost/1.83.0", "release": "2024a", "compiler": "Intel/2024"},
            {"release": "2024a", "compiler": "Intel/2024"}
        ]
    }
}"#;

fn write_catalog(dir: &TempDir, system: &str, json: &str) {
    fs::write(dir.path().join(format!("processed_module_{}.json", system)), json).unwrap();
}

fn config_for(dir: &TempDir) -> AppConfig {
    AppConfig {
        data_dir: dir.path().to_path_buf(),
        systems: vec![SystemEntry::new("barnard"), SystemEntry::new("romeo")],
        ..Default::default()
    }
}

// =========================================================================
// Loading
// =========================================================================

#[test]
fn test_malformed_records_are_skipped_and_reported() {
    let (tree, report) = CatalogTree::from_json_str(CATALOG, &ModuleClassifier::default()).unwrap();
    assert_eq!(report.accepted, 6);
    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].starts_with("2024a/Intel/2024"));
    assert_eq!(tree.len(), 6);
}

#[test]
fn test_display_order() {
    let (tree, _) = CatalogTree::from_json_str(CATALOG, &ModuleClassifier::default()).unwrap();
    assert_eq!(tree.releases(), vec!["2024a", "2023b"]);
    assert_eq!(
        tree.compilers("2024a"),
        vec!["None", "GCC/13", "GCC/13-extensions", "Intel/2024"]
    );

    let labels: Vec<&str> = tree.buckets().iter().map(|b| b.label).collect();
    assert_eq!(labels, vec!["Standalone", "GCC/13", "GCC/13", "Intel/2024", "GCC/12"]);
}

#[test]
fn test_classification_from_bucket_keys() {
    let (tree, _) = CatalogTree::from_json_str(CATALOG, &ModuleClassifier::default()).unwrap();

    let zlib = &tree.modules("2024a", "None")[0];
    assert!(zlib.is_standalone());
    assert!(!zlib.is_extension());
    assert_eq!(zlib.compiler(), "");

    let numpy = &tree.modules("2024a", "GCC/13-extensions")[0];
    assert!(numpy.is_extension());
    assert_eq!(numpy.base_compiler(), "GCC/13");
}

#[test]
fn test_standalone_label_in_none_bucket_does_not_conflict() {
    let json = r#"{"2024a": {
        "None": [{"name": "zlib/1.3.1", "release": "2024a", "compiler": "Standalone"}],
        "GCC/13": [{"name": "Boost/1.83.0", "release": "2024a", "compiler": "GCC/13"}]
    }}"#;
    let (tree, _) = CatalogTree::from_json_str(json, &ModuleClassifier::default()).unwrap();

    let zlib = tree.modules("2024a", "None")[0].clone();
    assert!(zlib.is_standalone());
    assert_eq!(zlib.root_compiler(), None);

    let boost = tree.modules("2024a", "GCC/13")[0].clone();
    let result = check(&[zlib, boost]);
    assert!(!result.conflict);
    assert!(result.message.is_empty());
}

#[test]
fn test_custom_extension_marker() {
    let json = r#"{"2024a": {"GCC/13+ext": [{"name": "scipy/1.11", "release": "2024a", "compiler": "GCC/13+ext"}]}}"#;
    let (tree, _) = CatalogTree::from_json_str(json, &ModuleClassifier::new("+ext")).unwrap();
    let scipy = &tree.modules("2024a", "GCC/13+ext")[0];
    assert!(scipy.is_extension());
    assert_eq!(tree.buckets()[0].label, "GCC/13");
}

#[test]
fn test_invalid_json_is_an_error() {
    let result = CatalogTree::from_json_str("[1, 2, 3]", &ModuleClassifier::default());
    assert!(matches!(result, Err(ComposerError::Json(_))));
}

// =========================================================================
// File-backed provider
// =========================================================================

#[test]
fn test_store_lists_configured_systems() {
    let dir = TempDir::new().unwrap();
    let store = FileCatalogStore::from_config(&config_for(&dir));
    let names: Vec<String> = store.list_systems().systems.into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["barnard", "romeo"]);
}

#[test]
fn test_store_search_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "barnard", CATALOG);
    let store = FileCatalogStore::from_config(&config_for(&dir));

    let all = store.search("barnard", "").unwrap();
    assert_eq!(all.len(), 6);

    let python = store.search("barnard", "python/3.1").unwrap();
    let names: Vec<&str> = python.iter_modules().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Python/3.11.5", "Python/3.10.8"]);

    let by_description = store.search("barnard", "compression, BOOST").unwrap();
    assert_eq!(by_description.len(), 3);
}

#[test]
fn test_store_missing_catalog_is_unavailable() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "barnard", CATALOG);
    let store = FileCatalogStore::from_config(&config_for(&dir));

    let err = store.get_catalog("romeo").unwrap_err();
    match err {
        ComposerError::CatalogUnavailable { system, .. } => assert_eq!(system, "romeo"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_store_serves_last_good_copy_after_corruption() {
    let dir = TempDir::new().unwrap();
    write_catalog(&dir, "barnard", CATALOG);
    let store = FileCatalogStore::from_config(&config_for(&dir));
    assert_eq!(store.get_catalog("barnard").unwrap().len(), 6);

    write_catalog(&dir, "barnard", "truncated {");
    assert_eq!(store.get_catalog("barnard").unwrap().len(), 6);
}

#[test]
fn test_catalog_serializes_in_processed_layout() {
    let (tree, _) = CatalogTree::from_json_str(CATALOG, &ModuleClassifier::default()).unwrap();
    let value = serde_json::to_value(&tree).unwrap();
    let zlib = &value["2024a"]["None"][0];
    assert_eq!(zlib["name"], "zlib/1.3.1");
    assert_eq!(zlib["package"], "zlib");
    assert_eq!(zlib["version"], "1.3.1");
    assert_eq!(zlib["is_standalone"], true);
}
