//! End-to-end session tests: select, check, suggest, build

use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use module_composer::logic::checker::{COMPILER_MISMATCH, RELEASE_MISMATCH};
use module_composer::{
    AppConfig, CatalogTree, ConflictRequest, CoveragePolicy, ExtensionCommandPolicy,
    FileCatalogStore, InMemoryCatalog, Module, ModuleClassifier, ModuleSelector, SessionController,
    SessionOptions, SessionState, SystemEntry,
};

const CATALOG: &str = r#"{
    "2024a": {
        "None": [
            {"name": "zlib/1.3.1", "release": "2024a", "compiler": ""}
        ],
        "GCC/13": [
            {"name": "HDF5/1.14.3", "release": "2024a", "compiler": "GCC/13"},
            {"name": "Python/3.11.5", "release": "2024a", "compiler": "GCC/13"}
        ],
        "GCC/13-extensions": [
            {"name": "numpy/1.26.4", "release": "2024a", "compiler": "GCC/13-extensions"}
        ],
        "Intel/2024": [
            {"name": "HDF5/1.14.3", "release": "2024a", "compiler": "Intel/2024"},
            {"name": "Python/3.11.5", "release": "2024a", "compiler": "Intel/2024"}
        ]
    },
    "2023b": {
        "GCC/12": [
            {"name": "HDF5/1.14.0", "release": "2023b", "compiler": "GCC/12"},
            {"name": "Python/3.11.3", "release": "2023b", "compiler": "GCC/12"}
        ]
    }
}"#;

fn tree() -> CatalogTree {
    CatalogTree::from_json_str(CATALOG, &ModuleClassifier::default())
        .unwrap()
        .0
}

fn find(tree: &CatalogTree, selector: &str) -> Module {
    let selector: ModuleSelector = selector.parse().unwrap();
    selector
        .resolve(Some(tree), &ModuleClassifier::default())
        .unwrap()
}

fn session_with(options: SessionOptions) -> SessionController<InMemoryCatalog> {
    let provider = InMemoryCatalog::new().with_system("barnard", tree());
    let mut session = SessionController::new(provider, options);
    session.select_system("barnard").unwrap();
    session
}

fn session() -> SessionController<InMemoryCatalog> {
    session_with(SessionOptions::default())
}

#[test]
fn test_compiler_conflict_suggests_each_release() {
    let catalog = tree();
    let mut session = session();
    session.toggle_module(find(&catalog, "HDF5/1.14.3@2024a@GCC/13")).unwrap();
    session.toggle_module(find(&catalog, "Python/3.11.5@2024a@Intel/2024")).unwrap();

    let view = session.view();
    assert_eq!(view.state, SessionState::Resolved { conflict: true });
    assert_eq!(view.message, COMPILER_MISMATCH);

    let suggestions = view.suggestions.unwrap();
    let commands: Vec<&str> = suggestions.items.iter().map(|i| i.load_cmd.as_str()).collect();
    assert_eq!(
        commands,
        vec![
            "module load 2024a GCC/13 HDF5/1.14.3 Python/3.11.5",
            "module load 2024a Intel/2024 HDF5/1.14.3 Python/3.11.5",
            "module load 2023b GCC/12 HDF5/1.14.0 Python/3.11.3",
        ]
    );

    let groups = suggestions.by_release();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, "2024a");
    assert_eq!(groups[0].1.len(), 2);
}

#[test]
fn test_release_conflict_message() {
    let catalog = tree();
    let mut session = session();
    session.toggle_module(find(&catalog, "zlib/1.3.1")).unwrap();
    session.toggle_module(find(&catalog, "HDF5/1.14.0")).unwrap();
    assert_eq!(session.view().message, RELEASE_MISMATCH);
}

#[test]
fn test_loadable_selection_with_extension() {
    let catalog = tree();
    let mut session = session();
    session.toggle_module(find(&catalog, "Python/3.11.5@2024a@GCC/13")).unwrap();
    session.toggle_module(find(&catalog, "numpy/1.26.4")).unwrap();
    session.toggle_module(find(&catalog, "zlib/1.3.1")).unwrap();

    let view = session.view();
    assert!(!view.conflict);
    assert_eq!(
        view.command.as_deref(),
        Some("module load 2024a GCC/13 Python/3.11.5 numpy/1.26.4 zlib/1.3.1")
    );
}

#[test]
fn test_extension_policy_exclude_from_config() {
    let mut config = AppConfig::default();
    config.command.extension_policy = ExtensionCommandPolicy::Exclude;

    let catalog = tree();
    let mut session = session_with(SessionOptions::from_config(&config));
    session.toggle_module(find(&catalog, "Python/3.11.5@2024a@GCC/13")).unwrap();
    session.toggle_module(find(&catalog, "numpy/1.26.4")).unwrap();
    assert_eq!(
        session.command().as_deref(),
        Some("module load 2024a GCC/13 Python/3.11.5")
    );
}

#[test]
fn test_partial_coverage_from_config() {
    let mut config = AppConfig::default();
    config.suggestions.coverage = CoveragePolicy::Partial;

    let catalog = tree();
    let mut session = session_with(SessionOptions::from_config(&config));
    session.toggle_module(find(&catalog, "zlib/1.3.1")).unwrap();
    session.toggle_module(find(&catalog, "HDF5/1.14.0")).unwrap();

    let suggestions = session.view().suggestions.unwrap();
    assert!(suggestions.success);
    assert!(suggestions
        .items
        .iter()
        .any(|i| i.load_cmd == "module load 2024a zlib/1.3.1"));
}

#[test]
fn test_no_catalog_still_checks() {
    let provider = InMemoryCatalog::new();
    let mut session = SessionController::new(provider, SessionOptions::default());
    assert!(session.select_system("barnard").is_err());

    session
        .toggle_module(Module::new("A/1", "2024a", "GCC/13").unwrap())
        .unwrap();
    session
        .toggle_module(Module::new("B/1", "2024a", "Intel/2024").unwrap())
        .unwrap();

    let view = session.view();
    assert!(view.conflict);
    assert!(view.suggestions.is_none());
    assert!(view.notice.is_some());
}

#[test]
fn test_conflict_request_through_file_store() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("processed_module_barnard.json"), CATALOG).unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        systems: vec![SystemEntry::new("barnard")],
        ..Default::default()
    };

    let request: ConflictRequest = serde_json::from_str(
        r#"{
            "selected": [
                {"name": "HDF5/1.14.3", "release": "2024a", "compiler": "GCC/13"},
                {"name": "Python/3.11.5", "release": "2024a", "compiler": "Intel/2024"}
            ],
            "system": "barnard"
        }"#,
    )
    .unwrap();

    let mut session = SessionController::new(
        FileCatalogStore::from_config(&config),
        SessionOptions::from_config(&config),
    );
    session
        .select_system(request.system.as_deref().unwrap())
        .unwrap();
    for module in request.validate(&config.classifier()).unwrap() {
        session.toggle_module(module).unwrap();
    }

    let json = serde_json::to_value(session.view()).unwrap();
    assert_eq!(json["state"], "resolved");
    assert_eq!(json["conflict"], true);
    assert_eq!(json["suggestions"]["success"], true);
    assert_eq!(
        json["suggestions"]["items"][0]["compiler"],
        "GCC/13"
    );
}

#[test]
fn test_repeated_request_entry_stays_selected() {
    let request: ConflictRequest = serde_json::from_str(
        r#"{
            "selected": [
                {"name": "HDF5/1.14.3", "release": "2024a", "compiler": "GCC/13"},
                {"name": "HDF5/1.14.3", "release": "2024a", "compiler": "GCC/13"}
            ]
        }"#,
    )
    .unwrap();

    let mut session = session();
    let added: Vec<bool> = request
        .validate(&ModuleClassifier::default())
        .unwrap()
        .into_iter()
        .map(|m| session.add_module(m).unwrap())
        .collect();
    assert_eq!(added, vec![true, false]);
    assert_eq!(
        session.command().as_deref(),
        Some("module load 2024a GCC/13 HDF5/1.14.3")
    );
}

#[test]
fn test_search_then_select() {
    let mut session = session();
    let start = Instant::now();
    session.set_query("python", start);
    assert!(session.run_search(start + Duration::from_millis(300)));

    let results = session.search_results().unwrap().clone();
    assert_eq!(results.len(), 3);

    let first = results.iter_modules().next().unwrap().clone();
    session.toggle_module(first).unwrap();
    assert_eq!(
        session.command().as_deref(),
        Some("module load 2024a GCC/13 Python/3.11.5")
    );
}
