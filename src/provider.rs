//! Catalog providers
//!
//! The session talks to catalog data through [`CatalogProvider`]. Two
//! implementations ship with the crate:
//!
//! - [`FileCatalogStore`] reads `processed_module_<system>.json` files from a
//!   data directory and keeps the last good copy per system
//! - [`InMemoryCatalog`] holds prebuilt trees, for tests and embedding

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::catalog::{CatalogTree, LoadReport};
use crate::config::{AppConfig, SystemEntry};
use crate::error::{ComposerError, Result};
use crate::logic::search_catalog;
use crate::module::ModuleClassifier;

/// Body of a `listSystems` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemsResponse {
    pub systems: Vec<SystemEntry>,
}

/// Source of catalog data for one or more systems
pub trait CatalogProvider {
    /// Systems that can be browsed
    fn list_systems(&self) -> SystemsResponse;

    /// Full catalog of one system.
    ///
    /// # Errors
    ///
    /// `CatalogUnavailable` if the system is unknown or its data cannot be read.
    fn get_catalog(&self, system: &str) -> Result<CatalogTree>;

    /// Catalog of one system filtered by `query`
    fn search(&self, system: &str, query: &str) -> Result<CatalogTree> {
        let catalog = self.get_catalog(system)?;
        Ok(search_catalog(&catalog, query))
    }
}

/// Catalog file name for a system
pub fn catalog_file_name(system: &str) -> String {
    format!("processed_module_{}.json", system)
}

/// File-backed provider
#[derive(Debug)]
pub struct FileCatalogStore {
    data_dir: PathBuf,
    systems: Vec<SystemEntry>,
    classifier: ModuleClassifier,
    cache: Mutex<HashMap<String, CatalogTree>>,
}

impl FileCatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>, systems: Vec<SystemEntry>, classifier: ModuleClassifier) -> Self {
        Self {
            data_dir: data_dir.into(),
            systems,
            classifier,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.data_dir.clone(), config.systems.clone(), config.classifier())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a system's catalog file
    pub fn catalog_path(&self, system: &str) -> PathBuf {
        self.data_dir.join(catalog_file_name(system))
    }

    /// Read a system's catalog from disk without touching the cache
    pub fn load(&self, system: &str) -> Result<(CatalogTree, LoadReport)> {
        self.check_system(system)?;
        let path = self.catalog_path(system);
        CatalogTree::load_from_file(&path, &self.classifier)
            .map_err(|e| ComposerError::catalog_unavailable(system, format!("{:?}: {}", path, e)))
    }

    fn check_system(&self, system: &str) -> Result<()> {
        if system.trim().is_empty() || system.contains(['/', '\\']) || system.contains("..") {
            return Err(ComposerError::catalog_unavailable(system, "invalid system name"));
        }
        if !self.systems.is_empty() && !self.systems.iter().any(|s| s.name == system) {
            return Err(ComposerError::catalog_unavailable(system, "unknown system"));
        }
        Ok(())
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, CatalogTree>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CatalogProvider for FileCatalogStore {
    fn list_systems(&self) -> SystemsResponse {
        SystemsResponse {
            systems: self.systems.clone(),
        }
    }

    fn get_catalog(&self, system: &str) -> Result<CatalogTree> {
        match self.load(system) {
            Ok((tree, report)) => {
                tracing::info!(
                    "Loaded catalog for {}: {} modules ({} rejected)",
                    system,
                    report.accepted,
                    report.rejected.len()
                );
                self.cache().insert(system.to_string(), tree.clone());
                Ok(tree)
            }
            Err(e) => {
                if let Some(cached) = self.cache().get(system) {
                    tracing::warn!("{}; serving last good copy", e);
                    return Ok(cached.clone());
                }
                tracing::warn!("{}", e);
                Err(e)
            }
        }
    }
}

/// Provider over prebuilt catalogs
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    catalogs: BTreeMap<String, CatalogTree>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>, tree: CatalogTree) -> Self {
        self.insert(system, tree);
        self
    }

    pub fn insert(&mut self, system: impl Into<String>, tree: CatalogTree) {
        self.catalogs.insert(system.into(), tree);
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn list_systems(&self) -> SystemsResponse {
        SystemsResponse {
            systems: self.catalogs.keys().map(SystemEntry::new).collect(),
        }
    }

    fn get_catalog(&self, system: &str) -> Result<CatalogTree> {
        self.catalogs
            .get(system)
            .cloned()
            .ok_or_else(|| ComposerError::catalog_unavailable(system, "unknown system"))
    }
}
