//! Catalog tree: release → compiler key → modules.
//!
//! Ordering rules live here so every consumer (search, suggestions, CLI
//! output) walks the catalog the same way:
//!
//! - releases in reverse-lexicographic order (newest toolchain first)
//! - compiler keys with the standalone bucket first, then lexicographic
//! - modules inside a bucket in package-name order, insertion-stable

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::module::{
    is_standalone_compiler, Module, ModuleClassifier, RawModule, STANDALONE_KEY, STANDALONE_LABEL,
};

/// Raw on-disk layout of a processed catalog file
pub type RawCatalog = BTreeMap<String, BTreeMap<String, Vec<RawModule>>>;

/// Canonical bucket key for a compiler string
pub fn canonical_key(compiler: &str) -> String {
    if is_standalone_compiler(compiler) {
        STANDALONE_KEY.to_string()
    } else {
        compiler.trim().to_string()
    }
}

/// Display ordering of compiler keys: standalone first, then lexicographic
pub fn compare_compiler_keys(a: &str, b: &str) -> Ordering {
    match (is_standalone_compiler(a), is_standalone_compiler(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

fn package_sort_key(module: &Module) -> String {
    module.package().to_lowercase()
}

/// Outcome of building a catalog from raw records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of modules accepted
    pub accepted: usize,
    /// One line per rejected record: `release/compiler: reason`
    pub rejected: Vec<String>,
}

/// One compiler bucket, borrowed from a catalog
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'a> {
    pub release: &'a str,
    pub key: &'a str,
    pub label: &'a str,
    pub modules: &'a [Module],
}

impl Bucket<'_> {
    pub fn is_standalone(&self) -> bool {
        is_standalone_compiler(self.key)
    }
}

/// Hierarchical module catalog for one system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogTree {
    #[serde(flatten)]
    releases: BTreeMap<String, BTreeMap<String, Vec<Module>>>,
    #[serde(skip)]
    classifier: ModuleClassifier,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty catalog that classifies keys with a custom extension marker
    pub fn with_classifier(classifier: ModuleClassifier) -> Self {
        Self {
            releases: BTreeMap::new(),
            classifier,
        }
    }

    pub fn classifier(&self) -> &ModuleClassifier {
        &self.classifier
    }

    /// Build a catalog from raw records, dropping malformed ones.
    ///
    /// Records are placed under the release and compiler keys they were
    /// found under. Rejections are logged and listed in the report.
    pub fn from_raw(raw: RawCatalog, classifier: &ModuleClassifier) -> (Self, LoadReport) {
        let mut tree = Self::with_classifier(classifier.clone());
        let mut report = LoadReport::default();

        for (release, compilers) in raw {
            for (key, records) in compilers {
                for record in records {
                    match classifier.classify_in_bucket(record, Some(&key)) {
                        Ok(module) => {
                            tree.insert_in(&release, &key, module);
                            report.accepted += 1;
                        }
                        Err(e) => {
                            tracing::warn!("Rejected catalog record under {}/{}: {}", release, key, e);
                            report.rejected.push(format!("{}/{}: {}", release, key, e));
                        }
                    }
                }
            }
        }

        (tree, report)
    }

    /// Parse a processed catalog from JSON text
    pub fn from_json_str(json: &str, classifier: &ModuleClassifier) -> Result<(Self, LoadReport)> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw, classifier))
    }

    /// Load a processed catalog file (`processed_module_<system>.json`)
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
        classifier: &ModuleClassifier,
    ) -> Result<(Self, LoadReport)> {
        let content = fs::read_to_string(&path)?;
        let loaded = Self::from_json_str(&content, classifier)?;
        tracing::debug!(
            "Loaded catalog {:?}: {} modules, {} rejected",
            path.as_ref(),
            loaded.1.accepted,
            loaded.1.rejected.len()
        );
        Ok(loaded)
    }

    /// Insert a module under its own release and compiler
    pub fn insert(&mut self, module: Module) {
        let release = module.release().to_string();
        let key = module.compiler().to_string();
        self.insert_in(&release, &key, module);
    }

    /// Insert a module under an explicit release and compiler key,
    /// keeping the bucket in package-name order.
    pub fn insert_in(&mut self, release: &str, compiler_key: &str, module: Module) {
        let bucket = self
            .releases
            .entry(release.trim().to_string())
            .or_default()
            .entry(canonical_key(compiler_key))
            .or_default();
        let sort_key = package_sort_key(&module);
        let at = bucket.partition_point(|m| package_sort_key(m) <= sort_key);
        bucket.insert(at, module);
    }

    /// Release keys in display order
    pub fn releases(&self) -> Vec<&str> {
        self.releases.keys().rev().map(String::as_str).collect()
    }

    /// Compiler keys of one release in display order
    pub fn compilers(&self, release: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .releases
            .get(release)
            .map(|c| c.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_by(|a, b| compare_compiler_keys(a, b));
        keys
    }

    /// Modules of one bucket, empty if the bucket does not exist
    pub fn modules(&self, release: &str, compiler_key: &str) -> &[Module] {
        self.releases
            .get(release)
            .and_then(|c| c.get(&canonical_key(compiler_key)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every bucket, in display order
    pub fn buckets(&self) -> Vec<Bucket<'_>> {
        let mut out = Vec::new();
        for (release, compilers) in self.releases.iter().rev() {
            let mut keys: Vec<(&String, &Vec<Module>)> = compilers.iter().collect();
            keys.sort_by(|a, b| compare_compiler_keys(a.0, b.0));
            for (key, modules) in keys {
                out.push(Bucket {
                    release,
                    key,
                    label: self.key_label(key),
                    modules,
                });
            }
        }
        out
    }

    /// Display label of a compiler key (standalone renamed, marker stripped)
    pub fn key_label<'a>(&self, key: &'a str) -> &'a str {
        if is_standalone_compiler(key) {
            STANDALONE_LABEL
        } else {
            self.classifier.strip_marker(key)
        }
    }

    /// Every module, in display order
    pub fn iter_modules(&self) -> impl Iterator<Item = &Module> + '_ {
        self.buckets().into_iter().flat_map(|b| b.modules.iter())
    }

    /// Find the first module (display order) with the given name, optionally
    /// constrained by release and compiler.
    pub fn find(&self, name: &str, release: Option<&str>, compiler: Option<&str>) -> Option<&Module> {
        self.iter_modules().find(|m| {
            m.name() == name
                && release.is_none_or(|r| m.release() == r.trim())
                && compiler.is_none_or(|c| {
                    let c = c.trim();
                    if is_standalone_compiler(c) {
                        m.is_standalone()
                    } else {
                        m.compiler() == c || m.base_compiler() == c
                    }
                })
        })
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.releases
            .values()
            .flat_map(|c| c.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether the given bucket already holds a selection-equal module
    pub(crate) fn contains_in(&self, release: &str, compiler_key: &str, module: &Module) -> bool {
        self.modules(release, compiler_key)
            .iter()
            .any(|m| m.same_selection(module))
    }
}
