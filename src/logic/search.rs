//! Catalog search
//!
//! Query syntax:
//!
//! - terms are separated by commas, surrounding whitespace ignored
//! - `pkg/ver` matches modules whose package contains `pkg` and whose
//!   version contains `ver`
//! - any other term matches package or description
//! - matching is case-insensitive substring matching
//!
//! A module matched by several terms appears once. A query with no terms
//! returns the catalog unfiltered.

use crate::catalog::CatalogTree;
use crate::module::Module;

/// One parsed query term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// Plain text against package and description
    Text(String),
    /// `package/version` form
    PackageVersion { package: String, version: String },
}

impl SearchTerm {
    fn parse(term: &str) -> Self {
        let lower = term.to_lowercase();
        match lower.split_once('/') {
            Some((package, version)) => Self::PackageVersion {
                package: package.to_string(),
                version: version.to_string(),
            },
            None => Self::Text(lower),
        }
    }

    pub fn matches(&self, module: &Module) -> bool {
        match self {
            Self::Text(text) => {
                module.package().to_lowercase().contains(text.as_str())
                    || module
                        .description()
                        .is_some_and(|d| d.to_lowercase().contains(text.as_str()))
            }
            Self::PackageVersion { package, version } => {
                module.package().to_lowercase().contains(package.as_str())
                    && module.version().to_lowercase().contains(version.as_str())
            }
        }
    }
}

/// Split a raw query into terms
pub fn parse_query(query: &str) -> Vec<SearchTerm> {
    query
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(SearchTerm::parse)
        .collect()
}

/// Filter a catalog, keeping its release and compiler structure
pub fn search_catalog(tree: &CatalogTree, query: &str) -> CatalogTree {
    let terms = parse_query(query);
    if terms.is_empty() {
        return tree.clone();
    }

    let mut filtered = CatalogTree::with_classifier(tree.classifier().clone());
    for bucket in tree.buckets() {
        for module in bucket.modules {
            if terms.iter().any(|t| t.matches(module))
                && !filtered.contains_in(bucket.release, bucket.key, module)
            {
                filtered.insert_in(bucket.release, bucket.key, module.clone());
            }
        }
    }

    tracing::debug!(
        "Search {:?}: {} of {} modules matched",
        query,
        filtered.len(),
        tree.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleClassifier, RawModule};

    fn raw(name: &str, release: &str, compiler: &str, description: &str) -> RawModule {
        let mut r = RawModule::new(name, release, compiler);
        r.description = Some(description.to_string());
        r
    }

    fn catalog() -> CatalogTree {
        let classifier = ModuleClassifier::default();
        let mut tree = CatalogTree::new();
        for r in [
            raw("Python/3.11.5", "2024a", "GCC/13", "The Python programming language"),
            raw("Python/3.12.1", "2024a", "GCC/13", "The Python programming language"),
            raw("numpy/1.26.4", "2024a", "GCC/13-extensions", "Array computing for Python"),
            raw("zlib/1.3.1", "2024a", "", "Compression library"),
            raw("Boost/1.83.0", "2023b", "GCC/12", "Peer-reviewed C++ libraries"),
        ] {
            tree.insert(classifier.classify(r).unwrap());
        }
        tree
    }

    fn names(tree: &CatalogTree) -> Vec<&str> {
        tree.iter_modules().map(Module::name).collect()
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let tree = catalog();
        assert_eq!(search_catalog(&tree, ""), tree);
        assert_eq!(search_catalog(&tree, " , ,"), tree);
    }

    #[test]
    fn test_text_matches_package_case_insensitively() {
        let result = search_catalog(&catalog(), "BOOST");
        assert_eq!(names(&result), vec!["Boost/1.83.0"]);
    }

    #[test]
    fn test_text_matches_description() {
        let result = search_catalog(&catalog(), "compression");
        assert_eq!(names(&result), vec!["zlib/1.3.1"]);
    }

    #[test]
    fn test_package_version_form() {
        let result = search_catalog(&catalog(), "python/3.12");
        assert_eq!(names(&result), vec!["Python/3.12.1"]);
    }

    #[test]
    fn test_package_with_empty_version_matches_all_versions() {
        let result = search_catalog(&catalog(), "python/");
        assert_eq!(names(&result), vec!["Python/3.11.5", "Python/3.12.1"]);
    }

    #[test]
    fn test_comma_terms_are_unioned_without_duplicates() {
        let result = search_catalog(&catalog(), "python, python/3.11, zlib");
        // numpy matches "python" through its description
        assert_eq!(result.len(), 4);
        assert_eq!(
            names(&result),
            vec!["zlib/1.3.1", "Python/3.11.5", "Python/3.12.1", "numpy/1.26.4"]
        );
    }

    #[test]
    fn test_structure_is_preserved() {
        let result = search_catalog(&catalog(), "numpy");
        assert_eq!(result.releases(), vec!["2024a"]);
        assert_eq!(result.compilers("2024a"), vec!["GCC/13-extensions"]);
        assert!(result.modules("2024a", "GCC/13-extensions")[0].is_extension());
    }

    #[test]
    fn test_no_match_gives_empty_catalog() {
        assert!(search_catalog(&catalog(), "tensorflow").is_empty());
    }

    #[test]
    fn test_parse_query_terms() {
        assert_eq!(
            parse_query(" GCC , hdf5/1.14 "),
            vec![
                SearchTerm::Text("gcc".to_string()),
                SearchTerm::PackageVersion {
                    package: "hdf5".to_string(),
                    version: "1.14".to_string()
                }
            ]
        );
    }
}
