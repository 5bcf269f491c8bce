//! Suggestion generator
//!
//! When a selection conflicts, look for compiler buckets that can supply the
//! same packages from a single release and a single compiler, and offer each
//! one as a ready-made substitute.
//!
//! # Algorithm
//!
//! 1. Requested identities: distinct `package` values, in selection order.
//! 2. Walk every bucket in catalog display order (release newest first,
//!    standalone bucket first, then compiler keys lexicographically).
//! 3. Collect the bucket's modules per requested package.
//! 4. Keep the bucket if it satisfies the coverage policy.
//! 5. Pick one module per covered package (the selected version if the
//!    bucket has it, otherwise the first in bucket order), or every
//!    combination when `expand_variants` is on.
//!
//! Output order depends only on the catalog and the selection, so repeated
//! calls give identical results.

use serde::{Deserialize, Serialize};

use crate::catalog::{Bucket, CatalogTree};
use crate::logic::command::format_load_command;
use crate::module::Module;
use crate::types::CoveragePolicy;

/// Default cap on the number of suggestions returned
pub const DEFAULT_MAX_SUGGESTIONS: usize = 50;

/// Options for the suggestion generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionOptions {
    pub coverage: CoveragePolicy,
    /// Emit every combination of matching versions instead of one per bucket
    pub expand_variants: bool,
    /// Let compiler buckets borrow from the release's standalone bucket
    pub merge_standalone: bool,
    pub max_items: usize,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self {
            coverage: CoveragePolicy::Complete,
            expand_variants: false,
            merge_standalone: false,
            max_items: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// One alternative combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub release: String,
    /// Display compiler name ("Standalone" for the standalone bucket)
    pub compiler: String,
    /// Module names, one per covered package, in request order
    pub packages: Vec<String>,
    pub load_cmd: String,
}

/// All alternatives found for a selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub success: bool,
    pub items: Vec<SuggestionItem>,
}

impl SuggestionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_items(items: Vec<SuggestionItem>) -> Self {
        Self {
            success: !items.is_empty(),
            items,
        }
    }

    /// Items grouped by release, preserving order
    pub fn by_release(&self) -> Vec<(&str, Vec<&SuggestionItem>)> {
        let mut groups: Vec<(&str, Vec<&SuggestionItem>)> = Vec::new();
        for item in &self.items {
            match groups.last_mut() {
                Some((release, items)) if *release == item.release => items.push(item),
                _ => groups.push((item.release.as_str(), vec![item])),
            }
        }
        groups
    }
}

/// Suggest alternatives with default options
pub fn suggest(selected: &[Module], catalog: &CatalogTree) -> SuggestionSet {
    suggest_with(selected, catalog, &SuggestionOptions::default())
}

/// Suggest alternatives for `selected` from `catalog`
pub fn suggest_with(
    selected: &[Module],
    catalog: &CatalogTree,
    options: &SuggestionOptions,
) -> SuggestionSet {
    let requested = requested_packages(selected);
    if requested.is_empty() || options.max_items == 0 {
        return SuggestionSet::empty();
    }

    let mut items: Vec<SuggestionItem> = Vec::new();

    for bucket in catalog.buckets() {
        let candidates = bucket_candidates(&bucket, catalog, &requested, options);
        let covered = candidates.iter().filter(|c| !c.is_empty()).count();
        let qualifies = match options.coverage {
            CoveragePolicy::Complete => covered == requested.len(),
            CoveragePolicy::Partial => covered > 0,
        };
        if !qualifies {
            continue;
        }

        let lists: Vec<&Vec<&Module>> = candidates.iter().filter(|c| !c.is_empty()).collect();
        let combinations = if options.expand_variants {
            cartesian(&lists, options.max_items - items.len())
        } else {
            vec![lists
                .iter()
                .map(|list| preferred_variant(list, selected))
                .collect()]
        };

        let command_compiler = if bucket.is_standalone() { "" } else { bucket.label };
        for combination in combinations {
            let names: Vec<&str> = combination.iter().map(|m| m.name()).collect();
            let item = SuggestionItem {
                release: bucket.release.to_string(),
                compiler: bucket.label.to_string(),
                packages: names.iter().map(|n| n.to_string()).collect(),
                load_cmd: format_load_command(bucket.release, command_compiler, names.iter().copied()),
            };
            if !items.contains(&item) {
                items.push(item);
            }
            if items.len() >= options.max_items {
                tracing::debug!("Suggestion limit of {} reached", options.max_items);
                return SuggestionSet::from_items(items);
            }
        }
    }

    tracing::debug!("Found {} suggestions for {} packages", items.len(), requested.len());
    SuggestionSet::from_items(items)
}

/// Distinct package names in selection order
fn requested_packages(selected: &[Module]) -> Vec<&str> {
    let mut packages: Vec<&str> = Vec::new();
    for module in selected {
        if !packages.contains(&module.package()) {
            packages.push(module.package());
        }
    }
    packages
}

/// Per requested package, the bucket's matching modules
fn bucket_candidates<'a>(
    bucket: &Bucket<'a>,
    catalog: &'a CatalogTree,
    requested: &[&str],
    options: &SuggestionOptions,
) -> Vec<Vec<&'a Module>> {
    let borrowed: &[Module] = if options.merge_standalone && !bucket.is_standalone() {
        catalog.modules(bucket.release, "")
    } else {
        &[]
    };

    requested
        .iter()
        .map(|package| {
            bucket
                .modules
                .iter()
                .chain(borrowed.iter())
                .filter(|m| m.package() == *package)
                .collect()
        })
        .collect()
}

/// The selected version if present in the bucket, otherwise the first entry
fn preferred_variant<'a>(candidates: &[&'a Module], selected: &[Module]) -> &'a Module {
    candidates
        .iter()
        .copied()
        .find(|c| {
            selected
                .iter()
                .any(|s| s.package() == c.package() && s.version() == c.version())
        })
        .unwrap_or(candidates[0])
}

/// Cartesian product of the candidate lists, at most `limit` combinations
fn cartesian<'a>(lists: &[&Vec<&'a Module>], limit: usize) -> Vec<Vec<&'a Module>> {
    let mut out = Vec::new();
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return out;
    }

    let mut indices = vec![0usize; lists.len()];
    while out.len() < limit {
        out.push(lists.iter().zip(&indices).map(|(list, &i)| list[i]).collect());

        // Odometer increment, last position fastest
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < lists[pos].len() {
                break;
            }
            indices[pos] = 0;
        }
    }
    out
}
