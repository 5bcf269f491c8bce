//! Logic modules: the decision-making core.
//!
//! Everything here is pure: no I/O, no global state. Catalog access is
//! passed in by the caller.
//!
//! # Modules
//!
//! - `checker`: can a selection be loaded together?
//! - `suggest`: alternative combinations when it cannot
//! - `command`: the `module load ...` line when it can
//! - `search`: catalog filtering by query

pub mod checker;
pub mod command;
pub mod search;
pub mod suggest;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogTree;
use crate::error::{ComposerError, Result};
use crate::module::{Module, ModuleClassifier, RawModule};

pub use checker::{check, check_with, CheckerOptions, ConflictResult};
pub use command::{build, build_with, CommandOptions};
pub use search::{parse_query, search_catalog, SearchTerm};
pub use suggest::{suggest, suggest_with, SuggestionItem, SuggestionOptions, SuggestionSet};

/// Options for a full evaluation (check, then suggestions on conflict)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    pub checker: CheckerOptions,
    pub suggestions: SuggestionOptions,
}

/// Check a selection and, on conflict, attach suggestions.
///
/// With `catalog == None` the result is explicitly degraded: no
/// suggestions and a `SuggestionUnavailable` note in `suggestion_error`.
pub fn evaluate(
    selected: &[Module],
    catalog: Option<&CatalogTree>,
    options: &EvaluationOptions,
) -> ConflictResult {
    let mut result = check_with(selected, &options.checker);
    if !result.conflict {
        return result;
    }

    match catalog {
        Some(tree) => {
            result.suggestions = Some(suggest_with(selected, tree, &options.suggestions));
        }
        None => {
            let err = ComposerError::suggestion_unavailable("no catalog loaded");
            tracing::warn!("{}", err);
            result.suggestion_error = Some(err.to_string());
        }
    }
    result
}

/// Body of a conflict-check request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRequest {
    #[serde(default)]
    pub selected: Vec<RawModule>,
    #[serde(default)]
    pub system: Option<String>,
}

impl ConflictRequest {
    /// Validate every record.
    ///
    /// # Errors
    ///
    /// `InvalidModule` naming the index of the first malformed record.
    pub fn validate(&self, classifier: &ModuleClassifier) -> Result<Vec<Module>> {
        self.selected
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                classifier.classify(raw.clone()).map_err(|e| {
                    ComposerError::invalid_module(format!("selected[{}]: {}", i, e))
                })
            })
            .collect()
    }
}
