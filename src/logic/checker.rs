//! Compatibility checker
//!
//! Decides whether a selection can be loaded together. Rules run in order
//! and the first failing rule wins:
//!
//! | # | Rule                 | Conflict when                                        |
//! |---|----------------------|------------------------------------------------------|
//! | 1 | Trivial              | never (fewer than two modules)                       |
//! | 2 | Release agreement    | two modules differ in their root release             |
//! | 3 | Duplicate versions   | opt-in: same package + compiler, different versions  |
//! | 4 | Compiler agreement   | a compiler-bound module differs from the first one   |
//!
//! Standalone modules never take part in the compiler rule. Extension
//! modules are compared by their base compiler, so an extension bucket and
//! the compiler it extends are compatible.
//!
//! Pure logic: no I/O, no catalog access.

use serde::{Deserialize, Serialize};

use crate::logic::suggest::SuggestionSet;
use crate::module::Module;

/// Message for a release mismatch
pub const RELEASE_MISMATCH: &str = "Modules must share the same releases.";

/// Message for a compiler mismatch
pub const COMPILER_MISMATCH: &str = "Modules must share the same dependencies.";

/// Options for the compatibility checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Flag two versions of the same package under the same compiler
    pub reject_duplicate_versions: bool,
}

/// Which rule produced a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ReleaseMismatch,
    DuplicateVersions,
    CompilerMismatch,
}

/// A failed rule and the message shown for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub message: String,
}

/// Result of a conflict check, the shape the render layer consumes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub conflict: bool,
    pub message: String,
    pub suggestions: Option<SuggestionSet>,
    /// Set when suggestions were wanted but could not be produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_error: Option<String>,
}

impl ConflictResult {
    /// No conflict: empty message, no suggestions
    pub fn loadable() -> Self {
        Self::default()
    }

    /// Conflict without suggestions attached yet
    pub fn conflicting(message: impl Into<String>) -> Self {
        Self {
            conflict: true,
            message: message.into(),
            suggestions: None,
            suggestion_error: None,
        }
    }
}

/// Check a selection with default options
pub fn check(selected: &[Module]) -> ConflictResult {
    check_with(selected, &CheckerOptions::default())
}

/// Check a selection. Suggestions are never attached here; see
/// [`crate::logic::evaluate`].
pub fn check_with(selected: &[Module], options: &CheckerOptions) -> ConflictResult {
    match find_conflict(selected, options) {
        Some(conflict) => ConflictResult::conflicting(conflict.message),
        None => ConflictResult::loadable(),
    }
}

/// Run the rules and return the first failure, if any
pub fn find_conflict(selected: &[Module], options: &CheckerOptions) -> Option<Conflict> {
    if selected.len() < 2 {
        return None;
    }

    release_conflict(selected)
        .or_else(|| {
            if options.reject_duplicate_versions {
                duplicate_version_conflict(selected)
            } else {
                None
            }
        })
        .or_else(|| compiler_conflict(selected))
}

fn release_conflict(selected: &[Module]) -> Option<Conflict> {
    let first = selected.first()?.root_release();
    if selected.iter().any(|m| m.root_release() != first) {
        tracing::debug!("Release mismatch in selection");
        return Some(Conflict {
            kind: ConflictKind::ReleaseMismatch,
            message: RELEASE_MISMATCH.to_string(),
        });
    }
    None
}

fn duplicate_version_conflict(selected: &[Module]) -> Option<Conflict> {
    let mut lines = Vec::new();
    for (i, a) in selected.iter().enumerate() {
        for b in &selected[i + 1..] {
            if a.package() == b.package()
                && a.base_compiler() == b.base_compiler()
                && a.version() != b.version()
            {
                let (low, high) = if a.version() <= b.version() {
                    (a.version(), b.version())
                } else {
                    (b.version(), a.version())
                };
                lines.push(format!(
                    "Same modules ({}) with different versions ({}, {}) cannot be loaded together.",
                    a.package(),
                    low,
                    high
                ));
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(Conflict {
            kind: ConflictKind::DuplicateVersions,
            message: lines.join("\n"),
        })
    }
}

fn compiler_conflict(selected: &[Module]) -> Option<Conflict> {
    let mut roots = selected.iter().filter_map(Module::root_compiler);
    let first = roots.next()?;
    if roots.any(|root| root != first) {
        tracing::debug!("Compiler mismatch in selection (first root: {})", first);
        return Some(Conflict {
            kind: ConflictKind::CompilerMismatch,
            message: COMPILER_MISMATCH.to_string(),
        });
    }
    None
}
