//! Module Composer Library
//!
//! Browse an HPC module catalog, check whether a set of environment modules
//! can be loaded together, suggest compatible alternatives when they cannot,
//! and build the `module load` command when they can.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logic;
pub mod module;
pub mod provider;
pub mod selection;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use catalog::{Bucket, CatalogTree, LoadReport, RawCatalog};
pub use config::{AppConfig, SystemEntry};
pub use error::{ComposerError, Result};
pub use logic::{
    build, check, evaluate, search_catalog, suggest, ConflictRequest, ConflictResult,
    EvaluationOptions, SuggestionItem, SuggestionSet,
};
pub use module::{Module, ModuleClassifier, RawModule};
pub use provider::{CatalogProvider, FileCatalogStore, InMemoryCatalog, SystemsResponse};
pub use selection::{ModuleSelector, SelectionSet, ToggleOutcome};
pub use session::{SessionController, SessionOptions, SessionState, SessionTransitionError, SessionView};
pub use types::{CompilerKind, CoveragePolicy, ExtensionCommandPolicy, OutputFormat};
