//! Error handling module for module-composer
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every error here is recoverable: the session reports it and keeps going.

use thiserror::Error;

/// Main error type for module-composer
#[derive(Error, Debug)]
pub enum ComposerError {
    /// Catalog or search data could not be fetched or parsed
    #[error("Catalog unavailable for system '{system}': {reason}")]
    CatalogUnavailable { system: String, reason: String },

    /// A module record is missing required fields or is otherwise malformed
    #[error("Invalid module: {0}")]
    InvalidModule(String),

    /// Suggestions could not be computed (no catalog, lookup failure)
    #[error("Suggestions unavailable: {0}")]
    SuggestionUnavailable(String),

    /// A load command was requested for an empty selection
    #[error("Cannot build a load command for an empty selection")]
    EmptySelection,

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session state machine transition errors
    #[error("Session transition error: {0}")]
    SessionTransition(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for module-composer operations
pub type Result<T> = std::result::Result<T, ComposerError>;

// Convenient error constructors
impl ComposerError {
    /// Create a catalog-unavailable error
    pub fn catalog_unavailable(system: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            system: system.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-module error
    pub fn invalid_module(msg: impl Into<String>) -> Self {
        Self::InvalidModule(msg.into())
    }

    /// Create a suggestion-unavailable error
    pub fn suggestion_unavailable(msg: impl Into<String>) -> Self {
        Self::SuggestionUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-friendly name of the error kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CatalogUnavailable { .. } => "CatalogUnavailable",
            Self::InvalidModule(_) => "InvalidModule",
            Self::SuggestionUnavailable(_) => "SuggestionUnavailable",
            Self::EmptySelection => "EmptySelection",
            Self::Config(_) => "Config",
            Self::SessionTransition(_) => "SessionTransition",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
        }
    }
}
