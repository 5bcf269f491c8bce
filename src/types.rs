//! Type-safe option types for module-composer
//!
//! Policy switches that the underlying data disagrees on are modelled as
//! enums instead of booleans or magic strings, so they can be named in the
//! config file and on the command line.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a compiler grouping key is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CompilerKind {
    /// No compiler dependency (empty key or "none")
    #[default]
    Standalone,
    /// A normal compiler/toolchain dependency
    Toolchain,
    /// A bucket extending a base compiler grouping
    Extension,
}

/// Which compiler buckets qualify as suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CoveragePolicy {
    /// The bucket must supply every requested package
    #[default]
    Complete,
    /// Any bucket supplying at least one requested package
    Partial,
}

/// Whether extension modules contribute their name to a load command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExtensionCommandPolicy {
    /// Append every selected module's name
    #[default]
    Include,
    /// Leave extension modules out; loading the base compiler provides them
    Exclude,
}

/// Output format for CLI reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
