//! Application configuration.
//!
//! Loaded from a JSON file, then overlaid with environment variables:
//!
//! | Variable             | Effect                                  |
//! |----------------------|-----------------------------------------|
//! | `DATA_DIR`           | directory holding processed catalogs    |
//! | `SYSTEM_<n>_NAME`    | declares a system, ordered by `<n>`     |
//! | `SYSTEM_<n>_HOST`    | host of system `<n>` (optional)         |
//! | `EXTENSION_MARKER`   | compiler suffix flagging extensions     |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logic::{CheckerOptions, CommandOptions, EvaluationOptions, SuggestionOptions};
use crate::module::{ModuleClassifier, DEFAULT_EXTENSION_MARKER};

/// Default search debounce window
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Upper bound accepted for the debounce window
pub const MAX_SEARCH_DEBOUNCE_MS: u64 = 10_000;

const DEFAULT_DATA_DIR: &str = "./data";

/// A cluster whose module catalog can be browsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl SystemEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub systems: Vec<SystemEntry>,
    /// System used when a request names none; falls back to the first system
    pub default_system: Option<String>,
    pub extension_marker: String,
    pub search_debounce_ms: u64,
    pub checker: CheckerOptions,
    pub suggestions: SuggestionOptions,
    pub command: CommandOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            systems: Vec::new(),
            default_system: None,
            extension_marker: DEFAULT_EXTENSION_MARKER.to_string(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            checker: CheckerOptions::default(),
            suggestions: SuggestionOptions::default(),
            command: CommandOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Load from an optional file, apply the process environment and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables.
    ///
    /// Systems declared through `SYSTEM_<n>_NAME` replace the file's list.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut names: BTreeMap<u32, String> = BTreeMap::new();
        let mut hosts: BTreeMap<u32, String> = BTreeMap::new();

        for (key, value) in vars {
            match key.as_str() {
                "DATA_DIR" if !value.trim().is_empty() => {
                    self.data_dir = PathBuf::from(value.trim());
                }
                "EXTENSION_MARKER" if !value.trim().is_empty() => {
                    self.extension_marker = value.trim().to_string();
                }
                _ => {
                    if let Some((index, field)) = parse_system_var(&key) {
                        let target = if field == "NAME" { &mut names } else { &mut hosts };
                        target.insert(index, value.trim().to_string());
                    }
                }
            }
        }

        if names.is_empty() {
            return;
        }

        self.systems = names
            .into_iter()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| SystemEntry {
                name,
                host: hosts.remove(&index).filter(|h| !h.is_empty()),
            })
            .collect();
        tracing::debug!("Systems from environment: {:?}", self.system_names());
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let marker = self.extension_marker.trim();
        if marker.is_empty() {
            anyhow::bail!("Extension marker must not be empty");
        }
        if marker.contains(char::is_whitespace) {
            anyhow::bail!("Extension marker cannot contain whitespace");
        }

        let mut seen = HashSet::new();
        for system in &self.systems {
            let name = system.name.trim();
            if name.is_empty() {
                anyhow::bail!("System names must not be empty");
            }
            if name.contains(['/', '\\']) || name == ".." {
                anyhow::bail!("System name '{}' cannot contain path separators", name);
            }
            if !seen.insert(name) {
                anyhow::bail!("System '{}' is declared more than once", name);
            }
        }

        if let Some(default) = &self.default_system {
            if !self.systems.is_empty() && !seen.contains(default.trim()) {
                anyhow::bail!("Default system '{}' is not a declared system", default);
            }
        }

        if self.search_debounce_ms > MAX_SEARCH_DEBOUNCE_MS {
            anyhow::bail!(
                "Search debounce must be at most {} ms (got {})",
                MAX_SEARCH_DEBOUNCE_MS,
                self.search_debounce_ms
            );
        }

        if self.suggestions.max_items == 0 {
            anyhow::bail!("Suggestion limit must be at least 1");
        }

        Ok(())
    }

    pub fn classifier(&self) -> ModuleClassifier {
        ModuleClassifier::new(self.extension_marker.trim())
    }

    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions {
            checker: self.checker,
            suggestions: self.suggestions,
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    /// Pick the system for a request: explicit, then default, then first
    pub fn resolve_system(&self, requested: Option<&str>) -> Result<String> {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(self.default_system.as_deref())
            .or_else(|| self.systems.first().map(|s| s.name.as_str()))
            .map(str::to_string)
            .context("No system given and none configured (set SYSTEM_1_NAME or --system)")
    }
}

/// `SYSTEM_<n>_NAME` / `SYSTEM_<n>_HOST` → `(n, "NAME" | "HOST")`
fn parse_system_var(key: &str) -> Option<(u32, &str)> {
    let rest = key.strip_prefix("SYSTEM_")?;
    let (index, field) = rest.split_once('_')?;
    let index = index.parse().ok()?;
    matches!(field, "NAME" | "HOST").then_some((index, field))
}
