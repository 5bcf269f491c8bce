//! Module records
//!
//! `RawModule` is the loosely typed record found in catalog files and
//! conflict-check requests. It is validated exactly once, at the boundary,
//! into a `Module` whose standalone/extension flags are already derived.
//! Nothing downstream re-parses compiler strings.

use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};
use crate::logic::command::format_load_command;
use crate::types::CompilerKind;

/// Suffix that marks a compiler key as an extension bucket unless configured otherwise
pub const DEFAULT_EXTENSION_MARKER: &str = "-extensions";

/// Canonical catalog key of the standalone bucket
pub const STANDALONE_KEY: &str = "None";

/// Display name of the standalone bucket
pub const STANDALONE_LABEL: &str = "Standalone";

/// Returns true if a compiler string means "no compiler dependency".
///
/// Blank, `None` and the `Standalone` display label all qualify, in any case.
pub fn is_standalone_compiler(compiler: &str) -> bool {
    let trimmed = compiler.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case(STANDALONE_KEY)
        || trimmed.eq_ignore_ascii_case(STANDALONE_LABEL)
}

/// First whitespace-delimited token, or "" for a blank string
pub fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}

/// Module record as it appears on the wire. Every field is optional here;
/// `ModuleClassifier::classify` decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_extension: Option<bool>,
}

impl RawModule {
    /// Minimal record with the three fields that define selection identity
    pub fn new(name: &str, release: &str, compiler: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            release: Some(release.to_string()),
            compiler: Some(compiler.to_string()),
            ..Default::default()
        }
    }
}

/// A validated, immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Module {
    name: String,
    package: String,
    version: String,
    release: String,
    /// Normalized compiler string: "" when standalone, extension marker kept
    compiler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    is_extension: bool,
    is_standalone: bool,
    #[serde(skip)]
    base_compiler: String,
}

impl Module {
    /// Build a module with the default extension marker.
    ///
    /// # Errors
    ///
    /// `InvalidModule` when `name` or `release` is blank.
    pub fn new(name: &str, release: &str, compiler: &str) -> Result<Self> {
        ModuleClassifier::default().classify(RawModule::new(name, release, compiler))
    }

    /// Load token, e.g. `foss/2023b`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display package name, e.g. `foss`
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// Compiler as recorded (empty for standalone, extension marker intact)
    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Compiler with the extension marker stripped
    pub fn base_compiler(&self) -> &str {
        &self.base_compiler
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[inline]
    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    #[inline]
    pub fn is_standalone(&self) -> bool {
        self.is_standalone
    }

    pub fn kind(&self) -> CompilerKind {
        if self.is_standalone {
            CompilerKind::Standalone
        } else if self.is_extension {
            CompilerKind::Extension
        } else {
            CompilerKind::Toolchain
        }
    }

    /// First whitespace token of the release
    pub fn root_release(&self) -> &str {
        first_token(&self.release)
    }

    /// First whitespace token of the base compiler, `None` when standalone
    pub fn root_compiler(&self) -> Option<&str> {
        if self.is_standalone {
            None
        } else {
            Some(first_token(&self.base_compiler))
        }
    }

    /// Compiler name shown to users
    pub fn display_compiler(&self) -> &str {
        if self.is_standalone {
            STANDALONE_LABEL
        } else {
            &self.base_compiler
        }
    }

    /// Two modules are the same selection iff name, compiler and release match
    pub fn same_selection(&self, other: &Module) -> bool {
        self.name == other.name && self.compiler == other.compiler && self.release == other.release
    }

    /// Command that loads this module on its own
    pub fn load_command(&self) -> String {
        format_load_command(&self.release, &self.base_compiler, [self.name.as_str()])
    }

    /// Convert back to the wire record
    pub fn to_raw(&self) -> RawModule {
        RawModule {
            name: Some(self.name.clone()),
            package: Some(self.package.clone()),
            version: Some(self.version.clone()),
            release: Some(self.release.clone()),
            compiler: Some(self.compiler.clone()),
            description: self.description.clone(),
            url: self.url.clone(),
            is_extension: Some(self.is_extension),
        }
    }
}

/// Validates raw records and derives the compiler flags.
///
/// The extension marker is configuration, so classification lives here
/// rather than in a `TryFrom` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleClassifier {
    extension_marker: String,
}

impl Default for ModuleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION_MARKER)
    }
}

impl ModuleClassifier {
    pub fn new(extension_marker: impl Into<String>) -> Self {
        Self {
            extension_marker: extension_marker.into(),
        }
    }

    pub fn extension_marker(&self) -> &str {
        &self.extension_marker
    }

    /// Classify a compiler key or value
    pub fn kind_of(&self, compiler: &str) -> CompilerKind {
        if is_standalone_compiler(compiler) {
            CompilerKind::Standalone
        } else if self.has_marker(compiler) {
            CompilerKind::Extension
        } else {
            CompilerKind::Toolchain
        }
    }

    /// Strip the extension marker (if any) and surrounding whitespace
    pub fn strip_marker<'a>(&self, compiler: &'a str) -> &'a str {
        let trimmed = compiler.trim();
        if self.extension_marker.is_empty() {
            return trimmed;
        }
        trimmed
            .strip_suffix(self.extension_marker.as_str())
            .map(str::trim_end)
            .unwrap_or(trimmed)
    }

    fn has_marker(&self, compiler: &str) -> bool {
        !self.extension_marker.is_empty() && compiler.trim().ends_with(&self.extension_marker)
    }

    /// Validate a record that is not attached to a catalog bucket.
    ///
    /// # Errors
    ///
    /// `InvalidModule` if `name`, `release` or `compiler` is missing, or if
    /// the name is blank or contains whitespace.
    pub fn classify(&self, raw: RawModule) -> Result<Module> {
        self.classify_in_bucket(raw, None)
    }

    /// Validate a record found under a catalog compiler key. An extension
    /// marker on the key flags the module even if its own compiler lacks it,
    /// and every record under the standalone key is standalone.
    pub fn classify_in_bucket(&self, raw: RawModule, bucket_key: Option<&str>) -> Result<Module> {
        let name = required(raw.name, "name")?;
        if name.chars().any(char::is_whitespace) {
            return Err(ComposerError::invalid_module(format!(
                "name '{}' contains whitespace",
                name
            )));
        }
        let release = required(raw.release, "release")?;
        let compiler_raw = raw
            .compiler
            .ok_or_else(|| ComposerError::invalid_module(format!("module '{}' has no compiler field", name)))?;

        let is_standalone =
            is_standalone_compiler(&compiler_raw) || bucket_key.is_some_and(is_standalone_compiler);
        let compiler = if is_standalone {
            String::new()
        } else {
            compiler_raw.trim().to_string()
        };

        let bucket_marked = bucket_key.is_some_and(|key| self.has_marker(key));
        let is_extension = !is_standalone
            && (raw.is_extension.unwrap_or(false) || bucket_marked || self.has_marker(&compiler));
        let base_compiler = self.strip_marker(&compiler).to_string();

        let (default_package, default_version) = match name.split_once('/') {
            Some((package, version)) => (package.to_string(), version.to_string()),
            None => (name.clone(), String::new()),
        };
        let package = non_blank(raw.package).unwrap_or(default_package);
        let version = non_blank(raw.version).unwrap_or(default_version);

        Ok(Module {
            name,
            package,
            version,
            release,
            compiler,
            description: non_blank(raw.description),
            url: non_blank(raw.url),
            is_extension,
            is_standalone,
            base_compiler,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| ComposerError::invalid_module(format!("missing required field '{}'", field)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
