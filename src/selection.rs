//! Selection set: the ordered list of modules the user has picked.
//!
//! Two entries are the same selection iff name, compiler and release all
//! match. The set never holds two such entries.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::catalog::CatalogTree;
use crate::error::{ComposerError, Result};
use crate::module::{Module, ModuleClassifier, RawModule};

/// What a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Ordered, duplicate-free module selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionSet {
    modules: Vec<Module>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the selection-equal entry if present, otherwise append
    pub fn toggle(&mut self, module: Module) -> ToggleOutcome {
        match self.position(&module) {
            Some(idx) => {
                self.modules.remove(idx);
                ToggleOutcome::Removed
            }
            None => {
                self.modules.push(module);
                ToggleOutcome::Added
            }
        }
    }

    /// Validate a raw record, then toggle it.
    ///
    /// # Errors
    ///
    /// `InvalidModule` if the record is malformed; the set is unchanged.
    pub fn toggle_raw(&mut self, raw: RawModule, classifier: &ModuleClassifier) -> Result<ToggleOutcome> {
        let module = classifier.classify(raw)?;
        Ok(self.toggle(module))
    }

    /// Append unless already present; returns true if added
    pub fn add(&mut self, module: Module) -> bool {
        if self.contains(&module) {
            false
        } else {
            self.modules.push(module);
            true
        }
    }

    /// Remove the selection-equal entry; returns true if something was removed
    pub fn remove(&mut self, module: &Module) -> bool {
        match self.position(module) {
            Some(idx) => {
                self.modules.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }

    pub fn contains(&self, module: &Module) -> bool {
        self.position(module).is_some()
    }

    fn position(&self, module: &Module) -> Option<usize> {
        self.modules.iter().position(|m| m.same_selection(module))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    pub fn as_slice(&self) -> &[Module] {
        &self.modules
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

/// Command-line module reference: `name[@release[@compiler]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSelector {
    pub name: String,
    pub release: Option<String>,
    pub compiler: Option<String>,
}

impl FromStr for ModuleSelector {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, '@');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ComposerError::invalid_module(format!("empty module name in '{}'", s)));
        }
        let release = parts.next().map(|r| r.trim().to_string());
        if release.as_deref() == Some("") {
            return Err(ComposerError::invalid_module(format!("empty release in '{}'", s)));
        }
        Ok(Self {
            name: name.to_string(),
            release,
            compiler: parts.next().map(|c| c.trim().to_string()),
        })
    }
}

impl fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(release) = &self.release {
            write!(f, "@{}", release)?;
        }
        if let Some(compiler) = &self.compiler {
            write!(f, "@{}", compiler)?;
        }
        Ok(())
    }
}

impl ModuleSelector {
    /// Resolve against a catalog (first match in display order). Without a
    /// catalog hit, a fully qualified selector still yields a module.
    pub fn resolve(&self, catalog: Option<&CatalogTree>, classifier: &ModuleClassifier) -> Result<Module> {
        let found = catalog.and_then(|tree| {
            tree.find(&self.name, self.release.as_deref(), self.compiler.as_deref())
        });
        if let Some(module) = found {
            return Ok(module.clone());
        }

        match (&self.release, &self.compiler) {
            (Some(release), Some(compiler)) => {
                classifier.classify(RawModule::new(&self.name, release, compiler))
            }
            _ => Err(ComposerError::invalid_module(format!(
                "'{}' not found in catalog (use name@release@compiler)",
                self
            ))),
        }
    }
}
