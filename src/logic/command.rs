//! Load command builder
//!
//! Renders `module load {release} {compiler} {name_1} ... {name_n}` for a
//! selection that has already passed the compatibility check.
//!
//! # Policy
//!
//! - Prefix comes from the **first** selected module (release, compiler with
//!   the extension marker stripped).
//! - A standalone prefix contributes no token, so there is never a double
//!   space: `module load 2024a foo`.
//! - Names appear in selection order, each at most once.
//! - Extension modules are included or dropped per `ExtensionCommandPolicy`.
//!   If every selected module is an extension, `Exclude` falls back to
//!   listing them, since a command with no module tokens loads nothing.

use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};
use crate::module::Module;
use crate::types::ExtensionCommandPolicy;

/// Options for the command builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    pub extension_policy: ExtensionCommandPolicy,
}

/// Join release, compiler and names into a load command, collapsing any
/// whitespace so empty parts leave no gaps.
pub fn format_load_command<'a, I>(release: &str, compiler: &str, names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tokens: Vec<&str> = vec!["module", "load"];
    tokens.extend(release.split_whitespace());
    tokens.extend(compiler.split_whitespace());
    for name in names {
        tokens.extend(name.split_whitespace());
    }
    tokens.join(" ")
}

/// Build the load command with default options.
///
/// # Errors
///
/// `EmptySelection` if `selected` is empty.
pub fn build(selected: &[Module]) -> Result<String> {
    build_with(selected, &CommandOptions::default())
}

/// Build the load command.
///
/// Does not re-run the compatibility check; callers hand in a selection
/// that is known to be conflict-free.
pub fn build_with(selected: &[Module], options: &CommandOptions) -> Result<String> {
    let first = selected.first().ok_or(ComposerError::EmptySelection)?;

    let exclude = options.extension_policy == ExtensionCommandPolicy::Exclude
        && !selected.iter().all(Module::is_extension);
    if options.extension_policy == ExtensionCommandPolicy::Exclude && !exclude {
        tracing::debug!("Selection is all extensions; listing them despite exclude policy");
    }

    let mut names: Vec<&str> = Vec::with_capacity(selected.len());
    for module in selected {
        if exclude && module.is_extension() {
            continue;
        }
        if !names.contains(&module.name()) {
            names.push(module.name());
        }
    }

    Ok(format_load_command(
        first.release(),
        first.base_compiler(),
        names,
    ))
}
