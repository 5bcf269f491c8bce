use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::selection::ModuleSelector;
use crate::types::{CoveragePolicy, ExtensionCommandPolicy, OutputFormat};

/// Module Composer - browse HPC module catalogs and compose load commands
#[derive(Parser)]
#[command(name = "module-composer")]
#[command(about = "Check that environment modules can be loaded together and build the load command")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON). Environment variables are applied on top.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding processed_module_<system>.json files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured systems
    Systems,
    /// Show a system's catalog, optionally filtered
    Browse {
        /// System to browse (defaults to the configured default)
        #[arg(short, long)]
        system: Option<String>,

        /// Search query: comma-separated terms, `pkg/ver` form allowed
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(short, long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check whether modules can be loaded together
    Check {
        /// System whose catalog resolves selectors and feeds suggestions
        #[arg(short, long)]
        system: Option<String>,

        /// Read a conflict request (`{"selected": [...], "system": ...}`) from a JSON file
        #[arg(short, long, conflicts_with = "modules")]
        input: Option<PathBuf>,

        /// Override the suggestion coverage policy
        #[arg(long)]
        coverage: Option<CoveragePolicy>,

        /// Override whether extension modules appear in the load command
        #[arg(long)]
        extensions: Option<ExtensionCommandPolicy>,

        #[arg(short, long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Modules as name[@release[@compiler]]
        modules: Vec<ModuleSelector>,
    },
    /// Validate a processed catalog file
    Validate {
        /// Path to the catalog file
        catalog: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["module-composer"]).is_err());
    }

    #[test]
    fn test_cli_systems_with_global_flags() {
        let cli = Cli::try_parse_from([
            "module-composer",
            "systems",
            "--config",
            "/etc/module-composer.json",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Systems));
        assert!(cli.verbose);
        assert_eq!(cli.config.unwrap().to_str().unwrap(), "/etc/module-composer.json");
    }

    #[test]
    fn test_cli_browse_defaults() {
        let cli = Cli::try_parse_from(["module-composer", "browse", "--system", "barnard"]).unwrap();
        match cli.command {
            Commands::Browse { system, query, format } => {
                assert_eq!(system.as_deref(), Some("barnard"));
                assert!(query.is_empty());
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Expected Browse command"),
        }
    }

    #[test]
    fn test_cli_check_selectors() {
        let cli = Cli::try_parse_from([
            "module-composer",
            "check",
            "--format",
            "json",
            "--coverage",
            "partial",
            "Python/3.11.5",
            "numpy/1.26.4@2024a@GCC/13-extensions",
        ])
        .unwrap();
        match cli.command {
            Commands::Check {
                modules,
                format,
                coverage,
                input,
                ..
            } => {
                assert_eq!(modules.len(), 2);
                assert_eq!(modules[1].compiler.as_deref(), Some("GCC/13-extensions"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(coverage, Some(CoveragePolicy::Partial));
                assert!(input.is_none());
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_check_input_conflicts_with_selectors() {
        let result = Cli::try_parse_from([
            "module-composer",
            "check",
            "--input",
            "request.json",
            "A/1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_check_rejects_bad_selector() {
        assert!(Cli::try_parse_from(["module-composer", "check", "@2024a"]).is_err());
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from([
            "module-composer",
            "validate",
            "data/processed_module_barnard.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Validate { catalog } => {
                assert_eq!(catalog.to_str().unwrap(), "data/processed_module_barnard.json");
            }
            _ => panic!("Expected Validate command"),
        }
    }
}
