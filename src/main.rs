//! Module Composer - main entry point

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use module_composer::catalog::CatalogTree;
use module_composer::cli::{Cli, Commands};
use module_composer::config::AppConfig;
use module_composer::logic::ConflictRequest;
use module_composer::module::Module;
use module_composer::provider::{CatalogProvider, FileCatalogStore};
use module_composer::selection::ModuleSelector;
use module_composer::session::{SessionController, SessionOptions, SessionView};
use module_composer::types::{CoveragePolicy, ExtensionCommandPolicy, OutputFormat};

/// Initialize tracing; RUST_LOG overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("module-composer starting up");

    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    match cli.command {
        Commands::Systems => list_systems(&config),
        Commands::Browse {
            system,
            query,
            format,
        } => browse(&config, system.as_deref(), &query, format),
        Commands::Check {
            system,
            input,
            coverage,
            extensions,
            format,
            modules,
        } => {
            let request = match input {
                Some(path) => Some(read_request(&path)?),
                None => None,
            };
            check(&config, CheckArgs {
                system,
                request,
                coverage,
                extensions,
                format,
                modules,
            })
        }
        Commands::Validate { catalog } => validate_catalog(&config, &catalog),
    }
}

fn list_systems(config: &AppConfig) -> Result<()> {
    let store = FileCatalogStore::from_config(config);
    let response = store.list_systems();
    if response.systems.is_empty() {
        eprintln!("✗ No systems configured (set SYSTEM_1_NAME or add \"systems\" to the config file)");
        std::process::exit(1);
    }
    for system in response.systems {
        match system.host {
            Some(host) => println!("{}\t{}", system.name, host),
            None => println!("{}", system.name),
        }
    }
    Ok(())
}

fn browse(config: &AppConfig, system: Option<&str>, query: &str, format: OutputFormat) -> Result<()> {
    let system = config.resolve_system(system)?;
    let store = FileCatalogStore::from_config(config);
    let tree = match store.search(&system, query) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
        OutputFormat::Text => print_tree(&tree),
    }
    Ok(())
}

fn print_tree(tree: &CatalogTree) {
    if tree.is_empty() {
        println!("(no modules)");
        return;
    }
    let mut last_release = "";
    for bucket in tree.buckets() {
        if bucket.release != last_release {
            println!("{}", bucket.release);
            last_release = bucket.release;
        }
        println!("  {}", bucket.label);
        for module in bucket.modules {
            match module.description() {
                Some(desc) => println!("    {:<32} {}", module.name(), desc),
                None => println!("    {}", module.name()),
            }
        }
    }
}

fn read_request(path: &std::path::Path) -> Result<ConflictRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read conflict request from {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse conflict request JSON")
}

struct CheckArgs {
    system: Option<String>,
    request: Option<ConflictRequest>,
    coverage: Option<CoveragePolicy>,
    extensions: Option<ExtensionCommandPolicy>,
    format: OutputFormat,
    modules: Vec<ModuleSelector>,
}

fn check(config: &AppConfig, args: CheckArgs) -> Result<()> {
    let requested_system = args
        .system
        .as_deref()
        .or_else(|| args.request.as_ref().and_then(|r| r.system.as_deref()));
    let system = config.resolve_system(requested_system)?;

    let mut options = SessionOptions::from_config(config);
    if let Some(coverage) = args.coverage {
        options.evaluation.suggestions.coverage = coverage;
    }
    if let Some(extensions) = args.extensions {
        options.command.extension_policy = extensions;
    }

    let mut session = SessionController::new(FileCatalogStore::from_config(config), options);
    if let Err(e) = session.select_system(&system) {
        eprintln!("✗ {} (continuing without catalog)", e);
    }

    let modules: Vec<Module> = match &args.request {
        Some(request) => request.validate(&config.classifier())?,
        None => args
            .modules
            .iter()
            .map(|s| s.resolve(session.catalog(), &config.classifier()))
            .collect::<Result<_, _>>()?,
    };
    if modules.is_empty() {
        anyhow::bail!("No modules given");
    }

    for module in modules {
        let name = module.name().to_string();
        if !session.add_module(module)? {
            warn!("Ignoring repeated entry for {}", name);
        }
    }
    let view = session.view();
    info!("Checked {} modules on {}: {}", view.selected.len(), system, view.state);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => print_view(&view),
    }

    if view.conflict {
        std::process::exit(1);
    }
    Ok(())
}

fn print_view(view: &SessionView) {
    if let Some(notice) = &view.notice {
        eprintln!("! {}", notice);
    }

    if !view.conflict {
        println!("✓ Modules can be loaded together");
        if let Some(command) = &view.command {
            println!("{}", command);
        }
        return;
    }

    eprintln!("✗ {}", view.message);
    let Some(suggestions) = &view.suggestions else {
        return;
    };
    if !suggestions.success {
        println!("No alternative combination found in the catalog.");
        return;
    }

    println!("Alternatives:");
    for (release, items) in suggestions.by_release() {
        println!("  {}", release);
        for item in items {
            println!("    [{}] {}", item.compiler, item.load_cmd);
        }
    }
}

fn validate_catalog(config: &AppConfig, path: &std::path::Path) -> Result<()> {
    let (tree, report) = match CatalogTree::load_from_file(path, &config.classifier()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("✗ Failed to load catalog file: {}", e);
            std::process::exit(1);
        }
    };

    if report.rejected.is_empty() {
        println!(
            "✓ Catalog is valid: {} modules in {} releases",
            tree.len(),
            tree.releases().len()
        );
        return Ok(());
    }

    eprintln!(
        "✗ Catalog has {} malformed records ({} modules accepted):",
        report.rejected.len(),
        report.accepted
    );
    for line in &report.rejected {
        eprintln!("  {}", line);
    }
    std::process::exit(1);
}
