use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use field_deps_core::import_field;
use field_deps_resolver::{
    HttpFetcher, ResolverConfig, SchemaLoader, inject_fields_document, load_dependency_manager,
    resolve_external_fields,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "field-deps")]
#[command(about = "Resolve external field references in package field files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve external fields in every field file of a package.
    Resolve(ResolveArgs),
    /// Resolve external fields in individual field files.
    Inject(InjectArgs),
    /// Print the definition of a single field from a dependency schema.
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
struct ResolverArgs {
    /// Resolver configuration file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root directory of the schema cache.
    #[arg(long, env = "FIELD_DEPS_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
    /// ECS schema URL template with {reference} and {file} placeholders.
    #[arg(long, env = "FIELD_DEPS_SCHEMA_URL")]
    schema_url: Option<String>,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Package root containing _dev/build/build.yml.
    #[arg(long)]
    package: PathBuf,
    /// Directory whose field files are rewritten (default: the package root).
    #[arg(long)]
    build_dir: Option<PathBuf>,
    #[command(flatten)]
    resolver: ResolverArgs,
}

#[derive(Debug, Args)]
struct InjectArgs {
    /// Package root containing _dev/build/build.yml.
    #[arg(long)]
    package: PathBuf,
    /// Field files to resolve.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Write results to this directory instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    resolver: ResolverArgs,
}

#[derive(Debug, Args)]
struct LookupArgs {
    /// Package root containing _dev/build/build.yml.
    #[arg(long)]
    package: PathBuf,
    /// Schema name (e.g. ecs).
    schema: String,
    /// Dotted field path (e.g. event.outcome).
    path: String,
    #[command(flatten)]
    resolver: ResolverArgs,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Resolve(args) => run_resolve(args),
        Command::Inject(args) => run_inject(args),
        Command::Lookup(args) => run_lookup(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; FIELD_DEPS_LOG_FORMAT=json switches to JSON lines.
fn init_tracing() {
    let log_format = std::env::var("FIELD_DEPS_LOG_FORMAT").unwrap_or_default();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "field_deps=info,field_deps_resolver=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let loader = build_loader(&args.resolver)?;
    let build_dir = args.build_dir.unwrap_or_else(|| args.package.clone());

    let report =
        resolve_external_fields(&args.package, &build_dir, &loader).map_err(|e| e.to_string())?;

    for path in &report.injected {
        println!("{}", path.display());
    }
    eprintln!(
        "Resolved external fields: {} of {} field files updated",
        report.injected.len(),
        report.scanned.len()
    );
    Ok(())
}

fn run_inject(args: InjectArgs) -> Result<(), String> {
    let loader = build_loader(&args.resolver)?;
    let dm = load_dependency_manager(&args.package, &loader).map_err(|e| e.to_string())?;

    if let Some(output) = &args.output {
        check_output_names(&args.inputs)?;
        fs::create_dir_all(output)
            .map_err(|e| format!("Failed to create '{}': {e}", output.display()))?;
    }

    for (idx, input) in args.inputs.iter().enumerate() {
        let content =
            fs::read(input).map_err(|e| format!("Failed to read '{}': {e}", input.display()))?;
        let (document, _) = inject_fields_document(dm.as_ref(), &content)
            .map_err(|e| format!("{}: {e}", input.display()))?;

        match &args.output {
            Some(output) => {
                let file_name = input
                    .file_name()
                    .ok_or_else(|| format!("Invalid input path '{}'", input.display()))?;
                let target = output.join(file_name);
                fs::write(&target, document)
                    .map_err(|e| format!("Failed to write '{}': {e}", target.display()))?;
            }
            None => {
                if idx > 0 {
                    println!("---");
                }
                print!("{document}");
            }
        }
    }
    Ok(())
}

/// Inputs are written flat into the output directory, so file names must
/// be unique.
fn check_output_names(inputs: &[PathBuf]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for input in inputs {
        let file_name = input
            .file_name()
            .ok_or_else(|| format!("Invalid input path '{}'", input.display()))?;
        if !seen.insert(file_name) {
            return Err(format!(
                "Duplicate output file name '{}' (from '{}')",
                file_name.to_string_lossy(),
                input.display()
            ));
        }
    }
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<(), String> {
    let loader = build_loader(&args.resolver)?;
    let dm = load_dependency_manager(&args.package, &loader).map_err(|e| e.to_string())?;

    let definition =
        import_field(dm.as_ref(), &args.schema, &args.path).map_err(|e| e.to_string())?;
    let yaml =
        serde_yaml::to_string(&definition).map_err(|e| format!("YAML serialization failed: {e}"))?;
    print!("{yaml}");
    Ok(())
}

fn build_loader(args: &ResolverArgs) -> Result<SchemaLoader<HttpFetcher>, String> {
    let mut config = match &args.config {
        Some(path) => ResolverConfig::load(path).map_err(|e| e.to_string())?,
        None => ResolverConfig::default(),
    };
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(schema_url) = &args.schema_url {
        config.ecs_schema_url = schema_url.clone();
    }
    tracing::debug!(cache_dir = %config.cache_dir.display(), "Using schema cache");
    Ok(SchemaLoader::new(config, HttpFetcher::new()))
}
