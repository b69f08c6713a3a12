mod display;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use riskscope_core::discovery::{self, DiscoveredFiles};
use riskscope_core::extractor;
use riskscope_core::secrets::{self, DetectedSecret, ScanMetadata};
use riskscope_core::supply_chain::depsdev::DepsDevClient;
use riskscope_core::vuln::osv::OsvClient;
use riskscope_core::{
    Dependency, GraphBuilder, Resolver, RiskScopeConfig, ScanReport, ScanSession,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "riskscope",
    version,
    about = "RiskScope — Repository Security Risk Analyzer",
    long_about = "Scan a repository for hardcoded secrets, known-vulnerable dependencies, and supply-chain exposure, condensed into a single 0-100 risk score."
)]
struct Cli {
    /// Path to a config file (defaults to riskscope.toml in the scanned repo)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis: secrets, dependency vulnerabilities, aggregate score
    Scan {
        /// Repository root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Skip external vulnerability lookups
        #[arg(long)]
        offline: bool,
    },

    /// Scan file contents for hardcoded secrets only
    Secrets {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List dependencies parsed from recognized manifests
    Deps {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Expand the transitive dependency graph and print its shape
    Graph {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Override the expansion depth cap
        #[arg(long)]
        max_depth: Option<usize>,

        /// Also resolve vulnerabilities and annotate graph nodes
        #[arg(long)]
        annotate: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("riskscope=warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Scan {
            path,
            format,
            offline,
        } => cmd_scan(&path, &format, offline, config_path).await,
        Commands::Secrets { path, format } => cmd_secrets(&path, &format),
        Commands::Deps { path, format } => cmd_deps(&path, &format),
        Commands::Graph {
            path,
            format,
            max_depth,
            annotate,
        } => cmd_graph(&path, &format, max_depth, annotate, config_path).await,
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "riskscope",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

async fn cmd_scan(
    path: &Path,
    format: &str,
    offline: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = RiskScopeConfig::load(path, config_path)?;
    let found = discovery::discover(path)?;
    let dependencies = parse_manifests(path, &found);
    tracing::info!(
        "scanning {}: {} manifests, {} content files, {} dependencies",
        path.display(),
        found.manifests.len(),
        found.content_files.len(),
        dependencies.len()
    );

    let mut session = ScanSession::new(config.aggregate_weights.clone());
    session.record_secrets(scan_content_files(path, &found));

    if !offline && !dependencies.is_empty() {
        let resolver = Resolver::new(OsvClient::new()?)
            .with_options(config.resolver_options())
            .with_weights(config.risk_weights.clone());
        session.record_resolution(resolver.batch_resolve(&dependencies).await);
    }

    let report = ScanReport::from_session(
        repo_label(path),
        found.manifests.len(),
        dependencies.len(),
        &session,
    );

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => display::print_scan_report(&report, offline),
    }
    Ok(())
}

fn cmd_secrets(path: &Path, format: &str) -> Result<()> {
    let found = discovery::discover(path)?;
    let secrets = scan_content_files(path, &found);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&secrets)?),
        _ => display::print_secrets(&secrets, found.content_files.len()),
    }
    Ok(())
}

fn cmd_deps(path: &Path, format: &str) -> Result<()> {
    let found = discovery::discover(path)?;
    if found.manifests.is_empty() {
        anyhow::bail!(
            "No dependency manifests found at '{}'. \
            Supported: package.json, requirements*.txt, go.mod, Cargo.toml, Gemfile, pom.xml.",
            path.display()
        );
    }
    let dependencies = parse_manifests(path, &found);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&dependencies)?),
        _ => display::print_dependencies(&dependencies, found.manifests.len()),
    }
    Ok(())
}

async fn cmd_graph(
    path: &Path,
    format: &str,
    max_depth: Option<usize>,
    annotate: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = RiskScopeConfig::load(path, config_path)?;
    let found = discovery::discover(path)?;
    let dependencies = parse_manifests(path, &found);
    if dependencies.is_empty() {
        anyhow::bail!("No dependencies found at '{}'", path.display());
    }

    let mut options = config.graph_options();
    if let Some(depth) = max_depth {
        options.max_depth = depth;
    }
    let metadata = DepsDevClient::new()?.with_cache(
        config.graph.cache_capacity,
        Duration::from_secs(config.graph.cache_ttl_secs),
    );
    let builder = GraphBuilder::new(metadata).with_options(options);
    let graph = builder.build(&repo_label(path), &dependencies).await;

    let mut session = ScanSession::new(config.aggregate_weights.clone());
    session.attach_graph(graph);
    if annotate {
        let resolver = Resolver::new(OsvClient::new()?)
            .with_options(config.resolver_options())
            .with_weights(config.risk_weights.clone());
        session.record_resolution(resolver.batch_resolve(&dependencies).await);
        session.annotate_graph();
    }

    let graph = session
        .graph()
        .context("graph expansion produced no result")?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&graph.snapshot())?),
        _ => display::print_graph(graph),
    }
    Ok(())
}

/// Parse every discovered manifest, tolerating unreadable or malformed
/// files: each degrades to zero dependencies.
fn parse_manifests(root: &Path, found: &DiscoveredFiles) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    for manifest in &found.manifests {
        let Ok(content) = std::fs::read_to_string(manifest) else {
            continue;
        };
        let name = relative_label(root, manifest);
        if let Some(parsed) = extractor::extract(&name, &content) {
            dependencies.extend(parsed.dependencies);
        }
    }
    dependencies
}

/// Scan every discovered content file for secrets.
fn scan_content_files(root: &Path, found: &DiscoveredFiles) -> Vec<DetectedSecret> {
    let mut secrets = Vec::new();
    for file in &found.content_files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue; // binary or unreadable, nothing to match
        };
        let metadata = ScanMetadata {
            file: relative_label(root, file),
            commit: "working-tree".to_string(),
            author: String::new(),
            date: String::new(),
        };
        secrets.extend(secrets::scan(&content, &metadata));
    }
    secrets
}

fn relative_label(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .to_string()
}

fn repo_label(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}
