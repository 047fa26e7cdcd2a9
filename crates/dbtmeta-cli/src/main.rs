use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dbtmeta_catalog::{CatalogSnapshot, InMemoryCatalog};
use dbtmeta_core::{Config, DataModel, EntityKind, RunReport, SERVICE_NAME_ENV};
use dbtmeta_engine::{EmittedRequests, IngestionContext, IngestionRun, LoadedArtifacts};

const DEFAULT_CONFIG: &str = "dbtmeta.toml";

/// dbtmeta - dbt artifact ingestion for metadata catalogs
#[derive(Parser)]
#[command(name = "dbtmeta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbtmeta.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every ingestion stage against a catalog snapshot
    Ingest {
        /// Catalog snapshot to ingest into (starts empty when omitted)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Write the catalog back to the snapshot file afterwards
        #[arg(long, requires = "snapshot")]
        update_snapshot: bool,

        /// Output file for emitted requests
        #[arg(short, long, default_value = "requests.json")]
        output: PathBuf,

        /// Output file for the run report
        #[arg(short, long, default_value = "report.json")]
        report: PathBuf,
    },

    /// Print the data models resolved from the dbt artifacts
    Models {
        /// Catalog snapshot used for owner lookups
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
}

/// Contents of the requests output file
#[derive(Serialize)]
struct IngestOutput<'a> {
    data_models: &'a BTreeMap<String, DataModel>,

    #[serde(flatten)]
    requests: EmittedRequests,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = load_config(cli.config.as_deref())?
        .with_service_override(std::env::var(SERVICE_NAME_ENV).ok());

    info!(service = %config.service_name, "Configuration loaded");

    match cli.command {
        Commands::Ingest {
            snapshot,
            update_snapshot,
            output,
            report,
        } => ingest_command(&config, snapshot.as_deref(), update_snapshot, &output, &report),
        Commands::Models { snapshot } => models_command(&config, snapshot.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()));
    }

    let default = Path::new(DEFAULT_CONFIG);
    if default.exists() {
        return Ok(Config::from_file(default)?);
    }

    info!("No config file found, using defaults");
    Ok(Config::default())
}

fn load_catalog(snapshot: Option<&Path>) -> Result<InMemoryCatalog> {
    let Some(path) = snapshot else {
        return Ok(InMemoryCatalog::new());
    };

    info!(path = %path.display(), "Loading catalog snapshot");
    let snapshot = CatalogSnapshot::from_file(path)
        .with_context(|| format!("Failed to load catalog snapshot {}", path.display()))?;
    Ok(InMemoryCatalog::from_snapshot(&snapshot))
}

/// Ingest command - run all stages and write requests and report
fn ingest_command(
    config: &Config,
    snapshot: Option<&Path>,
    update_snapshot: bool,
    output: &Path,
    report_path: &Path,
) -> Result<()> {
    let catalog = load_catalog(snapshot)?;
    let ctx = IngestionContext::new(&config.service_name, &catalog, &catalog);
    let mut report = RunReport::new(config.service_name.clone());

    info!("Loading dbt artifacts");
    let Some(run) = IngestionRun::prepare(ctx, config, LoadedArtifacts::from_config(config)) else {
        warn!("dbt ingestion skipped: no [dbt] section or artifacts could not be loaded");
        report.save_to_file(report_path)?;
        return Ok(());
    };

    // Data models are persisted by registering the tables they describe
    for fqn in run.data_models().keys() {
        catalog.add_entity(EntityKind::Table, fqn.clone());
        catalog.add_entity(EntityKind::DataModel, fqn.clone());
    }

    let requests = run.execute(&catalog, &mut report);

    let ingest_output = IngestOutput {
        data_models: run.data_models(),
        requests,
    };
    std::fs::write(output, serde_json::to_string_pretty(&ingest_output)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    report.save_to_file(report_path)?;

    info!(path = %output.display(), "Requests saved");
    info!(path = %report_path.display(), "Report saved");

    if let (true, Some(path)) = (update_snapshot, snapshot) {
        catalog.snapshot().save_to_file(path)?;
        info!(path = %path.display(), "Snapshot updated");
    }

    print_report_summary(&report);
    Ok(())
}

/// Models command - print resolved data models
fn models_command(config: &Config, snapshot: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(snapshot)?;
    let ctx = IngestionContext::new(&config.service_name, &catalog, &catalog);

    let Some(run) = IngestionRun::prepare(ctx, config, LoadedArtifacts::from_config(config)) else {
        return Err(anyhow::anyhow!(
            "No data models: configure a [dbt] section in {} and run 'dbt docs generate' first",
            DEFAULT_CONFIG
        ));
    };

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "dbt Data Models".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for (fqn, model) in run.data_models() {
        println!("{} {}", "Model:".bold(), fqn.green());
        println!("  Columns:  {}", model.columns.len());
        if model.upstream.is_empty() {
            println!("  Upstream: {}", "none".dimmed());
        } else {
            println!("  Upstream:");
            for upstream in &model.upstream {
                println!("    - {}", upstream);
            }
        }
        match &model.owner {
            Some(owner) => println!("  Owner:    {} ({})", owner.id, owner.entity_type),
            None => println!("  Owner:    {}", "none".dimmed()),
        }
        println!();
    }

    println!(
        "{} data models, {} tests",
        run.data_models().len(),
        run.test_nodes().len()
    );

    let skipped = run.preparation_failures().count();
    if skipped > 0 {
        println!("{}", format!("{} entities skipped, rerun with --verbose for details", skipped).yellow());
    }

    Ok(())
}

fn print_report_summary(report: &RunReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "dbt Ingestion Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Generated: {}", report.generated_at);
    println!("Service: {}", report.service_name);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Data models:      {}", summary.data_models);
    println!("  Lineage edges:    {}", summary.lineage_edges);
    println!("  Test suites:      {}", summary.test_suites);
    println!("  Test definitions: {}", summary.test_definitions);
    println!("  Test cases:       {}", summary.test_cases);
    println!("  Test results:     {}", summary.test_results);

    if summary.failures > 0 {
        println!("  Skipped:          {}", summary.failures.to_string().yellow());
    } else {
        println!("  Skipped:          {}", summary.failures.to_string().green());
    }
    println!();

    if report.is_complete() {
        println!("{}", "✓ Everything ingested".green().bold());
        return;
    }

    println!("{}", "Skipped entities:".bold());
    for failure in &report.failures {
        println!(
            "  [{}] {} {}: {}",
            failure.kind.as_str().yellow(),
            failure.stage,
            failure.subject,
            failure.message
        );
    }
}
