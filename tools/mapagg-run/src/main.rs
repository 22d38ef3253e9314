//! MapAggregate Run - execute a manifest against a resource
//!
//! # Usage
//!
//! ```bash
//! # Run a manifest against a resource file
//! mapagg-run ./long_meetings.mf ./events.json
//!
//! # Wrap a raw API response, reading it from stdin, and print stage timing
//! curl -s "$EVENTS_URL" | mapagg-run ./long_meetings.mf --items-key items --benchmark
//!
//! # Show every registered node type and its parameters
//! mapagg-run --list-nodes
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use mapagg_core::{nodes::default_registry, BenchmarkResult, GraphLoader, Resource, RuntimeConfig};
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// MapAggregate Run - parse a manifest and run a resource through it
#[derive(Parser)]
#[command(name = "mapagg-run")]
#[command(author, version)]
#[command(about = "Run a MapAggregate pipeline manifest against a JSON resource")]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List registered node types and exit
    #[arg(long)]
    list_nodes: bool,

    /// Print per-stage timing to stderr
    #[arg(short, long)]
    benchmark: bool,

    /// Resource type for raw input (default: from config)
    #[arg(long)]
    resource_type: Option<String>,

    /// Treat the input as a raw object and take records from this key
    #[arg(long)]
    items_key: Option<String>,

    /// Path to the pipeline manifest
    #[arg(required_unless_present = "list_nodes")]
    manifest: Option<PathBuf>,

    /// Path to the input JSON (stdin when omitted)
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = RuntimeConfig::load(args.config.as_ref()).context("Failed to load configuration")?;
    init_logging(args.verbose, args.config.is_some(), &config);

    if args.list_nodes {
        return list_nodes();
    }

    let manifest_path = args.manifest.context("A manifest path is required")?;
    let manifest = tokio::fs::read_to_string(&manifest_path)
        .await
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let graph = GraphLoader::new(default_registry())
        .parse(&manifest)
        .with_context(|| format!("Failed to parse manifest {}", manifest_path.display()))?;
    tracing::info!("Loaded {}", graph);

    let input = read_input(args.input.as_ref()).await?;
    let resource = match &args.items_key {
        Some(items_key) => {
            let raw: Value = serde_json::from_str(&input).context("Input is not valid JSON")?;
            let resource_type = args
                .resource_type
                .as_deref()
                .unwrap_or(&config.default_resource_type);
            Resource::from_raw_json(raw, resource_type, items_key)
                .context("Failed to wrap raw input as a resource")?
        }
        None => Resource::from_json_str(&input).context("Input is not a resource object")?,
    };

    let run = graph
        .benchmark(resource)
        .await
        .with_context(|| format!("Pipeline '{}' failed", graph.title()))?;

    if args.benchmark || config.benchmark {
        print_performance(&run);
    }
    println!("{}", serde_json::to_string_pretty(&run.result)?);

    Ok(())
}

fn init_logging(verbose: u8, configured: bool, config: &RuntimeConfig) {
    let filter = match verbose {
        0 if configured => config.log_filter.as_str(),
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if config.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

async fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input {}", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read input from stdin")?;
            Ok(input)
        }
    }
}

fn list_nodes() -> Result<()> {
    for registration in default_registry().registrations() {
        println!("{} - {}", registration.type_name, registration.description);
        println!("{}", serde_json::to_string_pretty(&registration.schema)?);
        println!();
    }
    Ok(())
}

fn print_performance(run: &BenchmarkResult) {
    eprintln!("{:<24} {:>12} {:>10}", "stage", "ms", "records in");
    for stage in &run.performance {
        eprintln!(
            "{:<24} {:>12.3} {:>10}",
            stage.node_name,
            stage.duration.as_secs_f64() * 1000.0,
            stage.records_processed_on_entry
        );
    }
    eprintln!(
        "{:<24} {:>12.3} {:>10}",
        "total",
        run.total_duration().as_secs_f64() * 1000.0,
        run.result.record_count()
    );
}
