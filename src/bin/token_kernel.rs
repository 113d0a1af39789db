//! Token Kernel CLI
//!
//! Reads a batch file, aggregates its candidates, applies declared edges and
//! roles, and writes one export or the library statistics.
//!
//! ## Batch file
//!
//! ```json
//! {
//!   "batch_id": "8a5c…",          // optional
//!   "policy": { … },              // optional, AggregationPolicy
//!   "candidates": [ … ],          // RawCandidate feed
//!   "edges": [ { "from": "color-0002", "to": "color-0001", "kind": "alias" } ],
//!   "roles": { "color-0001": "primary" }
//! }
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `TOKEN_KERNEL_THRESHOLD`: default merge threshold when the batch has no policy
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin token_kernel --features cli -- render batch.json --format css
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use design_token_kernel::{
    Aggregation, AggregationPolicy, Aggregator, BatchId, Edge, ExportFormat, RawCandidate, TokenId,
};

#[derive(Parser)]
#[command(name = "token_kernel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate extracted design token candidates and export the library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a batch and render one export format
    Render {
        /// Batch file (JSON)
        #[arg(value_name = "FILE")]
        batch: PathBuf,

        /// interchange | css | ts | report
        #[arg(short, long, default_value = "interchange", value_parser = parse_format)]
        format: ExportFormat,

        /// Override the merge threshold for every category
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Prefix for CSS custom properties
        #[arg(long, default_value = "")]
        css_prefix: String,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Aggregate a batch and print statistics and the aggregation report as JSON
    Stats {
        /// Batch file (JSON)
        #[arg(value_name = "FILE")]
        batch: PathBuf,

        /// Override the merge threshold for every category
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Representatives per category (default: the policy's setting)
        #[arg(long)]
        top: Option<usize>,
    },
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_str(s).ok_or_else(|| format!("unknown format: {s}"))
}

#[derive(Deserialize)]
struct BatchFile {
    #[serde(default)]
    batch_id: Option<Uuid>,
    #[serde(default)]
    policy: Option<AggregationPolicy>,
    candidates: Vec<RawCandidate>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    roles: BTreeMap<TokenId, String>,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "token_kernel=info,design_token_kernel=info".into());

    // Logs go to stderr so stdout carries only the export.
    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    }
}

/// Load a batch, aggregate it, and apply its edges and roles.
fn build_library(path: &Path, threshold: Option<f64>) -> Result<Aggregation, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let batch: BatchFile = serde_json::from_str(&raw)?;

    let mut policy = batch.policy.unwrap_or_else(AggregationPolicy::from_env);
    if let Some(threshold) = threshold {
        policy.threshold = threshold;
        policy.category_thresholds.clear();
    }

    let mut aggregator = Aggregator::with_policy(policy);
    if let Some(uuid) = batch.batch_id {
        aggregator = aggregator.with_batch_id(BatchId::new(uuid));
    }
    let mut aggregation = aggregator.aggregate(&batch.candidates)?;
    let library = &mut aggregation.library;

    for edge in batch.edges {
        let (from, to, kind) = (edge.from.clone(), edge.to.clone(), edge.kind);
        if let Err(e) = library.insert_edge(edge) {
            warn!(from = %from, to = %to, kind = %kind, error = %e, "edge rejected");
        }
    }
    for (id, role) in &batch.roles {
        if let Err(e) = library.assign_role(id, role) {
            warn!(token = %id, role = %role, error = %e, "role rejected");
        }
    }

    Ok(aggregation)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            batch,
            format,
            threshold,
            css_prefix,
            output,
        } => {
            let aggregation = build_library(&batch, threshold)?;
            let options = aggregation.export_options().with_css_prefix(css_prefix);
            let bytes = design_token_kernel::render_with(&aggregation.library, format, &options)?;
            match output {
                Some(path) => {
                    fs::write(&path, &bytes)?;
                    info!(path = %path.display(), format = %format, bytes = bytes.len(), "export written");
                }
                None => io::stdout().write_all(&bytes)?,
            }
        }
        Commands::Stats { batch, threshold, top } => {
            let aggregation = build_library(&batch, threshold)?;
            let stats = match top {
                Some(top) => aggregation.library.stats(top),
                None => aggregation.stats(),
            };
            let out = serde_json::json!({
                "report": aggregation.report,
                "stats": stats,
            });
            let mut text = serde_json::to_string_pretty(&out)?;
            text.push('\n');
            io::stdout().write_all(text.as_bytes())?;
        }
    }

    Ok(())
}
