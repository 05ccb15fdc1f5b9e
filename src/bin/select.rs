//! Model selection runner.
//!
//! Optionally validates an ingested CSV against its schema document,
//! extracts a numeric training set, runs the configured model-selection
//! pipeline, and prints the winning model.
//!
//! Usage:
//!   cargo run --bin select -- --config model.toml --data train.csv --target label
//!   cargo run --bin select -- --config model.toml --schema schema.toml \
//!       --data train.csv --target label --floor 0.6 --workers 4 --json

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use modelfoundry::{ExecutionOptions, ModelFactory, ParamValue, SchemaValidator, Table};

/// Configuration-driven model selection over a tabular training set.
#[derive(Parser)]
#[command(name = "select")]
struct Args {
    /// Model-selection config document (TOML).
    #[arg(long)]
    config: PathBuf,

    /// Training data CSV.
    #[arg(long)]
    data: PathBuf,

    /// Target column name in the training data.
    #[arg(long)]
    target: String,

    /// Schema document to validate the data file against before training.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Minimum acceptable cross-validated score.
    #[arg(long, default_value = "0.6")]
    floor: f64,

    /// Worker threads for candidate searches (1 = sequential).
    #[arg(long, default_value = "1")]
    workers: usize,

    /// Per-candidate timeout in seconds. Unset waits indefinitely.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// Serializable summary of a finished selection run.
#[derive(serde::Serialize)]
struct SelectionReport {
    started_at: chrono::DateTime<chrono::Utc>,
    elapsed_secs: f64,
    serial: String,
    model: String,
    best_params: BTreeMap<String, ParamValue>,
    best_score: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Some(schema_path) = &args.schema {
        let validator = SchemaValidator::from_path(schema_path)
            .with_context(|| format!("loading schema {}", schema_path.display()))?;
        validator
            .validate(&args.data)
            .with_context(|| format!("validating {}", args.data.display()))?;
    }

    let table = Table::load_csv(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;
    let (features, target) = table
        .to_features_target(&args.target, &args.data)
        .context("extracting training data")?;

    let factory =
        ModelFactory::from_path(&args.config).context("loading model-selection config")?;

    let mut options = ExecutionOptions::sequential().with_workers(args.workers);
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let started_at = chrono::Utc::now();
    let start = Instant::now();
    let best = factory
        .best_model(&features, &target, args.floor, options)
        .context("model selection")?;

    let report = SelectionReport {
        started_at,
        elapsed_secs: start.elapsed().as_secs_f64(),
        serial: best.serial.clone(),
        model: best.best_model.name().to_string(),
        best_params: best.best_params.clone(),
        best_score: best.best_score,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Best candidate: {} ({})", report.serial, report.model);
        println!("Score:          {:.4}", report.best_score);
        println!("Parameters:");
        for (name, value) in &report.best_params {
            println!("  {name} = {value}");
        }
        println!("Elapsed:        {:.2}s", report.elapsed_secs);
    }

    Ok(())
}
