use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use provchain_core::{
    config::ProvConfig,
    entry::{Stage, SupplyChainEntry, TestResults},
    ledger::{self, Ledger},
    scoring, util, validator,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "provchain",
    version = util::VERSION,
    about = "Append-only provenance ledger with proof-of-work sealing"
)]
struct Cli {
    /// Path to the ledger snapshot (JSON).
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new ledger snapshot with only a genesis block.
    Init {
        /// Proof-of-work difficulty override.
        #[arg(long)]
        difficulty: Option<u32>,
    },

    /// Append one provenance event and reseal the snapshot.
    Append {
        #[arg(long)]
        product: String,
        #[arg(long)]
        batch: String,
        /// One of: raw_materials, manufacturing, quality_testing,
        /// packaging, distribution, retail.
        #[arg(long)]
        stage: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        verified_by: String,
        #[arg(long, value_delimiter = ',')]
        certifications: Vec<String>,
        /// Record a full set of passing test results on this entry.
        #[arg(long)]
        tests_passed: bool,
        /// RFC 3339 event time; defaults to now.
        #[arg(long)]
        event_time: Option<String>,
    },

    /// Append the five canonical pre-retail stages for a batch.
    Workflow {
        #[arg(long)]
        product: String,
        #[arg(long)]
        batch: String,
        #[arg(long, value_delimiter = ',')]
        certifications: Vec<String>,
    },

    /// Print all entries for a product, ordered by event time.
    ProductHistory {
        #[arg(long)]
        product: String,
    },

    /// Print all entries for a batch, ordered by event time.
    BatchHistory {
        #[arg(long)]
        batch: String,
    },

    /// Score a batch's authenticity.
    Verify {
        #[arg(long)]
        product: String,
        #[arg(long)]
        batch: String,
    },

    /// Re-validate the full hash chain.
    Validate,

    /// Print ledger summary counters.
    Stats,

    /// Write the ledger snapshot to another path.
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Adopt an existing snapshot as the current ledger.
    Import {
        #[arg(long)]
        json: PathBuf,
    },

    /// Print version information.
    Version,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration.
    let mut cfg = ProvConfig::load(cli.config.as_deref()).context("load config")?;
    cfg.apply_env();

    init_logging(&cfg.logging);

    let snapshot_path = cli.snapshot.unwrap_or(cfg.paths.snapshot.clone());

    match cli.cmd {
        Commands::Init { difficulty } => {
            anyhow::ensure!(
                !snapshot_path.exists(),
                "snapshot {} already exists -- will not overwrite",
                snapshot_path.display()
            );
            let difficulty = difficulty.unwrap_or(cfg.mining.difficulty);
            let ledger = Ledger::with_difficulty(difficulty).context("create ledger")?;
            ledger::export_snapshot_json(&ledger, &snapshot_path).context("write snapshot")?;
            info!(ledger_id = %ledger.meta().ledger_id, "ledger initialized");
        }

        Commands::Append {
            product,
            batch,
            stage,
            location,
            verified_by,
            certifications,
            tests_passed,
            event_time,
        } => {
            let stage: Stage = stage.parse().context("parse stage")?;
            let mut ledger = open_or_create(&snapshot_path, cfg.mining.difficulty)?;

            let mut entry = SupplyChainEntry::new(&product, &batch, stage, location, verified_by);
            entry.certifications = certifications.into_iter().collect();
            if tests_passed {
                entry.test_results = Some(TestResults::all_passed());
            }
            if let Some(ts) = event_time {
                entry.timestamp = ts;
            }

            let hash = ledger.append(entry).context("append entry")?;
            ledger::export_snapshot_json(&ledger, &snapshot_path).context("write snapshot")?;
            println!("{hash}");
        }

        Commands::Workflow {
            product,
            batch,
            certifications,
        } => {
            let mut ledger = open_or_create(&snapshot_path, cfg.mining.difficulty)?;
            let hashes = ledger
                .append_batch_workflow(&product, &batch, &certifications)
                .context("append batch workflow")?;
            ledger::export_snapshot_json(&ledger, &snapshot_path).context("write snapshot")?;
            for hash in hashes {
                println!("{hash}");
            }
        }

        Commands::ProductHistory { product } => {
            let ledger = open_existing(&snapshot_path)?;
            let history = ledger.product_history(&product);
            println!("{}", serde_json::to_string_pretty(&history)?);
        }

        Commands::BatchHistory { batch } => {
            let ledger = open_existing(&snapshot_path)?;
            let history = ledger.batch_history(&batch);
            println!("{}", serde_json::to_string_pretty(&history)?);
        }

        Commands::Verify { product, batch } => {
            let ledger = open_existing(&snapshot_path)?;
            let report = scoring::verify(&ledger, &product, &batch);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_authentic {
                std::process::exit(1);
            }
        }

        Commands::Validate => {
            let ledger = open_existing(&snapshot_path)?;
            let report = validator::validate(ledger.blocks());
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            let ledger = open_existing(&snapshot_path)?;
            let stats = ledger.stats().context("compute stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Export { out } => {
            let ledger = open_existing(&snapshot_path)?;
            ledger::export_snapshot_json(&ledger, &out).context("export snapshot")?;
            info!(out = %out.display(), "snapshot exported");
        }

        Commands::Import { json } => {
            anyhow::ensure!(
                !snapshot_path.exists(),
                "snapshot {} already exists -- will not overwrite",
                snapshot_path.display()
            );
            let imported = ledger::import_snapshot_json(&json).context("import snapshot")?;
            ledger::export_snapshot_json(&imported, &snapshot_path)
                .context("write snapshot")?;
            info!(
                ledger_id = %imported.meta().ledger_id,
                "ledger imported to {}",
                snapshot_path.display()
            );
        }

        Commands::Version => {
            println!("{}", util::version_string());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_existing(snapshot_path: &std::path::Path) -> Result<Ledger> {
    ledger::import_snapshot_json(snapshot_path).with_context(|| {
        format!(
            "open ledger snapshot {} (run `provchain init` first?)",
            snapshot_path.display()
        )
    })
}

fn open_or_create(snapshot_path: &std::path::Path, difficulty: u32) -> Result<Ledger> {
    if snapshot_path.exists() {
        open_existing(snapshot_path)
    } else {
        Ledger::with_difficulty(difficulty).context("create ledger")
    }
}

fn init_logging(cfg: &provchain_core::config::LoggingConfig) {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.level));

    let registry = tracing_subscriber::registry().with(filter);

    if cfg.json_stdout {
        // JSON output to stdout for container / SIEM pipelines.
        let json_layer = tracing_subscriber::fmt::layer().json();
        registry.with(json_layer).init();
    } else if !cfg.json_log_file.is_empty() {
        // JSON-lines output to file for SIEM integration.
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.json_log_file)
            .expect("failed to open json log file");
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::sync::Mutex::new(log_file));
        let console_layer = tracing_subscriber::fmt::layer();
        registry.with(file_layer).with(console_layer).init();
    } else {
        // Default: human-readable output to stderr.
        let console_layer = tracing_subscriber::fmt::layer();
        registry.with(console_layer).init();
    }
}
