//! Upcycle daemon - material-combination project generator.
//!
//! Reads the material inventory, enumerates and scores combinations, and
//! grows the project catalog through the batched enrichment pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use upcycle_common::{Config, RunSummary};
use upcycled::catalog::{MaterialCatalog, ProjectCatalog, SqliteCatalog};
use upcycled::oracle::HttpOracle;
use upcycled::scheduler::{self, CancellationFlag};

#[derive(Parser)]
#[command(name = "upcycled")]
#[command(about = "Upcycle - material-combination project generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults to the standard locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one generation pass over the available inventory
    Generate {
        /// Largest subset size to enumerate (1-7)
        #[arg(long)]
        max_size: Option<usize>,

        /// Total subsets the enumerator may emit
        #[arg(long)]
        cap: Option<u64>,

        /// Concurrent oracle calls per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Delay between batches in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Skip the oracle entirely and build fallback drafts
        #[arg(long)]
        offline: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or seed the material inventory
    Materials {
        #[command(subcommand)]
        action: MaterialsAction,
    },

    /// List generated projects
    Projects,
}

#[derive(Subcommand)]
enum MaterialsAction {
    /// Show available materials
    List,

    /// Load the starter inventory (idempotent)
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Generate {
            max_size,
            cap,
            batch_size,
            delay_ms,
            offline,
            json,
        } => generate(config, max_size, cap, batch_size, delay_ms, offline, json).await,
        Commands::Materials { action } => match action {
            MaterialsAction::List => materials_list(&config),
            MaterialsAction::Seed => materials_seed(&config),
        },
        Commands::Projects => projects_list(&config),
    }
}

async fn generate(
    mut config: Config,
    max_size: Option<usize>,
    cap: Option<u64>,
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    offline: bool,
    json: bool,
) -> Result<()> {
    if let Some(max_size) = max_size {
        config.generator.max_subset_size = max_size;
    }
    if let Some(cap) = cap {
        config.generator.combination_cap = cap;
    }
    if let Some(batch_size) = batch_size {
        config.generator.batch_size = batch_size;
    }
    if let Some(delay_ms) = delay_ms {
        config.generator.inter_batch_delay_ms = delay_ms;
    }
    if offline {
        config.oracle.enabled = false;
    }
    let config = config.normalized();

    let catalog = Arc::new(SqliteCatalog::open(&config.storage.db_path)?);
    let materials = catalog.list_available()?;
    if materials.is_empty() {
        warn!("Inventory is empty; run `upcycled materials seed` first");
        return Ok(());
    }
    info!("Loaded {} available materials", materials.len());

    let oracle = Arc::new(HttpOracle::new(config.oracle.clone())?);

    let cancel = CancellationFlag::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing the current batch");
            cancel_on_signal.cancel();
        }
    });

    let summary =
        scheduler::run_generation(&materials, oracle, catalog, &config, cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Generation run finished:");
    println!("  planned    {}", summary.planned);
    println!("  processed  {}", summary.processed);
    println!("  inserted   {}", summary.inserted);
    println!("  fallbacks  {}", summary.fallbacks);
    println!("  skipped    {}", summary.skipped);
    println!("  elapsed    {:.1}s", summary.elapsed_seconds);
    if summary.aborted {
        println!("  aborted early after repeated storage failures");
    }
}

fn materials_list(config: &Config) -> Result<()> {
    let Some(catalog) = SqliteCatalog::open_readonly(&config.storage.db_path) else {
        println!("No catalog database at {}", config.storage.db_path);
        return Ok(());
    };
    let materials = catalog.list_available()?;
    if materials.is_empty() {
        println!("Inventory is empty; run `upcycled materials seed` to load the starter set");
        return Ok(());
    }
    for m in &materials {
        println!(
            "{:<24} {:<10} {:>7.1} {:<8} condition {:<9} recycle {:>3} sustainability {:>3}",
            m.name,
            m.material_type,
            m.available_quantity,
            m.unit,
            m.condition,
            m.recycle_potential,
            m.sustainability_score
        );
    }
    Ok(())
}

fn materials_seed(config: &Config) -> Result<()> {
    let catalog = SqliteCatalog::open(&config.storage.db_path)?;
    let added = catalog.seed_starter_inventory()?;
    println!("Added {} materials", added);
    Ok(())
}

fn projects_list(config: &Config) -> Result<()> {
    let Some(catalog) = SqliteCatalog::open_readonly(&config.storage.db_path) else {
        println!("No catalog database at {}", config.storage.db_path);
        return Ok(());
    };
    let projects = catalog.list_projects()?;
    if projects.is_empty() {
        println!("No projects yet; run `upcycled generate`");
        return Ok(());
    }
    for p in &projects {
        println!(
            "{:<40} {:<20} {:<7} confidence {:>3} [{}]",
            p.name,
            p.category,
            p.difficulty.as_str(),
            p.confidence,
            p.source.as_str()
        );
    }
    Ok(())
}
