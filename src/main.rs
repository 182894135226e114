//! # Tile Metastore CLI (`tms`)
//!
//! Operational entry point for the metadata publishing adapter. The pipeline
//! normally drives the library directly; `tms` covers provisioning, smoke
//! tests, and manual repair.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tms health` | Probe the Solr tile collection |
//! | `tms provision` | Create and configure the ingestion-history collections |
//! | `tms publish <tile.json>` | Publish one tile summary to the search index |
//! | `tms history check --dataset <id> <file>` | Compare a granule's signature with the cached one |
//! | `tms history push --dataset <id> <file>` | Record a granule as ingested |
//! | `tms history latest --dataset <id>` | Print the dataset's ingestion watermark |
//!
//! ## Examples
//!
//! ```bash
//! tms provision --config ./config/tms.toml
//! tms publish tile.json
//! tms history check --dataset AVHRR_OI ./data/sst_20260101.nc
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tile_metastore::config::load_config;
use tile_metastore::history::IngestionHistoryCache;
use tile_metastore::history_solr::SolrHistoryStore;
use tile_metastore::metadata::{MetadataStore, SolrStore};
use tile_metastore::models::TileSummary;
use tile_metastore::signature::Sha256Signature;

/// Tile Metastore — a metadata publishing adapter for satellite tile
/// ingestion pipelines.
#[derive(Parser)]
#[command(
    name = "tms",
    about = "Tile Metastore — publish tile metadata and ingestion history to Solr",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tms.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the Solr tile collection
    Health,
    /// Create and configure the ingestion-history collections
    Provision,
    /// Publish a tile summary (JSON file) to the search index
    Publish {
        /// Path to a tile summary JSON file
        tile: PathBuf,
    },
    /// Inspect or update the per-dataset ingestion history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Compare a granule's current signature with the cached one
    Check {
        /// Dataset identifier
        #[arg(long)]
        dataset: String,
        /// Path to the granule file
        file: String,
    },
    /// Record a granule as ingested
    Push {
        /// Dataset identifier
        #[arg(long)]
        dataset: String,
        /// Path to the granule file
        file: String,
    },
    /// Print the dataset's latest ingested file-modification time
    Latest {
        /// Dataset identifier
        #[arg(long)]
        dataset: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Health => {
            let store = SolrStore::new(&config.solr)?;
            let healthy = store.health_check().await?;
            println!("solr: {}", if healthy { "ok" } else { "unhealthy" });
            if !healthy {
                std::process::exit(1);
            }
        }
        Commands::Provision => {
            SolrHistoryStore::connect(&config).await?;
            println!("history collections ready");
        }
        Commands::Publish { tile } => {
            let raw = std::fs::read_to_string(&tile)?;
            let summary: TileSummary = serde_json::from_str(&raw)?;
            let store = SolrStore::new(&config.solr)?;
            store.save_metadata(&summary).await?;
            println!("published {}", summary.tile_id);
        }
        Commands::History { command } => {
            let store = Arc::new(SolrHistoryStore::connect(&config).await?);
            match command {
                HistoryCommands::Check { dataset, file } => {
                    let cache =
                        IngestionHistoryCache::new(store, dataset, Box::new(Sha256Signature))
                            .await?;
                    let valid = cache.has_valid_cache(&file).await?;
                    println!("{}", if valid { "unchanged" } else { "changed" });
                    cache.close().await?;
                }
                HistoryCommands::Push { dataset, file } => {
                    let mut cache =
                        IngestionHistoryCache::new(store, dataset, Box::new(Sha256Signature))
                            .await?;
                    cache.push(&file).await?;
                    cache.close().await?;
                    println!("recorded {}", file);
                }
                HistoryCommands::Latest { dataset } => {
                    let cache =
                        IngestionHistoryCache::new(store, dataset, Box::new(Sha256Signature))
                            .await?;
                    match cache.latest_ingested_file_update() {
                        Some(timestamp) => println!("{}", timestamp),
                        None => println!("none"),
                    }
                    cache.close().await?;
                }
            }
        }
    }

    Ok(())
}
