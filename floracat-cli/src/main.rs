//! FloraCat command-line interface: crawler orchestration, consolidation,
//! and envelope derivation.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use floracat_core::config::FloraCatConfig;
use floracat_core::types::{CrawlerRunStatus, CrawlerStatus};
use floracat_db::CatalogStore;
use floracat_ingest::{build_crawlers, Crawler, RunMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/floracat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawler operations
    #[command(subcommand)]
    Crawl(CrawlCommands),

    /// Multi-source consolidation
    #[command(subcommand)]
    Consolidate(ConsolidateCommands),

    /// Climate envelope derivation
    #[command(subcommand)]
    Envelopes(EnvelopesCommands),

    /// Database operations
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration management
    Config {
        /// Write an example configuration file
        #[arg(long)]
        example: bool,
        /// Validate the loaded configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum CrawlCommands {
    /// Run one crawler by its `--source` tag
    Run {
        /// Crawler tag, e.g. "taxonomic_backbone" or "trait:trefle"
        source: String,
        /// "full" or "incremental"
        #[arg(long, default_value = "incremental")]
        mode: String,
        /// Cap on records processed this run
        #[arg(long)]
        max_records: Option<u64>,
    },
    /// Run every configured crawler, one instance per kind
    RunAll {
        #[arg(long, default_value = "incremental")]
        mode: String,
    },
}

#[derive(Subcommand)]
enum ConsolidateCommands {
    /// Fuse multi-source traits into `unified_traits`
    Traits,
    /// OR-merge distribution ranges and materialize species geometries
    Distribution,
}

#[derive(Subcommand)]
enum EnvelopesCommands {
    /// Run all three envelope derivers
    DeriveAll,
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run pending migrations
    Migrate,
    /// Print connectivity and pool status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        FloraCatConfig::from_file(&cli.config).map_err(|e| anyhow::anyhow!(e.to_string()))?
    } else {
        warn!("config file {:?} not found, using defaults", cli.config);
        FloraCatConfig::default()
    };

    if let Commands::Config { example, validate } = cli.command {
        run_config(&config, example, validate)?;
        return Ok(());
    }

    let store = CatalogStore::connect(&config.database).await?;

    let result = match cli.command {
        Commands::Crawl(cmd) => run_crawl(&store, &config, cmd).await,
        Commands::Consolidate(cmd) => run_consolidate(&store, cmd).await,
        Commands::Envelopes(cmd) => run_envelopes(&store, cmd).await,
        Commands::Db(cmd) => run_db(&store, cmd).await,
        Commands::Config { .. } => unreachable!("handled above"),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("command failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_config(config: &FloraCatConfig, example: bool, validate: bool) -> anyhow::Result<()> {
    if example {
        let path = "config/floracat.example.toml";
        FloraCatConfig::default().to_file(path).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        info!("wrote example configuration to {}", path);
    }
    if validate {
        match config.validate() {
            Ok(()) => info!("configuration is valid"),
            Err(errors) => {
                for e in &errors {
                    error!("configuration error: {}", e);
                }
                anyhow::bail!("{} configuration error(s)", errors.len());
            }
        }
    }
    Ok(())
}

fn endpoints_from_config(config: &FloraCatConfig) -> HashMap<String, String> {
    config
        .custom
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

async fn run_crawl(store: &CatalogStore, config: &FloraCatConfig, cmd: CrawlCommands) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.ingest.page_fetch_timeout_secs))
        .build()?;
    let endpoints = endpoints_from_config(config);
    let page_size = 500;

    match cmd {
        CrawlCommands::Run { source, mode, max_records } => {
            let run_mode = RunMode::parse(&mode).ok_or_else(|| anyhow::anyhow!("unknown mode '{mode}'"))?;
            let crawlers = build_crawlers(http, &endpoints, page_size);
            let crawler = crawlers
                .into_iter()
                .find(|c| c.name() == source)
                .ok_or_else(|| anyhow::anyhow!("no configured crawler named '{source}'"))?;
            run_one(store, crawler.as_ref(), run_mode, max_records).await
        }
        CrawlCommands::RunAll { mode } => {
            let run_mode = RunMode::parse(&mode).ok_or_else(|| anyhow::anyhow!("unknown mode '{mode}'"))?;
            let crawlers = build_crawlers(http, &endpoints, page_size);
            if crawlers.is_empty() {
                warn!("no crawlers configured, nothing to run");
                return Ok(());
            }
            let mut failures = 0usize;
            for crawler in &crawlers {
                if let Err(e) = run_one(store, crawler.as_ref(), run_mode, None).await {
                    error!("crawler '{}' failed: {}", crawler.name(), e);
                    failures += 1;
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} of {} crawlers failed", crawlers.len());
            }
            Ok(())
        }
    }
}

async fn run_one(
    store: &CatalogStore,
    crawler: &dyn Crawler,
    mode: RunMode,
    max_records: Option<u64>,
) -> anyhow::Result<()> {
    let name = crawler.name();
    if !store.try_claim_crawler(name).await? {
        warn!("crawler '{}' is already running, skipping", name);
        return Ok(());
    }

    let run_id = store.start_crawler_run(name).await?;
    info!("crawler '{}' started (run {})", name, run_id);

    let outcome = crawler.run(store, mode, max_records).await;

    match outcome {
        Ok(report) => {
            store
                .complete_crawler_run(
                    run_id,
                    CrawlerRunStatus::Succeeded,
                    report.records_processed,
                    report.records_inserted,
                    report.records_updated,
                    None,
                )
                .await?;
            store.release_crawler(name, CrawlerStatus::Idle).await?;
            info!(
                "crawler '{}' finished: {} processed, {} inserted, {} updated",
                name, report.records_processed, report.records_inserted, report.records_updated
            );
            if !report.errors.is_empty() {
                warn!("crawler '{}' reported {} row-level errors", name, report.errors.len());
            }
            Ok(())
        }
        Err(e) => {
            store
                .complete_crawler_run(run_id, CrawlerRunStatus::Failed, 0, 0, 0, Some(&e.to_string()))
                .await?;
            store.release_crawler(name, CrawlerStatus::Failed).await?;
            Err(anyhow::anyhow!(e.to_string()))
        }
    }
}

async fn run_consolidate(store: &CatalogStore, cmd: ConsolidateCommands) -> anyhow::Result<()> {
    match cmd {
        ConsolidateCommands::Traits => {
            let n = floracat_consolidate::trait_consolidator::consolidate_all(store).await?;
            info!("fused traits for {} species", n);
        }
        ConsolidateCommands::Distribution => {
            let n = floracat_consolidate::distribution_consolidator::consolidate_all(store).await?;
            info!("consolidated distribution for {} species", n);
        }
    }
    Ok(())
}

async fn run_envelopes(store: &CatalogStore, cmd: EnvelopesCommands) -> anyhow::Result<()> {
    match cmd {
        EnvelopesCommands::DeriveAll => {
            let (occurrence, ecoregion, region) = floracat_envelopes::derive_all(store).await?;
            info!(
                "derived envelopes: {} occurrence, {} ecoregion, {} region",
                occurrence, ecoregion, region
            );
        }
    }
    Ok(())
}

async fn run_db(store: &CatalogStore, cmd: DbCommands) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            store.migrate().await?;
            info!("migrations applied");
        }
        DbCommands::Status => {
            let status = store.health_check().await;
            let metrics = store.metrics();
            info!("status: {:?}, pool: {}/{}", status, metrics.active_connections, metrics.max_connections);
        }
    }
    Ok(())
}
