//! Shared crawler contract: `fetch`, `stage`, `promote`, `checkpoint`,
//! `report`. Scheduling — retries and concurrency caps across crawler kinds
//! — is external, owned by the `floracat-cli` orchestrator.

use async_trait::async_trait;
use floracat_core::FloraCatResult;
use floracat_db::CatalogStore;

/// `full` re-ingests everything from the beginning; `incremental` resumes
/// from the crawler's persisted checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Incremental,
}

impl RunMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(RunMode::Full),
            "incremental" => Some(RunMode::Incremental),
            _ => None,
        }
    }
}

/// Outcome of one crawler run, mirrored into a `CrawlerRun` row.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub records_processed: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub errors: Vec<String>,
}

/// A crawler is a process that fetches one upstream dataset, stages it,
/// and promotes it into the canonical catalog tables in batches of at most
/// `IngestConfig::staging_batch_size` rows. Every crawler is re-runnable:
/// re-running with the same parameters must leave the store in a state
/// functionally equivalent to a single run.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Stable identifier, used as the `CrawlerState`/`CrawlerRun` key and
    /// the `--source` CLI tag.
    fn name(&self) -> &str;

    /// Run one full pass: fetch, stage, promote, checkpoint, report.
    async fn run(
        &self,
        store: &CatalogStore,
        mode: RunMode,
        max_records: Option<u64>,
    ) -> FloraCatResult<CrawlReport>;
}
