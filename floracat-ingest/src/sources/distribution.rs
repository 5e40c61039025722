//! Distribution-source crawler: fetches species/region membership rows
//! (native, endemic, introduced flags) and stages them via the
//! OR-merge upsert, so a later re-run or a second source only ever adds
//! flags, never removes one another's signal.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{FloraCatError, FloraCatResult, RegionCode, RegionFlags, SpeciesRegion};
use floracat_db::CatalogStore;
use floracat_taxonomy::{disambiguate, BackboneIndex, DisambiguationOutcome};

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;

#[derive(Debug, Deserialize)]
struct DistributionRow {
    scientific_name: String,
    region_code: String,
    is_native: bool,
    is_endemic: bool,
    is_introduced: bool,
}

#[derive(Debug, Deserialize)]
struct DistributionPage {
    rows: Vec<DistributionRow>,
}

pub struct DistributionSourceCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
    source_tag: String,
}

impl DistributionSourceCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig, source_tag: impl Into<String>) -> Self {
        Self { http, config, source_tag: source_tag.into() }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<DistributionPage> {
        let url = format!(
            "{}?offset={}&limit={}",
            self.config.base_url, offset, self.config.page_size
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FloraCatError::CrawlerSourceUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FloraCatError::CrawlerSourceUnavailable(format!(
                "{} source returned {}",
                self.source_tag,
                resp.status()
            )));
        }
        resp.json::<DistributionPage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for DistributionSourceCrawler {
    fn name(&self) -> &str {
        &self.source_tag
    }

    async fn run(
        &self,
        store: &CatalogStore,
        mode: RunMode,
        max_records: Option<u64>,
    ) -> FloraCatResult<CrawlReport> {
        let ingest_config = IngestConfig::default();
        let names = store
            .all_canonical_names()
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
        let index = BackboneIndex::build(names);

        let mut offset = match mode {
            RunMode::Full => 0,
            RunMode::Incremental => store
                .load_checkpoint(self.name())
                .await
                .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?
                .and_then(|c| c.get("offset").and_then(|v| v.as_u64()))
                .unwrap_or(0),
        };

        let mut report = CrawlReport::default();
        loop {
            let page = with_backoff(&ingest_config, || self.fetch_page(offset)).await?;
            if page.rows.is_empty() {
                break;
            }

            for row in &page.rows {
                report.records_processed += 1;
                let species_id = match disambiguate(&index, &row.scientific_name) {
                    DisambiguationOutcome::Matched { backbone_id, .. } => backbone_id,
                    DisambiguationOutcome::Unmatched { reason } => {
                        report.errors.push(format!("{}: {}", row.scientific_name, reason));
                        continue;
                    }
                };
                store
                    .upsert_species_region(&SpeciesRegion {
                        species_id,
                        region_code: RegionCode::new(row.region_code.clone()),
                        flags: RegionFlags {
                            is_native: row.is_native,
                            is_endemic: row.is_endemic,
                            is_introduced: row.is_introduced,
                        },
                        source: self.source_tag.clone(),
                    })
                    .await
                    .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
                report.records_inserted += 1;
            }

            offset += page.rows.len() as u64;
            store
                .save_checkpoint(self.name(), &json!({ "offset": offset }))
                .await
                .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;

            if page.rows.len() < self.config.page_size as usize {
                break;
            }
            if let Some(cap) = max_records {
                if report.records_processed as u64 >= cap {
                    break;
                }
            }
        }
        Ok(report)
    }
}
