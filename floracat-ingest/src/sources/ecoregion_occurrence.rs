//! Ecoregion-occurrence crawler: fetches per-ecoregion observation counts
//! and stages them as `EcoregionObservation` rows, the input to the
//! ecoregion-based climate envelope deriver.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{EcoregionObservation, FloraCatError, FloraCatResult};
use floracat_db::CatalogStore;
use floracat_taxonomy::{disambiguate, BackboneIndex, DisambiguationOutcome};

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;

#[derive(Debug, Deserialize)]
struct EcoregionRow {
    scientific_name: String,
    eco_id: String,
    n_observations: i64,
}

#[derive(Debug, Deserialize)]
struct EcoregionPage {
    rows: Vec<EcoregionRow>,
}

pub struct EcoregionOccurrenceCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
}

impl EcoregionOccurrenceCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<EcoregionPage> {
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
                "ecoregion source returned {}",
                resp.status()
            )));
        }
        resp.json::<EcoregionPage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for EcoregionOccurrenceCrawler {
    fn name(&self) -> &str {
        "ecoregion_occurrence"
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

            let mut batch = Vec::with_capacity(page.rows.len());
            for row in &page.rows {
                report.records_processed += 1;
                match disambiguate(&index, &row.scientific_name) {
                    DisambiguationOutcome::Matched { backbone_id, .. } => {
                        batch.push(EcoregionObservation {
                            species_id: backbone_id,
                            eco_id: row.eco_id.clone(),
                            n_observations: row.n_observations,
                        });
                    }
                    DisambiguationOutcome::Unmatched { reason } => {
                        report.errors.push(format!("{}: {}", row.scientific_name, reason));
                    }
                }
            }

            let inserted = store
                .upsert_ecoregion_observations(&batch)
                .await
                .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
            report.records_inserted += inserted as i64;

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
