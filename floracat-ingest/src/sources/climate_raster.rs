//! Climate-raster crawler: fetches per-region geometry and bioclimatic
//! aggregates and upserts `Region`/`RegionClimate` rows. Point-level
//! raster sampling is out of scope; this source only carries the
//! region-aggregate tier of the climate data the region-based envelope
//! deriver and the location resolver's fallback both depend on.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{
    EcoregionClimate, FloraCatError, FloraCatResult, MinMeanMax, RegionClimate, RegionClimateStats,
    RegionCode,
};
use floracat_db::CatalogStore;

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;

#[derive(Debug, Deserialize)]
struct RegionRow {
    code: String,
    name: String,
    continent: String,
    geometry_wkt: String,
    temp_mean: MinMeanMax,
    temp_max_warm: MinMeanMax,
    temp_min_cold: MinMeanMax,
    precip: MinMeanMax,
    seasonality: MinMeanMax,
}

#[derive(Debug, Deserialize)]
struct RegionPage {
    rows: Vec<RegionRow>,
}

pub struct ClimateRasterCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
}

impl ClimateRasterCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<RegionPage> {
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
                "climate raster source returned {}",
                resp.status()
            )));
        }
        resp.json::<RegionPage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for ClimateRasterCrawler {
    fn name(&self) -> &str {
        "climate_raster"
    }

    async fn run(
        &self,
        store: &CatalogStore,
        mode: RunMode,
        max_records: Option<u64>,
    ) -> FloraCatResult<CrawlReport> {
        let ingest_config = IngestConfig::default();
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
                let code = RegionCode::new(row.code.clone());
                store
                    .upsert_region(&code, &row.name, &row.continent, &row.geometry_wkt)
                    .await
                    .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
                store
                    .upsert_region_climate(&RegionClimate {
                        region_code: code,
                        stats: RegionClimateStats {
                            temp_mean: row.temp_mean,
                            temp_max_warm: row.temp_max_warm,
                            temp_min_cold: row.temp_min_cold,
                            precip: row.precip,
                            seasonality: row.seasonality,
                        },
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

#[derive(Debug, Deserialize)]
struct EcoregionClimateRow {
    eco_id: String,
    temp_mean: MinMeanMax,
    temp_max_warm: MinMeanMax,
    temp_min_cold: MinMeanMax,
    precip: MinMeanMax,
    seasonality: MinMeanMax,
}

#[derive(Debug, Deserialize)]
struct EcoregionClimatePage {
    rows: Vec<EcoregionClimateRow>,
}

/// Samples the same bioclimatic raster at ecoregion centroids rather
/// than region polygons — the input the ecoregion-based envelope
/// deriver needs alongside the ecoregion-occurrence source's observation
/// counts.
pub struct EcoregionClimateCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
}

impl EcoregionClimateCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<EcoregionClimatePage> {
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
                "ecoregion climate source returned {}",
                resp.status()
            )));
        }
        resp.json::<EcoregionClimatePage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for EcoregionClimateCrawler {
    fn name(&self) -> &str {
        "ecoregion_climate"
    }

    async fn run(
        &self,
        store: &CatalogStore,
        mode: RunMode,
        max_records: Option<u64>,
    ) -> FloraCatResult<CrawlReport> {
        let ingest_config = IngestConfig::default();
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
                store
                    .upsert_ecoregion_climate(&EcoregionClimate {
                        eco_id: row.eco_id.clone(),
                        stats: RegionClimateStats {
                            temp_mean: row.temp_mean,
                            temp_max_warm: row.temp_max_warm,
                            temp_min_cold: row.temp_min_cold,
                            precip: row.precip,
                            seasonality: row.seasonality,
                        },
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
