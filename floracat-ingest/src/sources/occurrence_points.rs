//! Occurrence-points crawler: fetches georeferenced sightings (each
//! already carrying its sampled bio-vector, since raw raster sampling is
//! out of scope) and stages them after the quality filter — coordinate
//! uncertainty and recency thresholds, then a per-species cap so one
//! prolific species can't crowd out the rest of a staging batch.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{BioVector, FloraCatError, FloraCatResult, OccurrenceRecord, SpeciesId};
use floracat_db::CatalogStore;
use floracat_taxonomy::{disambiguate, BackboneIndex, DisambiguationOutcome};

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;

#[derive(Debug, Deserialize)]
struct OccurrenceRow {
    upstream_id: String,
    scientific_name: String,
    lat: f64,
    lon: f64,
    uncertainty_m: f64,
    year: i32,
    country_code: Option<String>,
    temp_mean: f64,
    temp_max_warm: f64,
    temp_min_cold: f64,
    precip: f64,
    seasonality: f64,
    temp_seasonality: f64,
}

#[derive(Debug, Deserialize)]
struct OccurrencePage {
    rows: Vec<OccurrenceRow>,
}

pub struct OccurrencePointsCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
}

impl OccurrencePointsCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<OccurrencePage> {
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
                "occurrence source returned {}",
                resp.status()
            )));
        }
        resp.json::<OccurrencePage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for OccurrencePointsCrawler {
    fn name(&self) -> &str {
        "occurrence_points"
    }

    async fn run(
        &self,
        store: &CatalogStore,
        mode: RunMode,
        max_records: Option<u64>,
    ) -> FloraCatResult<CrawlReport> {
        let ingest_config = IngestConfig::default();
        let quality = ingest_config.occurrence_quality;
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

        let mut per_species_count: HashMap<SpeciesId, usize> = HashMap::new();
        let mut report = CrawlReport::default();
        loop {
            let page = with_backoff(&ingest_config, || self.fetch_page(offset)).await?;
            if page.rows.is_empty() {
                break;
            }

            let mut batch = Vec::with_capacity(page.rows.len());
            for row in &page.rows {
                report.records_processed += 1;

                if row.uncertainty_m > quality.max_uncertainty_m || row.year < quality.min_year {
                    continue;
                }

                let species_id = match disambiguate(&index, &row.scientific_name) {
                    DisambiguationOutcome::Matched { backbone_id, .. } => backbone_id,
                    DisambiguationOutcome::Unmatched { reason } => {
                        report.errors.push(format!("{}: {}", row.scientific_name, reason));
                        continue;
                    }
                };

                let count = per_species_count.entry(species_id).or_insert(0);
                if *count >= quality.per_species_cap {
                    continue;
                }
                *count += 1;

                batch.push(OccurrenceRecord {
                    upstream_id: row.upstream_id.clone(),
                    species_id,
                    lat: row.lat,
                    lon: row.lon,
                    uncertainty_m: row.uncertainty_m,
                    year: row.year,
                    country_code: row.country_code.clone(),
                    bio: BioVector {
                        temp_mean: row.temp_mean,
                        temp_max_warm: row.temp_max_warm,
                        temp_min_cold: row.temp_min_cold,
                        precip: row.precip,
                        seasonality: row.seasonality,
                    },
                    temp_seasonality: row.temp_seasonality,
                });
            }

            let inserted = store
                .insert_occurrences(&batch)
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
