//! Trait-source crawler: fetches a trait table keyed by scientific name,
//! disambiguates each name against the backbone, and appends `RawTrait`
//! rows tagged with this source's name.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{FloraCatError, FloraCatResult, RawTrait, ThreatStatus};
use floracat_db::CatalogStore;
use floracat_taxonomy::{disambiguate, BackboneIndex, DisambiguationOutcome};

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;
use crate::vocab::{normalize_growth_form, normalize_threat_status};

#[derive(Debug, Deserialize)]
struct TraitRow {
    scientific_name: String,
    growth_form: Option<String>,
    max_height_m: Option<f64>,
    woodiness: Option<String>,
    nitrogen_fixer: Option<bool>,
    dispersal_syndrome: Option<String>,
    deciduousness: Option<String>,
    lifespan_years: Option<f64>,
    threat_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraitPage {
    rows: Vec<TraitRow>,
}

fn parse_threat_status(raw: &str) -> Option<ThreatStatus> {
    normalize_threat_status(raw)
}

/// Crawls a paginated trait table for one upstream source, e.g. a trait
/// database or a regional flora checklist. `source_tag` is stamped onto
/// every `RawTrait` row so the consolidator can apply its precedence
/// table.
pub struct TraitSourceCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
    source_tag: String,
}

impl TraitSourceCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig, source_tag: impl Into<String>) -> Self {
        Self { http, config, source_tag: source_tag.into() }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<TraitPage> {
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
        resp.json::<TraitPage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for TraitSourceCrawler {
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

            let mut batch = Vec::with_capacity(page.rows.len());
            for row in &page.rows {
                report.records_processed += 1;
                let species_id = match disambiguate(&index, &row.scientific_name) {
                    DisambiguationOutcome::Matched { backbone_id, .. } => backbone_id,
                    DisambiguationOutcome::Unmatched { reason } => {
                        report.errors.push(format!("{}: {}", row.scientific_name, reason));
                        continue;
                    }
                };
                batch.push(RawTrait {
                    species_id,
                    source: self.source_tag.clone(),
                    growth_form: row.growth_form.as_deref().and_then(normalize_growth_form),
                    raw_growth_form: row.growth_form.clone(),
                    max_height_m: row.max_height_m,
                    woodiness: row.woodiness.clone(),
                    nitrogen_fixer: row.nitrogen_fixer,
                    dispersal_syndrome: row.dispersal_syndrome.clone(),
                    deciduousness: row.deciduousness.clone(),
                    lifespan_years: row.lifespan_years,
                    threat_status: row.threat_status.as_deref().and_then(parse_threat_status),
                });
            }

            let inserted = store
                .insert_raw_traits(&batch)
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
