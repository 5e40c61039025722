//! Taxonomic backbone crawler: fetches the accepted-name reference list
//! and upserts `Species` rows. Every other crawler's disambiguation step
//! depends on this one having run first.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use floracat_core::config::IngestConfig;
use floracat_core::{CommonNames, FloraCatError, FloraCatResult, Species, SpeciesId, TaxonomicStatus};
use floracat_db::CatalogStore;

use crate::crawler::{CrawlReport, Crawler, RunMode};
use crate::retry::with_backoff;
use crate::sources::HttpSourceConfig;

#[derive(Debug, Deserialize)]
struct BackboneRow {
    id: i64,
    canonical_name: String,
    genus: String,
    family: String,
    backbone_id: Option<String>,
    status: String,
    accepted_id: Option<i64>,
    common_name_pt: Option<String>,
    common_name_en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackbonePage {
    rows: Vec<BackboneRow>,
}

fn parse_status(s: &str) -> TaxonomicStatus {
    match s {
        "synonym" => TaxonomicStatus::Synonym,
        "unresolved" => TaxonomicStatus::Unresolved,
        _ => TaxonomicStatus::Accepted,
    }
}

/// Crawls a paginated accepted-name backbone endpoint.
pub struct TaxonomicBackboneCrawler {
    http: reqwest::Client,
    config: HttpSourceConfig,
}

impl TaxonomicBackboneCrawler {
    pub fn new(http: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self { http, config }
    }

    async fn fetch_page(&self, offset: u64) -> FloraCatResult<BackbonePage> {
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
                "backbone source returned {}",
                resp.status()
            )));
        }
        resp.json::<BackbonePage>()
            .await
            .map_err(|e| FloraCatError::CrawlerParseFailed(e.to_string()))
    }
}

#[async_trait]
impl Crawler for TaxonomicBackboneCrawler {
    fn name(&self) -> &str {
        "taxonomic_backbone"
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

            let species: Vec<Species> = page
                .rows
                .iter()
                .map(|r| Species {
                    id: SpeciesId::new(r.id),
                    canonical_name: r.canonical_name.clone(),
                    genus: r.genus.clone(),
                    family: r.family.clone(),
                    backbone_id: r.backbone_id.clone(),
                    taxonomic_status: parse_status(&r.status),
                    accepted_species_id: r.accepted_id.map(SpeciesId::new),
                })
                .collect();
            let inserted = store
                .upsert_species(&species)
                .await
                .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;

            let names: Vec<(SpeciesId, CommonNames)> = page
                .rows
                .iter()
                .filter(|r| r.common_name_pt.is_some() || r.common_name_en.is_some())
                .map(|r| {
                    (
                        SpeciesId::new(r.id),
                        CommonNames { pt: r.common_name_pt.clone(), en: r.common_name_en.clone() },
                    )
                })
                .collect();
            store
                .upsert_common_names(&names)
                .await
                .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;

            report.records_processed += species.len() as i64;
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
