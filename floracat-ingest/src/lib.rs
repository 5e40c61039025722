//! Crawlers that fetch upstream botanical datasets and stage them into
//! the catalog store. Each crawler in [`sources`] implements [`crawler::Crawler`];
//! scheduling, locking, and CLI wiring live in `floracat-cli`.

pub mod crawler;
pub mod retry;
pub mod sources;
pub mod vocab;

pub use crawler::{CrawlReport, Crawler, RunMode};
pub use sources::HttpSourceConfig;
pub use sources::climate_raster::{ClimateRasterCrawler, EcoregionClimateCrawler};
pub use sources::distribution::DistributionSourceCrawler;
pub use sources::ecoregion_occurrence::EcoregionOccurrenceCrawler;
pub use sources::occurrence_points::OccurrencePointsCrawler;
pub use sources::taxonomic_backbone::TaxonomicBackboneCrawler;
pub use sources::trait_source::TraitSourceCrawler;

/// Build the default fleet of crawlers against upstream endpoints named
/// in `config::custom`, keyed the same way the `--source` CLI flag
/// addresses them. A source with no configured URL is simply omitted —
/// `floracat-cli crawl run-all` logs the omission and continues.
pub fn build_crawlers(
    http: reqwest::Client,
    endpoints: &std::collections::HashMap<String, String>,
    page_size: u32,
) -> Vec<Box<dyn Crawler>> {
    let mut crawlers: Vec<Box<dyn Crawler>> = Vec::new();

    if let Some(url) = endpoints.get("taxonomic_backbone") {
        crawlers.push(Box::new(TaxonomicBackboneCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
        )));
    }
    for (tag, url) in endpoints.iter().filter(|(k, _)| k.starts_with("trait:")) {
        let source_tag = tag.trim_start_matches("trait:").to_string();
        crawlers.push(Box::new(TraitSourceCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
            source_tag,
        )));
    }
    for (tag, url) in endpoints.iter().filter(|(k, _)| k.starts_with("distribution:")) {
        let source_tag = tag.trim_start_matches("distribution:").to_string();
        crawlers.push(Box::new(DistributionSourceCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
            source_tag,
        )));
    }
    if let Some(url) = endpoints.get("ecoregion_occurrence") {
        crawlers.push(Box::new(EcoregionOccurrenceCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
        )));
    }
    if let Some(url) = endpoints.get("occurrence_points") {
        crawlers.push(Box::new(OccurrencePointsCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
        )));
    }
    if let Some(url) = endpoints.get("climate_raster") {
        crawlers.push(Box::new(ClimateRasterCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
        )));
    }
    if let Some(url) = endpoints.get("ecoregion_climate") {
        crawlers.push(Box::new(EcoregionClimateCrawler::new(
            http.clone(),
            HttpSourceConfig { base_url: url.clone(), page_size },
        )));
    }

    crawlers
}
