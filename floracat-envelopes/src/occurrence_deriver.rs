//! Occurrence-based envelope deriver (§4.F.1): the highest-priority
//! source when enough filtered occurrence points exist.

use async_trait::async_trait;

use floracat_core::config::OccurrenceQualityConfig;
use floracat_core::{
    ClimateEnvelope, EnvelopeQuality, EnvelopeSource, FloraCatError, FloraCatResult,
    PrecipitationStats, SpeciesId, TemperatureStats,
};
use floracat_db::CatalogStore;

use crate::deriver::Deriver;
use crate::percentile::p05_p95_with_fallback;

/// Minimum filtered occurrence points required to derive an envelope.
pub const OCC_MIN: usize = 10;

pub struct OccurrenceDeriver {
    quality: OccurrenceQualityConfig,
}

impl OccurrenceDeriver {
    pub fn new(quality: OccurrenceQualityConfig) -> Self {
        Self { quality }
    }
}

impl Default for OccurrenceDeriver {
    fn default() -> Self {
        Self::new(OccurrenceQualityConfig::default())
    }
}

fn quality_for(n: usize) -> EnvelopeQuality {
    if n >= 100 {
        EnvelopeQuality::High
    } else if n >= 50 {
        EnvelopeQuality::Medium
    } else {
        EnvelopeQuality::Low
    }
}

#[async_trait]
impl Deriver for OccurrenceDeriver {
    fn name(&self) -> &str {
        "occurrence_deriver"
    }

    async fn candidate_species(&self, store: &CatalogStore) -> FloraCatResult<Vec<SpeciesId>> {
        store
            .species_ids_with_occurrences()
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))
    }

    async fn derive(&self, store: &CatalogStore, species_id: SpeciesId) -> FloraCatResult<Option<ClimateEnvelope>> {
        let records = store
            .occurrences_for_species(species_id, self.quality.per_species_cap as i64)
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
        if records.len() < OCC_MIN {
            return Ok(None);
        }

        let n = records.len();
        let temp_mean: Vec<f64> = records.iter().map(|r| r.bio.temp_mean).collect();
        let temp_max_warm: Vec<f64> = records.iter().map(|r| r.bio.temp_max_warm).collect();
        let temp_min_cold: Vec<f64> = records.iter().map(|r| r.bio.temp_min_cold).collect();
        let precip: Vec<f64> = records.iter().map(|r| r.bio.precip).collect();
        let seasonality: Vec<f64> = records.iter().map(|r| r.bio.seasonality).collect();

        let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        let min = |xs: &[f64]| xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = |xs: &[f64]| xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (p05, p95, fallback) = p05_p95_with_fallback(&temp_mean);

        Ok(Some(ClimateEnvelope {
            species_id,
            source: EnvelopeSource::Occurrence,
            temp: TemperatureStats {
                mean: mean(&temp_mean),
                min: min(&temp_min_cold),
                max: max(&temp_max_warm),
                p05: Some(p05),
                p95: Some(p95),
            },
            precip: PrecipitationStats {
                mean: mean(&precip),
                min: min(&precip),
                max: max(&precip),
                seasonality_mean: mean(&seasonality),
            },
            sample_count: n as i64,
            quality: quality_for(n),
            percentile_fallback: fallback,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_thresholds_match_spec_bands() {
        assert_eq!(quality_for(150), EnvelopeQuality::High);
        assert_eq!(quality_for(60), EnvelopeQuality::Medium);
        assert_eq!(quality_for(20), EnvelopeQuality::Low);
    }
}
