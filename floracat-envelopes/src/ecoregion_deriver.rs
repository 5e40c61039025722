//! Ecoregion-based envelope deriver (§4.F.2): aggregates over ecoregion
//! centroid climate samples, weighted by nothing beyond presence — a
//! species present in ten ecoregions contributes ten samples regardless
//! of how many occurrences were observed in each.

use async_trait::async_trait;

use floracat_core::{
    ClimateEnvelope, EnvelopeQuality, EnvelopeSource, FloraCatError, FloraCatResult,
    PrecipitationStats, SpeciesId, TemperatureStats,
};
use floracat_db::CatalogStore;

use crate::deriver::Deriver;

fn quality_for(n: usize) -> EnvelopeQuality {
    if n >= 10 {
        EnvelopeQuality::High
    } else if n >= 3 {
        EnvelopeQuality::Medium
    } else {
        EnvelopeQuality::Low
    }
}

#[derive(Default)]
pub struct EcoregionDeriver;

#[async_trait]
impl Deriver for EcoregionDeriver {
    fn name(&self) -> &str {
        "ecoregion_deriver"
    }

    async fn candidate_species(&self, store: &CatalogStore) -> FloraCatResult<Vec<SpeciesId>> {
        store
            .species_ids_with_ecoregion_observations()
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))
    }

    async fn derive(&self, store: &CatalogStore, species_id: SpeciesId) -> FloraCatResult<Option<ClimateEnvelope>> {
        let observations = store
            .ecoregion_observations_for_species(species_id)
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
        if observations.is_empty() {
            return Ok(None);
        }

        let eco_ids: Vec<String> = observations.iter().map(|o| o.eco_id.clone()).collect();
        let climates = store
            .ecoregion_climates_for(&eco_ids)
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
        if climates.is_empty() {
            return Ok(None);
        }

        let n = climates.len();
        let mean = |f: fn(&floracat_core::RegionClimateStats) -> f64| {
            climates.iter().map(|c| f(&c.stats)).sum::<f64>() / n as f64
        };

        Ok(Some(ClimateEnvelope {
            species_id,
            source: EnvelopeSource::Ecoregion,
            temp: TemperatureStats {
                mean: mean(|s| s.temp_mean.mean),
                min: climates.iter().map(|c| c.stats.temp_min_cold.min).fold(f64::INFINITY, f64::min),
                max: climates.iter().map(|c| c.stats.temp_max_warm.max).fold(f64::NEG_INFINITY, f64::max),
                p05: None,
                p95: None,
            },
            precip: PrecipitationStats {
                mean: mean(|s| s.precip.mean),
                min: climates.iter().map(|c| c.stats.precip.min).fold(f64::INFINITY, f64::min),
                max: climates.iter().map(|c| c.stats.precip.max).fold(f64::NEG_INFINITY, f64::max),
                seasonality_mean: mean(|s| s.seasonality.mean),
            },
            sample_count: n as i64,
            quality: quality_for(n),
            percentile_fallback: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_thresholds_match_spec_bands() {
        assert_eq!(quality_for(12), EnvelopeQuality::High);
        assert_eq!(quality_for(4), EnvelopeQuality::Medium);
        assert_eq!(quality_for(1), EnvelopeQuality::Low);
    }
}
