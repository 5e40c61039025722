//! Unified envelope view (§4.G): picks the highest-priority available
//! envelope per species and reports how many of the three sources agree
//! it exists at all.

use floracat_core::{ClimateEnvelope, EnvelopeSource, SourceConsensus, SpeciesId, UnifiedEnvelope};

/// Resolve the best-available envelope from up to three per-source rows.
/// Returns `None` if `envelopes` is empty.
pub fn resolve(species_id: SpeciesId, envelopes: &[ClimateEnvelope]) -> Option<UnifiedEnvelope> {
    let best = envelopes.iter().max_by_key(|e| e.source.priority())?;
    let consensus = match envelopes.len() {
        3 => SourceConsensus::High,
        2 => SourceConsensus::Medium,
        _ => SourceConsensus::Single,
    };
    Some(UnifiedEnvelope {
        species_id,
        envelope: best.clone(),
        envelope_source: best.source,
        source_consensus: consensus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use floracat_core::{EnvelopeQuality, PrecipitationStats, TemperatureStats};

    fn envelope(source: EnvelopeSource) -> ClimateEnvelope {
        ClimateEnvelope {
            species_id: SpeciesId::new(1),
            source,
            temp: TemperatureStats { mean: 20.0, min: 10.0, max: 30.0, p05: None, p95: None },
            precip: PrecipitationStats { mean: 1000.0, min: 500.0, max: 1500.0, seasonality_mean: 0.3 },
            sample_count: 10,
            quality: EnvelopeQuality::Medium,
            percentile_fallback: false,
        }
    }

    #[test]
    fn occurrence_outranks_ecoregion_and_region() {
        let envelopes = vec![
            envelope(EnvelopeSource::Region),
            envelope(EnvelopeSource::Occurrence),
            envelope(EnvelopeSource::Ecoregion),
        ];
        let unified = resolve(SpeciesId::new(1), &envelopes).unwrap();
        assert_eq!(unified.envelope_source, EnvelopeSource::Occurrence);
        assert_eq!(unified.source_consensus, SourceConsensus::High);
    }

    #[test]
    fn single_source_is_single_consensus() {
        let envelopes = vec![envelope(EnvelopeSource::Region)];
        let unified = resolve(SpeciesId::new(1), &envelopes).unwrap();
        assert_eq!(unified.source_consensus, SourceConsensus::Single);
    }

    #[test]
    fn no_envelopes_resolves_to_none() {
        assert!(resolve(SpeciesId::new(1), &[]).is_none());
    }
}
