//! Fold every `RawTrait` row for a species into one `UnifiedTrait`, under
//! the precedence policy in [`crate::precedence`].

use tracing::warn;

use floracat_core::{RawTrait, Sourced, SpeciesId, UnifiedTrait};
use floracat_db::CatalogStore;

use crate::precedence::{
    pick_by_precedence, DEFAULT_PRECEDENCE, GROWTH_FORM_PRECEDENCE, LIFESPAN_YEARS_PRECEDENCE,
    THREAT_STATUS_PRECEDENCE,
};

/// Region codes in the Brazil subset use this ISO-3166-2-style prefix
/// (e.g. `BR-SP`, `BR-AM`).
const BRAZIL_REGION_PREFIX: &str = "BR-";

/// Fuse one species' raw trait rows into a `UnifiedTrait`, without
/// touching the store. `is_brazil_native` is left `false` here — the
/// caller fills it in from the species' native region set, which this
/// function has no access to (it only sees `RawTrait` rows).
pub fn fuse(species_id: SpeciesId, raw: &[RawTrait]) -> UnifiedTrait {
    let growth_form = pick_by_precedence(
        GROWTH_FORM_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.growth_form)),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let max_height_m = pick_by_precedence(
        DEFAULT_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.max_height_m)),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let woodiness = pick_by_precedence(
        DEFAULT_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.woodiness.clone())),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let nitrogen_fixer = pick_by_precedence(
        DEFAULT_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.nitrogen_fixer)),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let dispersal_syndrome = pick_by_precedence(
        DEFAULT_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.dispersal_syndrome.clone())),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let deciduousness = pick_by_precedence(
        DEFAULT_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.deciduousness.clone())),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let lifespan_years = pick_by_precedence(
        LIFESPAN_YEARS_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.lifespan_years)),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let threat_status = pick_by_precedence(
        THREAT_STATUS_PRECEDENCE,
        raw.iter().map(|t| (t.source.as_str(), t.threat_status)),
    )
    .map(|(value, source)| Sourced::new(value, source));

    let mut unified = UnifiedTrait {
        species_id,
        growth_form,
        max_height_m,
        woodiness,
        nitrogen_fixer,
        dispersal_syndrome,
        deciduousness,
        lifespan_years,
        threat_status,
        is_tree: false,
        is_shrub: false,
        is_climber: false,
        is_herb: false,
        is_palm: false,
        is_brazil_native: false,
    };
    unified.recompute_derived_booleans();
    unified
}

/// True iff `region_code` falls in the Brazil subset used by the
/// `is_brazil_native` flag.
pub fn is_brazil_region(region_code: &str) -> bool {
    region_code.starts_with(BRAZIL_REGION_PREFIX)
}

/// Run the trait consolidator over every species with at least one raw
/// trait row. Each species is consolidated independently; a failure for
/// one species is logged and skipped rather than aborting the run (the
/// store's own transaction per `replace_unified_trait` call keeps a
/// partial failure from leaving a half-written row).
pub async fn consolidate_all(store: &CatalogStore) -> floracat_core::FloraCatResult<usize> {
    let species_ids = store
        .species_ids_with_raw_traits()
        .await
        .map_err(|e| floracat_core::FloraCatError::StoreUnavailable(e.to_string()))?;

    let mut consolidated = 0usize;
    for species_id in species_ids {
        if let Err(err) = consolidate_one(store, species_id).await {
            warn!(%species_id, %err, "trait consolidation failed for species, skipping");
            continue;
        }
        consolidated += 1;
    }
    Ok(consolidated)
}

async fn consolidate_one(store: &CatalogStore, species_id: SpeciesId) -> floracat_core::FloraCatResult<()> {
    let raw = store
        .raw_traits_for_species(species_id)
        .await
        .map_err(|e| floracat_core::FloraCatError::StoreUnavailable(e.to_string()))?;
    let mut unified = fuse(species_id, &raw);

    let native_regions = store
        .regions_for_species(species_id, true)
        .await
        .map_err(|e| floracat_core::FloraCatError::StoreUnavailable(e.to_string()))?;
    unified.is_brazil_native = native_regions.iter().any(|r| is_brazil_region(r.as_str()));

    store
        .replace_unified_trait(&unified)
        .await
        .map_err(|e| floracat_core::FloraCatError::StoreUnavailable(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use floracat_core::{GrowthForm, ThreatStatus};

    fn raw(source: &str) -> RawTrait {
        RawTrait {
            species_id: SpeciesId::new(1),
            source: source.to_string(),
            growth_form: None,
            raw_growth_form: None,
            max_height_m: None,
            woodiness: None,
            nitrogen_fixer: None,
            dispersal_syndrome: None,
            deciduousness: None,
            lifespan_years: None,
            threat_status: None,
        }
    }

    #[test]
    fn growth_form_prefers_taxonomic_source_over_trait_sources() {
        let rows = vec![
            RawTrait { growth_form: Some(GrowthForm::Shrub), ..raw("trait_source_1") },
            RawTrait { growth_form: Some(GrowthForm::Tree), ..raw("taxonomic_source") },
        ];
        let unified = fuse(SpeciesId::new(1), &rows);
        let chosen = unified.growth_form.unwrap();
        assert_eq!(chosen.value, GrowthForm::Tree);
        assert_eq!(chosen.source, "taxonomic_source");
        assert!(unified.is_tree);
        assert!(!unified.is_shrub);
    }

    #[test]
    fn threat_status_prefers_validation_source() {
        let rows = vec![
            RawTrait { threat_status: Some(ThreatStatus::Lc), ..raw("trait_source_1") },
            RawTrait { threat_status: Some(ThreatStatus::En), ..raw("validation_source") },
        ];
        let unified = fuse(SpeciesId::new(1), &rows);
        assert_eq!(unified.threat_status.unwrap().value, ThreatStatus::En);
    }

    #[test]
    fn missing_attribute_across_all_sources_stays_none() {
        let rows = vec![raw("trait_source_1"), raw("curated_list")];
        let unified = fuse(SpeciesId::new(1), &rows);
        assert!(unified.max_height_m.is_none());
    }

    #[test]
    fn brazil_region_prefix_is_recognized() {
        assert!(is_brazil_region("BR-SP"));
        assert!(!is_brazil_region("US-CA"));
    }
}
