//! Location resolution, candidate selection, and diversity optimization for
//! the FloraCat recommendation engine. This crate is pure CPU-bound logic
//! plus a single candidate query against the catalog store — no caching and
//! no HTTP concerns, both of which live in `floracat-api`.

pub mod admin_codes;
pub mod diversity;
pub mod location;
pub mod request;
pub mod response;
pub mod scoring;
pub mod selector;

use std::time::Instant;

use floracat_core::{FloraCatError, FloraCatResult, RasterSampler, SpeciesId};
use floracat_db::CatalogStore;

pub use location::{LocationSpec, ResolvedLocation};
pub use request::{Preferences, RecommendationRequest};
pub use response::{LocationInfo, RecommendationResponse, SpeciesRecommendation};

/// Resolve a request's location, select climate-matched candidates, run the
/// diversity optimizer, and assemble the full response — everything short
/// of caching, which the API layer owns.
pub async fn recommend(
    store: &CatalogStore,
    raster: &dyn RasterSampler,
    request: &RecommendationRequest,
) -> FloraCatResult<RecommendationResponse> {
    let started = Instant::now();

    let k = request.clamped_n_species();
    let threshold = request.clamped_climate_threshold();
    let spec = request.location_spec()?;
    let location = location::resolve_location(store, raster, &spec).await?;

    let candidates =
        selector::select_candidates(store, &location, threshold, &request.preferences, k).await?;
    if candidates.is_empty() {
        return Err(FloraCatError::NoCandidates {
            hint: "lower climate_threshold or relax preferences".to_string(),
        });
    }

    let scored: Vec<diversity::ScoredCandidate> = candidates;
    let selection = diversity::select_diverse(scored, k);

    let species_ids: Vec<SpeciesId> = selection.selected.iter().map(|s| s.candidate.species_id).collect();
    let common_names = store
        .common_names_for(&species_ids)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;

    let species = selection
        .selected
        .into_iter()
        .map(|s| {
            let names = common_names.get(&s.candidate.species_id);
            SpeciesRecommendation {
                species_id: s.candidate.species_id,
                canonical_name: s.candidate.canonical_name,
                common_name_pt: names.and_then(|n| n.pt.clone()),
                common_name_en: names.and_then(|n| n.en.clone()),
                family: s.candidate.family,
                growth_form: s.candidate.growth_form,
                max_height_m: s.candidate.max_height_m,
                lifespan_years: s.candidate.lifespan_years,
                is_nitrogen_fixer: s.candidate.is_nitrogen_fixer,
                threat_status: s.candidate.threat_status,
                is_native: s.candidate.is_native,
                is_endemic: s.candidate.is_endemic,
                climate_match_score: s.candidate.climate_match_score,
                selection_rank: s.selection_rank,
                diversity_contribution: s.diversity_contribution,
            }
        })
        .collect();

    let location_info = LocationInfo {
        tdwg_code: location.region_code.as_str().to_string(),
        tdwg_name: location.region_name,
        bio1: location.bio.temp_mean,
        bio5: location.bio.temp_max_warm,
        bio6: location.bio.temp_min_cold,
        bio12: location.bio.precip,
        bio15: location.bio.seasonality,
        latitude: location.latitude,
        longitude: location.longitude,
    };

    Ok(RecommendationResponse {
        species,
        diversity_metrics: selection.metrics,
        location_info,
        query_time: format!("{:?}", started.elapsed()),
    })
}
