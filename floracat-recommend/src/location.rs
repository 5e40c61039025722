//! Location Resolver (§4.H): normalizes a request's location specifier to a
//! region code, then resolves a bio-vector for it — preferring a
//! raster-sampled point value and falling back to the region's aggregate.

use floracat_core::{BioVector, FloraCatError, FloraCatResult, RasterSampler, RegionCode};
use floracat_db::CatalogStore;

use crate::admin_codes::region_for_admin_code;

/// Tolerance (degrees) used for the nearest-region fallback when no region's
/// geometry contains the point outright — roughly 55 km at the equator.
pub const NEAREST_REGION_TOLERANCE_DEGREES: f64 = 0.5;

/// The location half of a recommendation request, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSpec {
    Coordinates { latitude: f64, longitude: f64 },
    TdwgCode(String),
    AdminCode(String),
}

/// Output of the location resolver: a region plus the bio-vector to score
/// candidates against.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub region_code: RegionCode,
    pub region_name: String,
    pub bio: BioVector,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Resolve a location specifier against the catalog, per §4.H's two-step
/// algorithm: normalize to a region code, then fetch its bio-vector.
pub async fn resolve_location(
    store: &CatalogStore,
    raster: &dyn RasterSampler,
    spec: &LocationSpec,
) -> FloraCatResult<ResolvedLocation> {
    match spec {
        LocationSpec::Coordinates { latitude, longitude } => {
            resolve_coordinates(store, raster, *latitude, *longitude).await
        }
        LocationSpec::TdwgCode(code) => resolve_region_code(store, &RegionCode::new(code.as_str())).await,
        LocationSpec::AdminCode(code) => {
            let region_code = region_for_admin_code(code)
                .ok_or_else(|| FloraCatError::LocationUnresolved(format!("unknown_region: {code}")))?;
            resolve_region_code(store, &region_code).await
        }
    }
}

async fn resolve_coordinates(
    store: &CatalogStore,
    raster: &dyn RasterSampler,
    latitude: f64,
    longitude: f64,
) -> FloraCatResult<ResolvedLocation> {
    let region_code = store
        .region_containing_point(latitude, longitude)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
    let region_code = match region_code {
        Some(code) => code,
        None => store
            .nearest_region(latitude, longitude, NEAREST_REGION_TOLERANCE_DEGREES)
            .await
            .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?
            .ok_or_else(|| FloraCatError::LocationUnresolved("coords_out_of_coverage".to_string()))?,
    };

    let region_name = store
        .region_name(&region_code)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?
        .ok_or_else(|| FloraCatError::LocationUnresolved("unknown_region".to_string()))?;

    let sampled = raster
        .sample(latitude, longitude)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
    let bio = match sampled {
        Some(bio) => bio,
        None => region_aggregate_bio(store, &region_code).await?,
    };

    Ok(ResolvedLocation {
        region_code,
        region_name,
        bio,
        latitude: Some(latitude),
        longitude: Some(longitude),
    })
}

async fn resolve_region_code(store: &CatalogStore, region_code: &RegionCode) -> FloraCatResult<ResolvedLocation> {
    let region_name = store
        .region_name(region_code)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?
        .ok_or_else(|| FloraCatError::LocationUnresolved(format!("unknown_region: {region_code}")))?;
    let bio = region_aggregate_bio(store, region_code).await?;
    Ok(ResolvedLocation {
        region_code: region_code.clone(),
        region_name,
        bio,
        latitude: None,
        longitude: None,
    })
}

async fn region_aggregate_bio(store: &CatalogStore, region_code: &RegionCode) -> FloraCatResult<BioVector> {
    let climate = store
        .region_by_code(region_code)
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?
        .ok_or(FloraCatError::ClimateUnavailable)?;
    let s = &climate.stats;
    Ok(BioVector {
        temp_mean: s.temp_mean.mean,
        temp_max_warm: s.temp_max_warm.mean,
        temp_min_cold: s.temp_min_cold.mean,
        precip: s.precip.mean,
        seasonality: s.seasonality.mean,
    })
}
