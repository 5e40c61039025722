//! Core traits for FloraCat components

use async_trait::async_trait;

use crate::types::BioVector;

/// Opaque raster-sampling primitive: `ClimateAtPoint(lat, lon) -> bio-vector | null`.
/// The core must function both when sampling succeeds and
/// when it returns `None`, falling back to regional aggregates.
#[async_trait]
pub trait RasterSampler: Send + Sync {
    /// Sample the bioclimatic vector at a point, if raster coverage exists there.
    async fn sample(&self, lat: f64, lon: f64) -> crate::FloraCatResult<Option<BioVector>>;
}

/// A sampler that always misses — used in tests and wherever raster data
/// is not configured, exercising the regional-aggregate fallback path.
pub struct NullRasterSampler;

#[async_trait]
impl RasterSampler for NullRasterSampler {
    async fn sample(&self, _lat: f64, _lon: f64) -> crate::FloraCatResult<Option<BioVector>> {
        Ok(None)
    }
}
