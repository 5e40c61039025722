//! Derives climate envelopes from three independent inputs — occurrence
//! points, ecoregion centroids, and region aggregates — and resolves a
//! single best-available envelope per species.

pub mod deriver;
pub mod ecoregion_deriver;
pub mod occurrence_deriver;
pub mod percentile;
pub mod region_deriver;
pub mod unified;

pub use deriver::Deriver;
pub use ecoregion_deriver::EcoregionDeriver;
pub use occurrence_deriver::OccurrenceDeriver;
pub use region_deriver::RegionDeriver;

/// Run every deriver over the whole catalog, in priority order so a
/// low-priority deriver's run doesn't block on a high-priority one.
pub async fn derive_all(store: &floracat_db::CatalogStore) -> floracat_core::FloraCatResult<(usize, usize, usize)> {
    let occurrence = OccurrenceDeriver::default().derive_all(store).await?;
    let ecoregion = EcoregionDeriver.derive_all(store).await?;
    let region = RegionDeriver.derive_all(store).await?;
    Ok((occurrence, ecoregion, region))
}
