//! Shared interface implemented by each of the three independent
//! envelope derivers.

use async_trait::async_trait;
use tracing::warn;

use floracat_core::{ClimateEnvelope, FloraCatError, FloraCatResult, SpeciesId};
use floracat_db::CatalogStore;

/// One tagged-union member (`EnvelopeSource::{Occurrence,Ecoregion,Region}`)
/// derives a `ClimateEnvelope` independently of the other two; all three
/// write their own `(species_id, source)` row, never overwriting one
/// another.
#[async_trait]
pub trait Deriver: Send + Sync {
    /// Name used in log lines for this deriver's batch run.
    fn name(&self) -> &str;

    /// Derive one species' envelope, or `None` if its input doesn't clear
    /// the minimum-sample threshold.
    async fn derive(&self, store: &CatalogStore, species_id: SpeciesId) -> FloraCatResult<Option<ClimateEnvelope>>;

    /// The species ids this deriver has input for at all.
    async fn candidate_species(&self, store: &CatalogStore) -> FloraCatResult<Vec<SpeciesId>>;

    /// Derive and persist envelopes for every candidate species. Each
    /// species is handled independently; one failure is logged and
    /// skipped rather than aborting the batch.
    async fn derive_all(&self, store: &CatalogStore) -> FloraCatResult<usize> {
        let species_ids = self.candidate_species(store).await?;
        let mut written = 0usize;
        for species_id in species_ids {
            match self.derive(store, species_id).await {
                Ok(Some(envelope)) => {
                    store
                        .upsert_climate_envelope(&envelope)
                        .await
                        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;
                    written += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(deriver = self.name(), %species_id, %err, "envelope derivation failed, skipping");
                }
            }
        }
        Ok(written)
    }
}
