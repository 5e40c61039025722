//! Query-shaping helpers shared by the store's list/search methods.

use serde::{Deserialize, Serialize};

/// Health status surfaced by `CatalogStore::health_check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}
