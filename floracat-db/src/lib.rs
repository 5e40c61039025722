//! Postgres/PostGIS catalog store for the species recommendation platform.

pub mod error;
pub mod metrics;
pub mod models;
pub mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use metrics::DatabaseMetrics;
pub use models::HealthStatus;
pub use store::{CandidateRow, CatalogStore, GeometrySummaryRow};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_converts_to_core_error() {
        let err = DatabaseError::NotFound("species 42".to_string());
        let core_err: floracat_core::FloraCatError = err.into();
        assert_eq!(core_err.tag(), "location_unresolved");
    }
}
