//! Error types for FloraCat
//!
//! Each error kind carries a machine tag (the variant) and a human
//! message. `retriable()` implements the propagation policy — only
//! transient infrastructure and deadline errors are retriable, everything
//! else is permanent.

use thiserror::Error;

/// Main error type for FloraCat operations
#[derive(Error, Debug)]
pub enum FloraCatError {
    /// Malformed or conflicting request parameters
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Coordinates or codes could not be mapped to a region
    #[error("location could not be resolved: {0}")]
    LocationUnresolved(String),

    /// Location resolved but no bio-vector could be obtained, even via fallback
    #[error("climate data unavailable for resolved location")]
    ClimateUnavailable,

    /// Filtering and threshold left zero candidates
    #[error("no candidates survived filtering: {hint}")]
    NoCandidates {
        /// Remediation hint surfaced to the caller (e.g. "lower the threshold")
        hint: String,
    },

    /// Transient infrastructure error
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Per-request deadline exceeded
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Crawler could not reach its upstream source
    #[error("crawler source unavailable: {0}")]
    CrawlerSourceUnavailable(String),

    /// Crawler failed to parse a record
    #[error("crawler parse failed: {0}")]
    CrawlerParseFailed(String),

    /// Crawler upstream quota/rate-limit exhausted
    #[error("crawler quota exceeded: {0}")]
    CrawlerQuotaExceeded(String),

    /// Database error surfaced from the store layer
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl FloraCatError {
    /// Machine-readable tag for the error, used in the structured API response.
    pub fn tag(&self) -> &'static str {
        match self {
            FloraCatError::InputInvalid(_) => "input_invalid",
            FloraCatError::LocationUnresolved(_) => "location_unresolved",
            FloraCatError::ClimateUnavailable => "climate_unavailable",
            FloraCatError::NoCandidates { .. } => "no_candidates",
            FloraCatError::StoreUnavailable(_) => "store_unavailable",
            FloraCatError::DeadlineExceeded(_) => "deadline_exceeded",
            FloraCatError::CrawlerSourceUnavailable(_) => "crawler_source_unavailable",
            FloraCatError::CrawlerParseFailed(_) => "crawler_parse_failed",
            FloraCatError::CrawlerQuotaExceeded(_) => "crawler_quota_exceeded",
            FloraCatError::Database(_) => "store_unavailable",
            FloraCatError::Serialization(_) => "input_invalid",
            FloraCatError::Io(_) => "store_unavailable",
            FloraCatError::Generic(_) => "internal",
        }
    }

    /// Whether the caller can usefully retry the request.
    pub fn retriable(&self) -> bool {
        matches!(
            self,
            FloraCatError::StoreUnavailable(_)
                | FloraCatError::DeadlineExceeded(_)
                | FloraCatError::Database(_)
                | FloraCatError::Io(_)
        )
    }

    /// Remediation hint, when one is available.
    pub fn hint(&self) -> Option<&str> {
        match self {
            FloraCatError::NoCandidates { hint } => Some(hint),
            _ => None,
        }
    }
}

/// Result type alias for FloraCat operations
pub type FloraCatResult<T> = Result<T, FloraCatError>;
