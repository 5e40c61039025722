//! Response shape for the recommendation API (§6.1).

use serde::{Deserialize, Serialize};

use floracat_core::{DiversityMetrics, GrowthForm, SpeciesId, ThreatStatus};

/// One selected species, in `selection_rank` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesRecommendation {
    pub species_id: SpeciesId,
    pub canonical_name: String,
    pub common_name_pt: Option<String>,
    pub common_name_en: Option<String>,
    pub family: String,
    pub growth_form: Option<GrowthForm>,
    pub max_height_m: Option<f64>,
    pub lifespan_years: Option<f64>,
    pub is_nitrogen_fixer: bool,
    pub threat_status: Option<ThreatStatus>,
    pub is_native: bool,
    pub is_endemic: bool,
    pub climate_match_score: f64,
    pub selection_rank: usize,
    pub diversity_contribution: f64,
}

/// Location echo, per §6.1's `location_info` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub tdwg_code: String,
    pub tdwg_name: String,
    /// bio1 — annual mean temperature (°C)
    pub bio1: f64,
    /// bio5 — max temperature of warmest month (°C)
    pub bio5: f64,
    /// bio6 — min temperature of coldest month (°C)
    pub bio6: f64,
    /// bio12 — annual precipitation (mm)
    pub bio12: f64,
    /// bio15 — precipitation seasonality
    pub bio15: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Full `/api/recommend` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub species: Vec<SpeciesRecommendation>,
    pub diversity_metrics: DiversityMetrics,
    pub location_info: LocationInfo,
    pub query_time: String,
}
