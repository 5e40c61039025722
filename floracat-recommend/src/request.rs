//! Request shape and validation for the recommendation API (§6.1): clamps
//! and defaults are applied here so the selector and optimizer never see an
//! out-of-range value.

use serde::{Deserialize, Serialize};

use floracat_core::{FloraCatError, FloraCatResult};

use crate::location::LocationSpec;

fn default_n_species() -> i64 {
    20
}

fn default_climate_threshold() -> f64 {
    0.6
}

fn default_include_threatened() -> bool {
    true
}

/// Filter preferences bag, as carried in a `recommend` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub growth_forms: Vec<String>,
    pub include_introduced: bool,
    #[serde(default = "default_include_threatened")]
    pub include_threatened: bool,
    pub min_height_m: Option<f64>,
    pub max_height_m: Option<f64>,
    pub nitrogen_fixers_only: bool,
    pub endemics_only: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            growth_forms: Vec::new(),
            include_introduced: false,
            include_threatened: true,
            min_height_m: None,
            max_height_m: None,
            nitrogen_fixers_only: false,
            endemics_only: false,
        }
    }
}

/// A recommendation request as received over the wire. Exactly one of
/// `tdwg_code`, `state_code`, or `{latitude, longitude}` must be present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationRequest {
    pub tdwg_code: Option<String>,
    pub state_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_n_species")]
    pub n_species: i64,
    #[serde(default = "default_climate_threshold")]
    pub climate_threshold: f64,
    #[serde(default)]
    pub preferences: Preferences,
}

impl RecommendationRequest {
    /// Resolve which location specifier this request carries, failing if
    /// none or more than one ambiguous combination of coordinates/codes is
    /// given.
    pub fn location_spec(&self) -> FloraCatResult<LocationSpec> {
        match (self.latitude, self.longitude, &self.tdwg_code, &self.state_code) {
            (Some(lat), Some(lon), _, _) => Ok(LocationSpec::Coordinates { latitude: lat, longitude: lon }),
            (None, None, Some(code), _) => Ok(LocationSpec::TdwgCode(code.clone())),
            (None, None, None, Some(code)) => Ok(LocationSpec::AdminCode(code.clone())),
            (Some(_), None, _, _) | (None, Some(_), _, _) => {
                Err(FloraCatError::InputInvalid("latitude and longitude must both be present".to_string()))
            }
            (None, None, None, None) => {
                Err(FloraCatError::InputInvalid("one of tdwg_code, state_code, or coordinates is required".to_string()))
            }
        }
    }

    /// `n_species`, clamped to `[1, 1000]`.
    pub fn clamped_n_species(&self) -> usize {
        self.n_species.clamp(1, 1000) as usize
    }

    /// `climate_threshold`, clamped to `[0.3, 1.0]`.
    pub fn clamped_climate_threshold(&self) -> f64 {
        self.climate_threshold.clamp(0.3, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let req: RecommendationRequest = serde_json::from_str(r#"{"tdwg_code":"BZS"}"#).unwrap();
        assert_eq!(req.n_species, 20);
        assert_eq!(req.climate_threshold, 0.6);
        assert!(req.preferences.include_threatened);
        assert!(!req.preferences.include_introduced);
    }

    #[test]
    fn coordinates_take_precedence_when_both_given() {
        let req: RecommendationRequest =
            serde_json::from_str(r#"{"tdwg_code":"BZS","latitude":-27.0,"longitude":-49.0}"#).unwrap();
        assert_eq!(
            req.location_spec().unwrap(),
            LocationSpec::Coordinates { latitude: -27.0, longitude: -49.0 }
        );
    }

    #[test]
    fn no_location_specifier_is_invalid() {
        let req: RecommendationRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.location_spec().is_err());
    }

    #[test]
    fn clamps_out_of_range_values() {
        let mut req: RecommendationRequest = serde_json::from_str(r#"{"tdwg_code":"BZS"}"#).unwrap();
        req.n_species = 5000;
        req.climate_threshold = 0.0;
        assert_eq!(req.clamped_n_species(), 1000);
        assert_eq!(req.clamped_climate_threshold(), 0.3);
    }
}
