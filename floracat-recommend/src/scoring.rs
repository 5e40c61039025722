//! Exact climate-match scoring (§4.I): the SQL layer only pre-filters and
//! pre-sorts by a coarse approximation; this is the scoring formula that
//! actually decides which candidates clear the threshold.

use floracat_core::BioVector;
use floracat_db::CandidateRow;

/// Weighted components of the climate match score, in [0, 1] each.
const W_TEMP: f64 = 0.25;
const W_HARDINESS_FILTER: f64 = 0.25;
const W_PRECIP: f64 = 0.20;
const W_SEASONALITY: f64 = 0.15;
const W_COLD_HARDINESS: f64 = 0.15;

/// Compute the exact climate match score of a candidate against a resolved
/// location's bio-vector. Returns exactly `0.0` if the extreme-tolerance
/// hard filter fires — per §4.I, that makes the whole score zero rather
/// than just zeroing its own component.
pub fn climate_match_score(location: &BioVector, candidate: &CandidateRow) -> f64 {
    let cold_tolerance_ok = location.temp_min_cold >= candidate.temp_min - 3.0;
    let heat_tolerance_ok = location.temp_max_warm <= candidate.temp_max + 3.0;
    if !cold_tolerance_ok || !heat_tolerance_ok {
        return 0.0;
    }

    let temp_component = W_TEMP * (1.0 - (location.temp_mean - candidate.temp_mean).abs() / 10.0).max(0.0);

    let precip_component = if candidate.precip_mean > 0.0 {
        W_PRECIP * (1.0 - (location.precip - candidate.precip_mean).abs() / candidate.precip_mean).max(0.0)
    } else {
        W_PRECIP * 0.5
    };

    let seasonality_component =
        W_SEASONALITY * (1.0 - (location.seasonality - candidate.seasonality_mean).abs() / 50.0).max(0.0);

    let cold_hardiness_component = if location.temp_min_cold >= 0.0 {
        W_COLD_HARDINESS
    } else if candidate.temp_min < location.temp_min_cold - 2.0 {
        W_COLD_HARDINESS
    } else {
        0.05
    };

    let score = temp_component + W_HARDINESS_FILTER + precip_component + seasonality_component + cold_hardiness_component;
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> BioVector {
        BioVector {
            temp_mean: 20.0,
            temp_max_warm: 30.0,
            temp_min_cold: 10.0,
            precip: 1500.0,
            seasonality: 40.0,
        }
    }

    fn candidate(temp_mean: f64, temp_min: f64, temp_max: f64, precip_mean: f64, seasonality_mean: f64) -> CandidateRow {
        CandidateRow {
            species_id: 1,
            canonical_name: "Test species".to_string(),
            family: "Testaceae".to_string(),
            growth_form: Some("tree".to_string()),
            is_tree: true,
            is_shrub: false,
            is_climber: false,
            is_herb: false,
            is_palm: false,
            nitrogen_fixer: None,
            dispersal_syndrome: None,
            max_height_m: Some(20.0),
            lifespan_years: Some(100.0),
            threat_status: None,
            temp_mean,
            temp_min,
            temp_max,
            precip_mean,
            precip_min: precip_mean * 0.5,
            precip_max: precip_mean * 1.5,
            seasonality_mean,
            is_native: Some(true),
            is_endemic: Some(false),
            match_score: 0.0,
        }
    }

    #[test]
    fn perfect_match_scores_one() {
        let loc = location();
        let cand = candidate(20.0, 5.0, 35.0, 1500.0, 40.0);
        assert_eq!(climate_match_score(&loc, &cand), 1.0);
    }

    #[test]
    fn cold_extreme_violation_zeroes_entire_score() {
        let loc = location();
        let cand = candidate(20.0, 15.0, 35.0, 1500.0, 40.0);
        assert_eq!(climate_match_score(&loc, &cand), 0.0);
    }

    #[test]
    fn heat_extreme_violation_zeroes_entire_score() {
        let loc = location();
        let cand = candidate(20.0, 5.0, 25.0, 1500.0, 40.0);
        assert_eq!(climate_match_score(&loc, &cand), 0.0);
    }

    #[test]
    fn cold_hardiness_partial_credit_when_uncertain() {
        let mut loc = location();
        loc.temp_min_cold = -5.0;
        let cand = candidate(20.0, -4.0, 35.0, 1500.0, 40.0);
        let score = climate_match_score(&loc, &cand);
        assert!(score > 0.0 && score < 1.0);
    }
}
