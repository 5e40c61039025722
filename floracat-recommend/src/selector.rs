//! Candidate Selector (§4.I): expands growth-form umbrella terms, issues the
//! coarse SQL pre-filter, then applies the exact scoring formula and the
//! preference filters SQL can't express cleanly.

use floracat_core::{FloraCatError, FloraCatResult, GrowthForm, RegionCode, ThreatStatus};
use floracat_db::{CandidateRow, CatalogStore};

use crate::diversity::ScoredCandidate;
use crate::location::ResolvedLocation;
use crate::request::Preferences;
use crate::scoring::climate_match_score;

/// Lower bound of the candidate cap, per `clamp(2·k, 500, 2000)`.
const CANDIDATE_CAP_MIN: i64 = 500;
/// Upper bound of the candidate cap.
const CANDIDATE_CAP_MAX: i64 = 2000;

/// Candidate cap: `clamp(2·k, 500, 2000)`.
pub fn candidate_cap(k: usize) -> i64 {
    ((2 * k) as i64).clamp(CANDIDATE_CAP_MIN, CANDIDATE_CAP_MAX)
}

/// Expand a client-supplied growth-form tag into the canonical set it
/// represents. `herb` and `climber` are umbrella terms with no canonical
/// counterpart of their own (§3); every other tag maps to exactly one
/// canonical form.
pub fn expand_growth_form_tag(tag: &str) -> FloraCatResult<Vec<GrowthForm>> {
    match tag {
        "herb" => Ok(vec![GrowthForm::Forb, GrowthForm::Graminoid]),
        "climber" => Ok(vec![GrowthForm::Liana, GrowthForm::Vine, GrowthForm::Scrambler]),
        other => GrowthForm::from_str_opt(other)
            .map(|g| vec![g])
            .ok_or_else(|| FloraCatError::InputInvalid(format!("unknown growth form '{other}'"))),
    }
}

/// Expand a whole preference list of growth-form tags, deduplicating.
pub fn expand_growth_forms(tags: &[String]) -> FloraCatResult<Vec<GrowthForm>> {
    let mut expanded = Vec::new();
    for tag in tags {
        for gf in expand_growth_form_tag(tag)? {
            if !expanded.contains(&gf) {
                expanded.push(gf);
            }
        }
    }
    Ok(expanded)
}

fn is_animal_dispersed(s: &str) -> bool {
    let s = s.to_lowercase();
    s.contains("animal") || s.contains("zoochory") || s.contains("frugivor")
}

fn is_wind_dispersed(s: &str) -> bool {
    let s = s.to_lowercase();
    s.contains("wind") || s.contains("anemochory")
}

/// Fetch and score the candidate window for a resolved location and
/// preference set. Returns candidates that pass `climate_threshold` and
/// every requested filter, ready for the diversity optimizer.
pub async fn select_candidates(
    store: &CatalogStore,
    location: &ResolvedLocation,
    climate_threshold: f64,
    preferences: &Preferences,
    n_species: usize,
) -> FloraCatResult<Vec<ScoredCandidate>> {
    let growth_form_filter = if preferences.growth_forms.is_empty() {
        None
    } else {
        Some(expand_growth_forms(&preferences.growth_forms)?)
    };

    let region_code = RegionCode::new(location.region_code.as_str());
    let rows = store
        .climate_match_candidates(
            &location.bio,
            Some(&region_code),
            0.0, // the exact formula, not the SQL approximation, enforces the threshold
            preferences.include_threatened,
            growth_form_filter.as_deref(),
            candidate_cap(n_species),
        )
        .await
        .map_err(|e| FloraCatError::StoreUnavailable(e.to_string()))?;

    let candidates: Vec<ScoredCandidate> = rows
        .into_iter()
        .filter_map(|row| score_and_filter(row, location, climate_threshold, preferences))
        .collect();

    Ok(candidates)
}

fn score_and_filter(
    row: CandidateRow,
    location: &ResolvedLocation,
    climate_threshold: f64,
    preferences: &Preferences,
) -> Option<ScoredCandidate> {
    let score = climate_match_score(&location.bio, &row);
    if score < climate_threshold {
        return None;
    }

    let is_native = row.is_native.unwrap_or(false);
    let is_introduced = row.is_introduced.unwrap_or(false);
    if preferences.include_introduced {
        if !is_native && !is_introduced {
            return None;
        }
    } else if !is_native {
        return None;
    }

    let is_endemic = row.is_endemic.unwrap_or(false);
    if preferences.endemics_only && !is_endemic {
        return None;
    }

    if preferences.nitrogen_fixers_only && row.nitrogen_fixer != Some(true) {
        return None;
    }

    if let Some(min_h) = preferences.min_height_m {
        if row.max_height_m.map(|h| h < min_h).unwrap_or(true) {
            return None;
        }
    }
    if let Some(max_h) = preferences.max_height_m {
        if row.max_height_m.map(|h| h > max_h).unwrap_or(false) {
            return None;
        }
    }

    let dispersal = row.dispersal_syndrome.as_deref().unwrap_or("");
    let threat_status = row.threat_status.as_deref().and_then(parse_threat_status);

    Some(ScoredCandidate {
        species_id: floracat_core::SpeciesId::new(row.species_id),
        canonical_name: row.canonical_name,
        family: row.family,
        growth_form: row.growth_form.as_deref().and_then(GrowthForm::from_str_opt),
        is_nitrogen_fixer: row.nitrogen_fixer.unwrap_or(false),
        dispersal_animal: is_animal_dispersed(dispersal),
        dispersal_wind: is_wind_dispersed(dispersal),
        max_height_m: row.max_height_m,
        lifespan_years: row.lifespan_years,
        threat_status,
        is_native,
        is_endemic,
        climate_match_score: score,
    })
}

fn parse_threat_status(s: &str) -> Option<ThreatStatus> {
    match s {
        "CR" => Some(ThreatStatus::Cr),
        "EN" => Some(ThreatStatus::En),
        "VU" => Some(ThreatStatus::Vu),
        "NT" => Some(ThreatStatus::Nt),
        "LC" => Some(ThreatStatus::Lc),
        "DD" => Some(ThreatStatus::Dd),
        "NE" => Some(ThreatStatus::Ne),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn herb_expands_to_forb_and_graminoid() {
        let expanded = expand_growth_form_tag("herb").unwrap();
        assert_eq!(expanded, vec![GrowthForm::Forb, GrowthForm::Graminoid]);
    }

    #[test]
    fn climber_expands_to_three_canonical_forms() {
        let expanded = expand_growth_form_tag("climber").unwrap();
        assert_eq!(expanded, vec![GrowthForm::Liana, GrowthForm::Vine, GrowthForm::Scrambler]);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(expand_growth_form_tag("epiphyte").is_err());
    }

    #[test]
    fn candidate_cap_honors_clamp_bounds() {
        assert_eq!(candidate_cap(5), 500);
        assert_eq!(candidate_cap(20), 500);
        assert_eq!(candidate_cap(400), 800);
        assert_eq!(candidate_cap(2000), 2000);
    }
}
