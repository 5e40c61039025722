//! Diversity Optimizer (§4.J): greedy marginal-diversity selection over an
//! 11-feature Gower distance, run entirely in-process once the candidate
//! window has been fetched and scored.

use sha2::{Digest, Sha256};

use floracat_core::{DiversityMetrics, GrowthForm, SpeciesId, ThreatStatus};

/// Ceiling of the linear height normalization.
const HEIGHT_CEILING_M: f64 = 80.0;
/// Ceiling of the log-scale lifespan normalization.
const LIFESPAN_CEILING_YEARS: f64 = 15_000.0;
/// Number of distinct phylogenetic hash buckets the family proxy hashes into.
const FAMILY_HASH_BUCKETS: u64 = 97;
/// Divisor for `growth_form_richness`, per the documented formula.
const GROWTH_FORM_RICHNESS_DIVISOR: f64 = 5.0;

/// A scored candidate ready for diversity optimization, built from a
/// `CandidateRow` plus its computed `climate_match_score`.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub species_id: SpeciesId,
    pub canonical_name: String,
    pub family: String,
    pub growth_form: Option<GrowthForm>,
    pub is_nitrogen_fixer: bool,
    pub dispersal_animal: bool,
    pub dispersal_wind: bool,
    pub max_height_m: Option<f64>,
    pub lifespan_years: Option<f64>,
    pub threat_status: Option<ThreatStatus>,
    pub is_native: bool,
    pub is_endemic: bool,
    pub climate_match_score: f64,
}

/// One species in the final selection.
#[derive(Debug, Clone)]
pub struct SelectedSpecies {
    pub candidate: ScoredCandidate,
    pub selection_rank: usize,
    pub diversity_contribution: f64,
}

/// Result of running the greedy optimizer.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selected: Vec<SelectedSpecies>,
    pub metrics: DiversityMetrics,
}

/// Default height (m) used when a candidate's `max_height_m` is missing,
/// keyed by growth form — a tree with no recorded height still shouldn't
/// collapse to a height distance of zero against everything else.
fn default_height_m(growth_form: Option<GrowthForm>) -> f64 {
    match growth_form {
        Some(GrowthForm::Tree) => 20.0,
        Some(GrowthForm::Palm) => 12.0,
        Some(GrowthForm::Shrub) | Some(GrowthForm::Subshrub) => 3.0,
        Some(GrowthForm::Liana) | Some(GrowthForm::Vine) | Some(GrowthForm::Scrambler) => 6.0,
        Some(GrowthForm::Bamboo) => 8.0,
        Some(GrowthForm::Forb) | Some(GrowthForm::Graminoid) => 0.5,
        _ => 2.0,
    }
}

/// Default lifespan (years) used when missing, keyed by growth form.
fn default_lifespan_years(growth_form: Option<GrowthForm>) -> f64 {
    match growth_form {
        Some(GrowthForm::Tree) => 80.0,
        Some(GrowthForm::Palm) => 60.0,
        Some(GrowthForm::Shrub) | Some(GrowthForm::Subshrub) => 20.0,
        Some(GrowthForm::Liana) | Some(GrowthForm::Vine) | Some(GrowthForm::Scrambler) => 15.0,
        Some(GrowthForm::Bamboo) => 40.0,
        Some(GrowthForm::Forb) | Some(GrowthForm::Graminoid) => 2.0,
        _ => 10.0,
    }
}

/// Hash a family name into a small stable bucket, the phylogenetic proxy
/// feature — two species share the bucket iff they're (almost certainly)
/// the same family, without carrying a real phylogeny.
fn family_bucket(family: &str) -> u64 {
    let digest = Sha256::digest(family.as_bytes());
    let first8: [u8; 8] = digest[0..8].try_into().expect("digest is 32 bytes");
    u64::from_be_bytes(first8) % FAMILY_HASH_BUCKETS
}

/// 11-dimensional feature vector: 8 binary, 2 continuous (normalized to
/// [0, 1]), 1 phylogenetic proxy bucket carried alongside for distance.
struct Features {
    binary: [f64; 8],
    continuous: [f64; 2],
    family_bucket: u64,
}

fn features(c: &ScoredCandidate) -> Features {
    let gf = c.growth_form;
    let height = c.max_height_m.unwrap_or_else(|| default_height_m(gf));
    let lifespan = c.lifespan_years.unwrap_or_else(|| default_lifespan_years(gf));

    Features {
        binary: [
            gf.map(|g| g.is_tree()).unwrap_or(false) as u8 as f64,
            gf.map(|g| g.is_shrub()).unwrap_or(false) as u8 as f64,
            gf.map(|g| g.is_herb()).unwrap_or(false) as u8 as f64,
            gf.map(|g| g.is_climber()).unwrap_or(false) as u8 as f64,
            gf.map(|g| g.is_palm()).unwrap_or(false) as u8 as f64,
            c.is_nitrogen_fixer as u8 as f64,
            c.dispersal_animal as u8 as f64,
            c.dispersal_wind as u8 as f64,
        ],
        continuous: [
            (height.min(HEIGHT_CEILING_M) / HEIGHT_CEILING_M).clamp(0.0, 1.0),
            ((lifespan.max(0.0) + 1.0).ln() / (LIFESPAN_CEILING_YEARS + 1.0).ln()).clamp(0.0, 1.0),
        ],
        family_bucket: family_bucket(&c.family),
    }
}

/// Mean of 11 per-feature distances: 0/1 for each categorical feature
/// (including the phylogenetic proxy), `|a - b|` for the two continuous
/// ones.
fn gower_distance(a: &Features, b: &Features) -> f64 {
    let categorical_sum: f64 = a
        .binary
        .iter()
        .zip(b.binary.iter())
        .map(|(x, y)| if (x - y).abs() > f64::EPSILON { 1.0 } else { 0.0 })
        .sum();
    let phylogenetic_distance = if a.family_bucket == b.family_bucket { 0.0 } else { 1.0 };
    let continuous_sum: f64 = a
        .continuous
        .iter()
        .zip(b.continuous.iter())
        .map(|(x, y)| (x - y).abs())
        .sum();
    (categorical_sum + phylogenetic_distance + continuous_sum) / 11.0
}

/// Run the greedy marginal-diversity selection over `candidates`
/// (pre-filtered, pre-sorted by `climate_match_score` descending is not
/// required — the seed is found by explicit argmax) and return up to `k`
/// selected species plus aggregate diversity metrics.
pub fn select_diverse(candidates: Vec<ScoredCandidate>, k: usize) -> SelectionResult {
    if candidates.is_empty() || k == 0 {
        return SelectionResult {
            selected: Vec::new(),
            metrics: DiversityMetrics {
                functional_diversity: 0.0,
                phylogenetic_diversity: 0.0,
                growth_form_richness: 0.0,
                total_diversity_score: 0.0,
                n_species: 0,
                n_families: 0,
                n_growth_forms: 0,
            },
        };
    }

    let feats: Vec<Features> = candidates.iter().map(features).collect();
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    let seed_idx_pos = remaining
        .iter()
        .enumerate()
        .max_by(|(_, &a), (_, &b)| {
            let ca = &candidates[a];
            let cb = &candidates[b];
            ca.climate_match_score
                .partial_cmp(&cb.climate_match_score)
                .unwrap()
                .then(cb.species_id.as_i64().cmp(&ca.species_id.as_i64()))
        })
        .map(|(pos, _)| pos)
        .expect("candidates non-empty");
    let seed_idx = remaining.remove(seed_idx_pos);

    let mut selected_idx: Vec<usize> = vec![seed_idx];
    let mut contributions: Vec<f64> = vec![1.0];

    while !remaining.is_empty() && selected_idx.len() < k {
        let mut best_pos = 0usize;
        let mut best_marginal = -1.0f64;
        let mut best_combined = f64::NEG_INFINITY;

        for (pos, &cand_idx) in remaining.iter().enumerate() {
            let marginal = selected_idx
                .iter()
                .map(|&s| gower_distance(&feats[cand_idx], &feats[s]))
                .fold(f64::INFINITY, f64::min);
            let combined = 0.7 * marginal + 0.3 * candidates[cand_idx].climate_match_score;

            let better = combined > best_combined
                || (combined == best_combined
                    && candidates[cand_idx].climate_match_score
                        > candidates[remaining[best_pos]].climate_match_score)
                || (combined == best_combined
                    && candidates[cand_idx].climate_match_score == candidates[remaining[best_pos]].climate_match_score
                    && candidates[cand_idx].species_id.as_i64() < candidates[remaining[best_pos]].species_id.as_i64());

            if better {
                best_pos = pos;
                best_combined = combined;
                best_marginal = marginal;
            }
        }

        let chosen = remaining.remove(best_pos);
        selected_idx.push(chosen);
        contributions.push(best_marginal);
    }

    let n = selected_idx.len();
    let mut pairwise_sum = 0.0;
    let mut pairwise_count = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            pairwise_sum += gower_distance(&feats[selected_idx[i]], &feats[selected_idx[j]]);
            pairwise_count += 1;
        }
    }
    let functional_diversity = if pairwise_count > 0 { pairwise_sum / pairwise_count as f64 } else { 0.0 };

    let families: std::collections::HashSet<&str> =
        selected_idx.iter().map(|&i| candidates[i].family.as_str()).collect();
    let growth_forms: std::collections::HashSet<Option<GrowthForm>> =
        selected_idx.iter().map(|&i| candidates[i].growth_form).collect();

    let phylogenetic_diversity = families.len() as f64 / n as f64;
    let growth_form_richness = growth_forms.len() as f64 / GROWTH_FORM_RICHNESS_DIVISOR;
    let total_diversity_score = 0.5 * functional_diversity + 0.25 * phylogenetic_diversity + 0.25 * growth_form_richness;

    let n_families = families.len();
    let n_growth_forms = growth_forms.len();

    let selected: Vec<SelectedSpecies> = selected_idx
        .into_iter()
        .zip(contributions)
        .enumerate()
        .map(|(rank0, (idx, contribution))| SelectedSpecies {
            candidate: candidates[idx].clone(),
            selection_rank: rank0 + 1,
            diversity_contribution: round3(contribution),
        })
        .collect();

    SelectionResult {
        selected,
        metrics: DiversityMetrics {
            functional_diversity: round3(functional_diversity),
            phylogenetic_diversity: round3(phylogenetic_diversity),
            growth_form_richness: round3(growth_form_richness),
            total_diversity_score: round3(total_diversity_score),
            n_species: n,
            n_families,
            n_growth_forms,
        },
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, family: &str, gf: GrowthForm, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            species_id: SpeciesId::new(id),
            canonical_name: format!("Species {id}"),
            family: family.to_string(),
            growth_form: Some(gf),
            is_nitrogen_fixer: false,
            dispersal_animal: false,
            dispersal_wind: false,
            max_height_m: None,
            lifespan_years: None,
            threat_status: None,
            is_native: true,
            is_endemic: false,
            climate_match_score: score,
        }
    }

    #[test]
    fn seed_is_highest_scoring_candidate() {
        let candidates = vec![
            candidate(1, "Fabaceae", GrowthForm::Tree, 0.8),
            candidate(2, "Myrtaceae", GrowthForm::Shrub, 0.95),
            candidate(3, "Poaceae", GrowthForm::Graminoid, 0.6),
        ];
        let result = select_diverse(candidates, 3);
        assert_eq!(result.selected[0].candidate.species_id, SpeciesId::new(2));
        assert_eq!(result.selected[0].selection_rank, 1);
        assert_eq!(result.selected[0].diversity_contribution, 1.0);
    }

    #[test]
    fn selection_ranks_are_a_permutation() {
        let candidates = vec![
            candidate(1, "Fabaceae", GrowthForm::Tree, 0.9),
            candidate(2, "Myrtaceae", GrowthForm::Shrub, 0.85),
            candidate(3, "Poaceae", GrowthForm::Graminoid, 0.7),
            candidate(4, "Bignoniaceae", GrowthForm::Tree, 0.6),
        ];
        let result = select_diverse(candidates, 4);
        let mut ranks: Vec<usize> = result.selected.iter().map(|s| s.selection_rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn caps_selection_at_k_even_with_more_candidates() {
        let candidates = vec![
            candidate(1, "Fabaceae", GrowthForm::Tree, 0.9),
            candidate(2, "Myrtaceae", GrowthForm::Shrub, 0.85),
            candidate(3, "Poaceae", GrowthForm::Graminoid, 0.7),
        ];
        let result = select_diverse(candidates, 2);
        assert_eq!(result.selected.len(), 2);
        assert_eq!(result.metrics.n_species, 2);
    }

    #[test]
    fn growth_form_richness_uses_fixed_divisor_of_five() {
        let candidates = vec![
            candidate(1, "A", GrowthForm::Tree, 0.9),
            candidate(2, "B", GrowthForm::Shrub, 0.8),
        ];
        let result = select_diverse(candidates, 2);
        assert_eq!(result.metrics.growth_form_richness, 2.0 / 5.0);
    }
}
