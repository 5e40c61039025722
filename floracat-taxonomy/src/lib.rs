//! Taxonomic name disambiguation against a reference backbone.
//!
//! The disambiguator is a pure function over an in-memory [`BackboneIndex`]
//! built once per crawler run: exact match, then case/whitespace fold, then
//! authority/year stripping, then fuzzy match, then unmatched. It never
//! deletes input rows, only annotates them.

use std::collections::HashMap;

use floracat_core::SpeciesId;
use tracing::debug;

/// Levenshtein distance ceiling on the specific epithet for a fuzzy match.
pub const FUZZY_EPITHET_MAX_DISTANCE: usize = 2;
/// Jaro-Winkler similarity floor on the full name for a fuzzy match.
pub const FUZZY_NAME_MIN_SIMILARITY: f64 = 0.92;
/// Minimum similarity gap between the best and second-best fuzzy candidate.
pub const FUZZY_MIN_SCORE_GAP: f64 = 0.05;

/// An in-memory index over the taxonomic backbone, built once per crawler
/// or consolidation run from `CatalogStore::all_canonical_names`.
#[derive(Debug, Default)]
pub struct BackboneIndex {
    by_exact_name: HashMap<String, (SpeciesId, String)>,
    by_folded_name: HashMap<String, (SpeciesId, String)>,
    entries: Vec<(SpeciesId, String)>,
}

impl BackboneIndex {
    /// Build an index from `(species_id, canonical_name)` pairs.
    pub fn build(entries: Vec<(SpeciesId, String)>) -> Self {
        let mut by_exact_name = HashMap::with_capacity(entries.len());
        let mut by_folded_name = HashMap::with_capacity(entries.len());
        for (id, name) in &entries {
            by_exact_name.insert(name.clone(), (*id, name.clone()));
            by_folded_name.insert(fold(name), (*id, name.clone()));
        }
        Self { by_exact_name, by_folded_name, entries }
    }

    /// Number of names in the backbone.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backbone is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The step at which a name was resolved, carried through for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    Exact,
    CaseFold,
    AuthorityStrip,
    Fuzzy,
}

/// Outcome of disambiguating one raw name against a [`BackboneIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum DisambiguationOutcome {
    Matched {
        backbone_id: SpeciesId,
        accepted_name: String,
        step: MatchStep,
    },
    Unmatched {
        reason: String,
    },
}

/// Resolve one raw scientific name to a backbone entry.
pub fn disambiguate(index: &BackboneIndex, raw_name: &str) -> DisambiguationOutcome {
    if let Some((id, name)) = index.by_exact_name.get(raw_name) {
        return DisambiguationOutcome::Matched {
            backbone_id: *id,
            accepted_name: name.clone(),
            step: MatchStep::Exact,
        };
    }

    let folded = fold(raw_name);
    if let Some((id, name)) = index.by_folded_name.get(&folded) {
        return DisambiguationOutcome::Matched {
            backbone_id: *id,
            accepted_name: name.clone(),
            step: MatchStep::CaseFold,
        };
    }

    let stripped = strip_authority_year(raw_name);
    let folded_stripped = fold(&stripped);
    if folded_stripped != folded {
        if let Some((id, name)) = index.by_folded_name.get(&folded_stripped) {
            return DisambiguationOutcome::Matched {
                backbone_id: *id,
                accepted_name: name.clone(),
                step: MatchStep::AuthorityStrip,
            };
        }
    }

    match fuzzy_match(index, &stripped) {
        Some((id, name)) => DisambiguationOutcome::Matched {
            backbone_id: id,
            accepted_name: name,
            step: MatchStep::Fuzzy,
        },
        None => {
            debug!(name = raw_name, "no backbone match at any step");
            DisambiguationOutcome::Unmatched {
                reason: "no candidate within fuzzy-match thresholds".to_string(),
            }
        }
    }
}

/// Disambiguate a batch, logging a yield-percentage summary at the end —
/// the per-batch density the crawlers use for their own run reports.
pub fn disambiguate_batch(
    index: &BackboneIndex,
    raw_names: &[String],
) -> Vec<DisambiguationOutcome> {
    let outcomes: Vec<_> = raw_names.iter().map(|n| disambiguate(index, n)).collect();
    let matched = outcomes
        .iter()
        .filter(|o| matches!(o, DisambiguationOutcome::Matched { .. }))
        .count();
    if !raw_names.is_empty() {
        let yield_pct = 100.0 * matched as f64 / raw_names.len() as f64;
        tracing::info!(
            total = raw_names.len(),
            matched,
            yield_pct = format!("{:.1}", yield_pct),
            "disambiguation batch complete"
        );
    }
    outcomes
}

fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip trailing authority/year tokens, keeping only the leading binomial
/// (genus + specific epithet, plus an optional infraspecific epithet when
/// it immediately follows a rank marker like `var.`/`subsp.`).
fn strip_authority_year(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.len() <= 2 {
        return name.to_string();
    }
    let mut kept = vec![tokens[0], tokens[1]];
    let mut i = 2;
    while i < tokens.len() {
        let t = tokens[i];
        if t == "var." || t == "subsp." || t == "f." {
            if i + 1 < tokens.len() {
                kept.push(t);
                kept.push(tokens[i + 1]);
                i += 2;
                continue;
            }
        }
        break;
    }
    kept.join(" ")
}

fn fuzzy_match(index: &BackboneIndex, name: &str) -> Option<(SpeciesId, String)> {
    let query_epithet = name.split_whitespace().nth(1)?;
    let query_folded = fold(name);

    let mut scored: Vec<(f64, SpeciesId, String)> = Vec::new();
    for (id, candidate) in &index.entries {
        let candidate_epithet = match candidate.split_whitespace().nth(1) {
            Some(e) => e,
            None => continue,
        };
        let epithet_distance = strsim::levenshtein(query_epithet, candidate_epithet);
        if epithet_distance > FUZZY_EPITHET_MAX_DISTANCE {
            continue;
        }
        let similarity = strsim::jaro_winkler(&query_folded, &fold(candidate));
        if similarity < FUZZY_NAME_MIN_SIMILARITY {
            continue;
        }
        scored.push((similarity, *id, candidate.clone()));
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    match scored.as_slice() {
        [] => None,
        [only] => Some((only.1, only.2.clone())),
        [best, second, ..] => {
            if best.0 - second.0 >= FUZZY_MIN_SCORE_GAP {
                Some((best.1, best.2.clone()))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> BackboneIndex {
        BackboneIndex::build(vec![
            (SpeciesId::new(1), "Cedrela fissilis".to_string()),
            (SpeciesId::new(2), "Cedrela odorata".to_string()),
            (SpeciesId::new(3), "Handroanthus impetiginosus".to_string()),
        ])
    }

    #[test]
    fn exact_match() {
        let idx = index();
        let outcome = disambiguate(&idx, "Cedrela fissilis");
        assert_eq!(
            outcome,
            DisambiguationOutcome::Matched {
                backbone_id: SpeciesId::new(1),
                accepted_name: "Cedrela fissilis".to_string(),
                step: MatchStep::Exact,
            }
        );
    }

    #[test]
    fn case_and_whitespace_fold() {
        let idx = index();
        let outcome = disambiguate(&idx, "  cedrela   FISSILIS ");
        assert_eq!(
            outcome,
            DisambiguationOutcome::Matched {
                backbone_id: SpeciesId::new(1),
                accepted_name: "Cedrela fissilis".to_string(),
                step: MatchStep::CaseFold,
            }
        );
    }

    #[test]
    fn authority_and_year_stripped() {
        let idx = index();
        let outcome = disambiguate(&idx, "Cedrela fissilis Vell. 1829");
        assert_eq!(
            outcome,
            DisambiguationOutcome::Matched {
                backbone_id: SpeciesId::new(1),
                accepted_name: "Cedrela fissilis".to_string(),
                step: MatchStep::AuthorityStrip,
            }
        );
    }

    #[test]
    fn fuzzy_match_on_misspelling() {
        let idx = index();
        let outcome = disambiguate(&idx, "Cedrela fisilis");
        assert_eq!(
            outcome,
            DisambiguationOutcome::Matched {
                backbone_id: SpeciesId::new(1),
                accepted_name: "Cedrela fissilis".to_string(),
                step: MatchStep::Fuzzy,
            }
        );
    }

    #[test]
    fn ambiguous_candidates_are_unmatched() {
        let idx = BackboneIndex::build(vec![
            (SpeciesId::new(1), "Cedrela fissila".to_string()),
            (SpeciesId::new(2), "Cedrela fissilia".to_string()),
        ]);
        let outcome = disambiguate(&idx, "Cedrela fissili");
        assert!(matches!(outcome, DisambiguationOutcome::Unmatched { .. }));
    }

    #[test]
    fn unrelated_name_is_unmatched() {
        let idx = index();
        let outcome = disambiguate(&idx, "Zzyzx completely unrelated");
        assert!(matches!(outcome, DisambiguationOutcome::Unmatched { .. }));
    }
}
