//! Per-source vocabulary mapping onto the canonical growth-form and threat
//! status sets (§3). Kept as static tables next to the crawlers that
//! consume them rather than in the store, so a new source only requires a
//! new table entry, not a schema change.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use floracat_core::{GrowthForm, ThreatStatus};

/// Growth-form vocabulary used by the trait-source crawlers, keyed by the
/// lowercased raw term as it appears upstream. Ambiguous upstream terms
/// that don't map cleanly are deliberately left unmapped so the raw value
/// is retained for audit instead of silently guessed.
static GROWTH_FORM_SYNONYMS: Lazy<HashMap<&'static str, GrowthForm>> = Lazy::new(|| {
    use GrowthForm::*;
    HashMap::from([
        ("tree", Tree),
        ("arvore", Tree),
        ("árvore", Tree),
        ("shrub", Shrub),
        ("arbusto", Shrub),
        ("subshrub", Subshrub),
        ("subarbusto", Subshrub),
        ("liana", Liana),
        ("woody vine", Liana),
        ("vine", Vine),
        ("trepadeira", Vine),
        ("scrambler", Scrambler),
        ("forb", Forb),
        ("herb", Forb),
        ("erva", Forb),
        ("graminoid", Graminoid),
        ("grass", Graminoid),
        ("gramínea", Graminoid),
        ("palm", Palm),
        ("palmeira", Palm),
        ("bamboo", Bamboo),
        ("bambu", Bamboo),
    ])
});

/// Threat-status vocabulary, keyed by the lowercased raw term.
static THREAT_STATUS_SYNONYMS: Lazy<HashMap<&'static str, ThreatStatus>> = Lazy::new(|| {
    use ThreatStatus::*;
    HashMap::from([
        ("cr", Cr),
        ("critically endangered", Cr),
        ("en", En),
        ("endangered", En),
        ("vu", Vu),
        ("vulnerable", Vu),
        ("nt", Nt),
        ("near threatened", Nt),
        ("lc", Lc),
        ("least concern", Lc),
        ("dd", Dd),
        ("data deficient", Dd),
        ("ne", Ne),
        ("not evaluated", Ne),
    ])
});

/// Normalize a source-specific growth-form term to the canonical set.
/// Returns `None` for unrecognized vocabulary — callers retain the raw
/// term in `RawTrait::raw_growth_form` regardless of the outcome.
pub fn normalize_growth_form(raw: &str) -> Option<GrowthForm> {
    GROWTH_FORM_SYNONYMS.get(raw.trim().to_lowercase().as_str()).copied()
}

/// Normalize a source-specific threat-status term to the canonical set.
pub fn normalize_threat_status(raw: &str) -> Option<ThreatStatus> {
    THREAT_STATUS_SYNONYMS.get(raw.trim().to_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_terms_case_insensitively() {
        assert_eq!(normalize_growth_form("ÁRVORE"), Some(GrowthForm::Tree));
        assert_eq!(normalize_growth_form("  Shrub "), Some(GrowthForm::Shrub));
        assert_eq!(normalize_threat_status("Vulnerable"), Some(ThreatStatus::Vu));
    }

    #[test]
    fn unrecognized_terms_are_left_unmapped() {
        assert_eq!(normalize_growth_form("epiphytic something"), None);
        assert_eq!(normalize_threat_status("unknown"), None);
    }
}
