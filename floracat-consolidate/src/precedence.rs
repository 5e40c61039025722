//! Static precedence tables consulted by [`crate::trait_consolidator`].
//!
//! Kept as data rather than as chained fallback logic inside the fusion
//! function itself, so adding or reordering a source is a one-line change
//! here instead of a code change at every call site.

/// Canonical source tags a trait-source crawler may stamp onto a
/// `RawTrait` row. Crawlers are free to use other tags (e.g. a new
/// regional checklist); unlisted tags fall after every listed one, in the
/// order they're first seen, rather than being rejected.
pub const TRAIT_SOURCE_1: &str = "trait_source_1";
pub const TRAIT_SOURCE_2: &str = "trait_source_2";
pub const TAXONOMIC_SOURCE: &str = "taxonomic_source";
pub const VALIDATION_SOURCE: &str = "validation_source";
pub const CURATED_LIST: &str = "curated_list";
pub const AUXILIARY: &str = "auxiliary";

/// Default attribute precedence, most-trusted first.
pub const DEFAULT_PRECEDENCE: &[&str] = &[
    TRAIT_SOURCE_1,
    TRAIT_SOURCE_2,
    TAXONOMIC_SOURCE,
    VALIDATION_SOURCE,
    CURATED_LIST,
    AUXILIARY,
];

/// `growth_form` favors the taxonomic source over the generic trait
/// sources — growth form is definitional there, not a measured trait.
pub const GROWTH_FORM_PRECEDENCE: &[&str] = &[
    TAXONOMIC_SOURCE,
    TRAIT_SOURCE_1,
    TRAIT_SOURCE_2,
    VALIDATION_SOURCE,
    CURATED_LIST,
    AUXILIARY,
];

/// `lifespan_years` favors a physiological-trait source (`trait_source_2`)
/// over the curated list, which only carries lifespan for a subset of
/// long-lived species.
pub const LIFESPAN_YEARS_PRECEDENCE: &[&str] = &[
    TRAIT_SOURCE_2,
    TRAIT_SOURCE_1,
    TAXONOMIC_SOURCE,
    VALIDATION_SOURCE,
    CURATED_LIST,
    AUXILIARY,
];

/// `threat_status` favors the validation source, which mirrors the formal
/// assessment process, over the generic trait sources.
pub const THREAT_STATUS_PRECEDENCE: &[&str] = &[
    VALIDATION_SOURCE,
    TRAIT_SOURCE_1,
    TRAIT_SOURCE_2,
    TAXONOMIC_SOURCE,
    CURATED_LIST,
    AUXILIARY,
];

/// Rank a source tag against a precedence list: lower is more trusted.
/// Unlisted tags sort after every listed tag, in a stable order relative
/// to one another (by first index of appearance among the candidates,
/// left to the caller).
pub fn rank(precedence: &[&str], source: &str) -> usize {
    precedence
        .iter()
        .position(|s| *s == source)
        .unwrap_or(precedence.len())
}

/// Pick the value from the highest-ranked (lowest `rank`) candidate that
/// has one. Ties within the same rank keep the first candidate in
/// iteration order — callers pass candidates pre-sorted by ingestion
/// order so this is deterministic across reruns.
pub fn pick_by_precedence<'a, T>(
    precedence: &[&str],
    candidates: impl Iterator<Item = (&'a str, Option<T>)>,
) -> Option<(T, &'a str)> {
    let mut best: Option<(usize, T, &'a str)> = None;
    for (source, value) in candidates {
        let Some(value) = value else { continue };
        let r = rank(precedence, source);
        if best.as_ref().map(|(br, ..)| r < *br).unwrap_or(true) {
            best = Some((r, value, source));
        }
    }
    best.map(|(_, value, source)| (value, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_ranked_source_wins_even_when_seen_later() {
        let candidates = vec![("curated_list", Some(10.0)), ("trait_source_1", Some(20.0))];
        let (value, source) =
            pick_by_precedence(DEFAULT_PRECEDENCE, candidates.into_iter()).unwrap();
        assert_eq!(value, 20.0);
        assert_eq!(source, "trait_source_1");
    }

    #[test]
    fn null_values_are_skipped() {
        let candidates = vec![("trait_source_1", None), ("trait_source_2", Some(5.0))];
        let (value, source) =
            pick_by_precedence(DEFAULT_PRECEDENCE, candidates.into_iter()).unwrap();
        assert_eq!(value, 5.0);
        assert_eq!(source, "trait_source_2");
    }

    #[test]
    fn unlisted_source_ranks_last() {
        let candidates = vec![("some_new_checklist", Some(1.0)), ("auxiliary", Some(2.0))];
        let (value, source) =
            pick_by_precedence(DEFAULT_PRECEDENCE, candidates.into_iter()).unwrap();
        assert_eq!(value, 2.0);
        assert_eq!(source, "auxiliary");
    }

    #[test]
    fn lifespan_favors_physiological_source_over_curated_list() {
        let candidates = vec![("curated_list", Some(200.0)), ("trait_source_2", Some(180.0))];
        let (value, source) =
            pick_by_precedence(LIFESPAN_YEARS_PRECEDENCE, candidates.into_iter()).unwrap();
        assert_eq!(value, 180.0);
        assert_eq!(source, "trait_source_2");
    }
}
