//! Core type definitions for FloraCat
//!
//! Newtype identifiers follow the same `new`/`Display` shape the platform
//! uses throughout.

use chrono::{DateTime, Utc};
use geo::{MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque stable identifier for a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub i64);

impl SpeciesId {
    /// Wrap a raw id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A coarse geographic partition code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionCode(pub String);

impl RegionCode {
    /// Wrap a raw code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the underlying code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RegionCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Taxonomic status of a species row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomicStatus {
    /// The accepted, canonical name.
    Accepted,
    /// A synonym of an accepted species; `accepted_species_id` must be set.
    Synonym,
    /// Could not be disambiguated against the backbone.
    Unresolved,
}

/// Canonical growth-form equivalence classes.
///
/// This is the closed surface stored on `UnifiedTrait`. The query-side
/// umbrella terms `herb` (→ forb, graminoid) and `climber` (→ liana, vine,
/// scrambler) are expanded in `floracat-recommend`, never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthForm {
    Tree,
    Shrub,
    Subshrub,
    Liana,
    Vine,
    Scrambler,
    Forb,
    Graminoid,
    Palm,
    Bamboo,
    Other,
}

impl GrowthForm {
    /// All canonical variants, in a stable order (used for `growth_form_richness`).
    pub const ALL: [GrowthForm; 11] = [
        GrowthForm::Tree,
        GrowthForm::Shrub,
        GrowthForm::Subshrub,
        GrowthForm::Liana,
        GrowthForm::Vine,
        GrowthForm::Scrambler,
        GrowthForm::Forb,
        GrowthForm::Graminoid,
        GrowthForm::Palm,
        GrowthForm::Bamboo,
        GrowthForm::Other,
    ];

    /// Database/wire tag for this growth form.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthForm::Tree => "tree",
            GrowthForm::Shrub => "shrub",
            GrowthForm::Subshrub => "subshrub",
            GrowthForm::Liana => "liana",
            GrowthForm::Vine => "vine",
            GrowthForm::Scrambler => "scrambler",
            GrowthForm::Forb => "forb",
            GrowthForm::Graminoid => "graminoid",
            GrowthForm::Palm => "palm",
            GrowthForm::Bamboo => "bamboo",
            GrowthForm::Other => "other",
        }
    }

    /// Parse a canonical tag back into a `GrowthForm`. Source-vocabulary
    /// normalization (mapping e.g. "arbusto"/"tree-like" onto this set)
    /// happens in `floracat-ingest::vocab`, not here.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "tree" => Some(GrowthForm::Tree),
            "shrub" => Some(GrowthForm::Shrub),
            "subshrub" => Some(GrowthForm::Subshrub),
            "liana" => Some(GrowthForm::Liana),
            "vine" => Some(GrowthForm::Vine),
            "scrambler" => Some(GrowthForm::Scrambler),
            "forb" => Some(GrowthForm::Forb),
            "graminoid" => Some(GrowthForm::Graminoid),
            "palm" => Some(GrowthForm::Palm),
            "bamboo" => Some(GrowthForm::Bamboo),
            "other" => Some(GrowthForm::Other),
            _ => None,
        }
    }

    /// `is_tree` flag.
    pub fn is_tree(&self) -> bool {
        matches!(self, GrowthForm::Tree)
    }

    /// `is_shrub` flag: {shrub, subshrub}.
    pub fn is_shrub(&self) -> bool {
        matches!(self, GrowthForm::Shrub | GrowthForm::Subshrub)
    }

    /// `is_climber` flag: {liana, vine, scrambler}.
    pub fn is_climber(&self) -> bool {
        matches!(self, GrowthForm::Liana | GrowthForm::Vine | GrowthForm::Scrambler)
    }

    /// `is_herb` flag: {forb, graminoid}.
    pub fn is_herb(&self) -> bool {
        matches!(self, GrowthForm::Forb | GrowthForm::Graminoid)
    }

    /// `is_palm` flag.
    pub fn is_palm(&self) -> bool {
        matches!(self, GrowthForm::Palm)
    }
}

impl fmt::Display for GrowthForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// IUCN-style threat status, as carried by RawTrait/UnifiedTrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatStatus {
    /// Critically Endangered
    Cr,
    /// Endangered
    En,
    /// Vulnerable
    Vu,
    /// Near Threatened
    Nt,
    /// Least Concern
    Lc,
    /// Data Deficient
    Dd,
    /// Not Evaluated
    Ne,
}

impl ThreatStatus {
    /// Whether this status is in the "threatened" set excluded by
    /// `include_threatened: false`.
    pub fn is_threatened(&self) -> bool {
        matches!(self, ThreatStatus::Cr | ThreatStatus::En | ThreatStatus::Vu)
    }
}

/// Canonical plant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub canonical_name: String,
    pub genus: String,
    pub family: String,
    pub backbone_id: Option<String>,
    pub taxonomic_status: TaxonomicStatus,
    pub accepted_species_id: Option<SpeciesId>,
}

impl Species {
    /// Invariant 1: a synonym must point at an accepted species.
    /// This only checks the shape of this row (status vs. pointer presence);
    /// resolving the pointer's target status is a store-level join.
    pub fn has_consistent_synonym_link(&self) -> bool {
        match self.taxonomic_status {
            TaxonomicStatus::Synonym => self.accepted_species_id.is_some(),
            _ => true,
        }
    }
}

/// Vernacular names for a species in the two languages the recommendation
/// API surfaces. Either may be absent; a species with neither still
/// recommends fine, it just falls back to `canonical_name` in the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonNames {
    pub pt: Option<String>,
    pub en: Option<String>,
}

/// A value paired with the source it was chosen from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: String,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self { value, source: source.into() }
    }
}

/// One row per source per species, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrait {
    pub species_id: SpeciesId,
    pub source: String,
    pub growth_form: Option<GrowthForm>,
    /// Verbatim source value, retained for audit.
    pub raw_growth_form: Option<String>,
    pub max_height_m: Option<f64>,
    pub woodiness: Option<String>,
    pub nitrogen_fixer: Option<bool>,
    pub dispersal_syndrome: Option<String>,
    pub deciduousness: Option<String>,
    pub lifespan_years: Option<f64>,
    pub threat_status: Option<ThreatStatus>,
}

/// One row per species, fused from `RawTrait` under a precedence policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTrait {
    pub species_id: SpeciesId,
    pub growth_form: Option<Sourced<GrowthForm>>,
    pub max_height_m: Option<Sourced<f64>>,
    pub woodiness: Option<Sourced<String>>,
    pub nitrogen_fixer: Option<Sourced<bool>>,
    pub dispersal_syndrome: Option<Sourced<String>>,
    pub deciduousness: Option<Sourced<String>>,
    pub lifespan_years: Option<Sourced<f64>>,
    pub threat_status: Option<Sourced<ThreatStatus>>,
    pub is_tree: bool,
    pub is_shrub: bool,
    pub is_climber: bool,
    pub is_herb: bool,
    pub is_palm: bool,
    pub is_brazil_native: bool,
}

impl UnifiedTrait {
    /// Recompute the derived booleans from `growth_form`.
    /// Must be called whenever `growth_form` changes — `UnifiedTrait` values
    /// are never persisted with stale derived fields.
    pub fn recompute_derived_booleans(&mut self) {
        let gf = self.growth_form.as_ref().map(|s| s.value);
        self.is_tree = gf.map(|g| g.is_tree()).unwrap_or(false);
        self.is_shrub = gf.map(|g| g.is_shrub()).unwrap_or(false);
        self.is_climber = gf.map(|g| g.is_climber()).unwrap_or(false);
        self.is_herb = gf.map(|g| g.is_herb()).unwrap_or(false);
        self.is_palm = gf.map(|g| g.is_palm()).unwrap_or(false);
    }
}

/// A cell of the world coarse geographic partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub code: RegionCode,
    pub name: String,
    pub continent: String,
    #[serde(skip)]
    pub geometry: Option<MultiPolygon<f64>>,
}

/// Native/endemic/introduced flags for a `(species, region)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFlags {
    pub is_native: bool,
    pub is_endemic: bool,
    pub is_introduced: bool,
}

impl RegionFlags {
    /// Conflict resolution across sources: OR the flags.
    pub fn merge(self, other: RegionFlags) -> RegionFlags {
        RegionFlags {
            is_native: self.is_native || other.is_native,
            is_endemic: self.is_endemic || other.is_endemic,
            is_introduced: self.is_introduced || other.is_introduced,
        }
    }
}

/// `(species_id, region_code)` membership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesRegion {
    pub species_id: SpeciesId,
    pub region_code: RegionCode,
    pub flags: RegionFlags,
    pub source: String,
}

/// Materialized per-species range geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesGeometry {
    pub species_id: SpeciesId,
    #[serde(skip)]
    pub native_range: Option<MultiPolygon<f64>>,
    #[serde(skip)]
    pub full_range: Option<MultiPolygon<f64>>,
    #[serde(skip)]
    pub bbox: Option<Rect<f64>>,
    #[serde(skip)]
    pub centroid: Option<Point<f64>>,
    pub native_area_km2: f64,
    pub full_area_km2: f64,
    pub native_region_count: i32,
    pub full_region_count: i32,
}

/// Five-variable bioclimatic vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BioVector {
    /// bio1 — annual mean temperature (°C)
    pub temp_mean: f64,
    /// bio5 — max temperature of warmest month (°C)
    pub temp_max_warm: f64,
    /// bio6 — min temperature of coldest month (°C)
    pub temp_min_cold: f64,
    /// bio12 — annual precipitation (mm)
    pub precip: f64,
    /// bio15 — precipitation seasonality (coefficient of variation)
    pub seasonality: f64,
}

/// Min/mean/max triple, used throughout `RegionClimate` and the derivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MinMeanMax {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Per-region aggregate of the bioclimatic variables the core consumes:
/// min/mean/max for the five named below. The remaining fourteen of the
/// nineteen standard bioclimatic variables are retained upstream but not
/// surfaced through this type since no component reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionClimateStats {
    pub temp_mean: MinMeanMax,
    pub temp_max_warm: MinMeanMax,
    pub temp_min_cold: MinMeanMax,
    pub precip: MinMeanMax,
    pub seasonality: MinMeanMax,
}

/// `RegionClimate` row: a region code paired with its aggregate stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionClimate {
    pub region_code: RegionCode,
    pub stats: RegionClimateStats,
}

/// Bioclimatic aggregate sampled at one ecoregion's centroid, keyed by
/// `eco_id` rather than `region_code` — the ecoregion-based envelope
/// deriver's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoregionClimate {
    pub eco_id: String,
    pub stats: RegionClimateStats,
}

/// A georeferenced occurrence sighting.
///
/// Samples six bio variables at the point: the five in `BioVector` plus
/// bio4 (temperature seasonality), used by the occurrence-based deriver as
/// a secondary dispersion signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    pub upstream_id: String,
    pub species_id: SpeciesId,
    pub lat: f64,
    pub lon: f64,
    pub uncertainty_m: f64,
    pub year: i32,
    pub country_code: Option<String>,
    pub bio: BioVector,
    pub temp_seasonality: f64,
}

/// One `(species, ecoregion)` observation count, input to the
/// ecoregion-based envelope deriver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoregionObservation {
    pub species_id: SpeciesId,
    pub eco_id: String,
    pub n_observations: i64,
}

/// Source of a `ClimateEnvelope`, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeSource {
    Region,
    Ecoregion,
    Occurrence,
}

impl EnvelopeSource {
    /// Higher is more preferred: `Occurrence > Ecoregion > Region`.
    pub fn priority(&self) -> u8 {
        match self {
            EnvelopeSource::Occurrence => 2,
            EnvelopeSource::Ecoregion => 1,
            EnvelopeSource::Region => 0,
        }
    }
}

impl fmt::Display for EnvelopeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnvelopeSource::Occurrence => "occurrence",
            EnvelopeSource::Ecoregion => "ecoregion",
            EnvelopeSource::Region => "region",
        };
        write!(f, "{}", s)
    }
}

/// `envelope_quality`, derived from sample-count thresholds
/// documented per deriver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeQuality {
    High,
    Medium,
    Low,
}

/// Temperature statistics shared by all three envelope variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Present only for the occurrence-based variant.
    pub p05: Option<f64>,
    pub p95: Option<f64>,
}

/// Precipitation statistics shared by all three envelope variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub seasonality_mean: f64,
}

/// One row per species per variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateEnvelope {
    pub species_id: SpeciesId,
    pub source: EnvelopeSource,
    pub temp: TemperatureStats,
    pub precip: PrecipitationStats,
    pub sample_count: i64,
    pub quality: EnvelopeQuality,
    /// True when `temp.{p05,p95}` fell back to min/max because
    /// `sample_count < 20`.
    pub percentile_fallback: bool,
}

/// `source_consensus` for the unified envelope view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConsensus {
    High,
    Medium,
    Single,
}

/// Deterministic best-available envelope per species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedEnvelope {
    pub species_id: SpeciesId,
    pub envelope: ClimateEnvelope,
    pub envelope_source: EnvelopeSource,
    pub source_consensus: SourceConsensus,
}

/// Aggregate diversity metrics for a recommendation response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub functional_diversity: f64,
    pub phylogenetic_diversity: f64,
    pub growth_form_richness: f64,
    pub total_diversity_score: f64,
    pub n_species: usize,
    pub n_families: usize,
    pub n_growth_forms: usize,
}

/// Cache row for recommendation responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationCacheEntry {
    pub cache_key: String,
    pub request_parameters: serde_json::Value,
    pub species_ids: Vec<SpeciesId>,
    pub diversity_metrics: DiversityMetrics,
    /// The full serialized response, replayed verbatim on a cache hit.
    pub response_body: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub hit_count: i64,
}

/// `CrawlerState` row: one per crawler kind, tracks checkpoint and the
/// one-instance-per-kind run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerState {
    pub crawler_name: String,
    pub status: CrawlerStatus,
    pub cursor: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerStatus {
    Idle,
    Running,
    Failed,
}

/// `CrawlerRun` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerRun {
    pub id: i64,
    pub crawler_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CrawlerRunStatus,
    pub records_processed: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerRunStatus {
    Running,
    Succeeded,
    Failed,
}
