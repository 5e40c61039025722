//! Postgres/PostGIS-backed catalog store.
//!
//! This platform only ever runs against Postgres, so a single concrete
//! store stands in place of a multi-backend abstraction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::QueryBuilder;
use tracing::{info, warn};

use floracat_core::config::DatabaseConfig;
use floracat_core::{
    BioVector, ClimateEnvelope, CommonNames, CrawlerRunStatus, CrawlerStatus,
    DiversityMetrics, EcoregionClimate, EcoregionObservation, EnvelopeQuality, EnvelopeSource, GrowthForm, MinMeanMax,
    OccurrenceRecord, PrecipitationStats, RawTrait, RecommendationCacheEntry, RegionClimate,
    RegionClimateStats, RegionCode, RegionFlags, SourceConsensus, Species, SpeciesId,
    SpeciesRegion, TaxonomicStatus, TemperatureStats, ThreatStatus, UnifiedEnvelope, UnifiedTrait,
};

use crate::error::{DatabaseError, DatabaseResult};
use crate::metrics::DatabaseMetrics;
use crate::models::HealthStatus;

/// Handle to the Postgres connection pool and all catalog operations.
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// Connect using a `DatabaseConfig`.
    pub async fn connect(config: &DatabaseConfig) -> DatabaseResult<Self> {
        info!(
            "connecting to catalog store at {}",
            config.url.split('@').last().unwrap_or("unknown")
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run pending schema migrations.
    pub async fn migrate(&self) -> DatabaseResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Internal(e.to_string()))
    }

    /// Shallow connectivity check used by the API's `/api/health` route.
    pub async fn health_check(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                warn!("catalog store health check failed: {}", e);
                HealthStatus::Unhealthy
            }
        }
    }

    /// Installed PostGIS version, surfaced in the health response.
    pub async fn postgis_version(&self) -> DatabaseResult<Option<String>> {
        let version: Option<String> = sqlx::query_scalar("SELECT PostGIS_Version()")
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }

    /// Row counts for the documented health-check table list (§6.2).
    pub async fn table_row_counts(&self) -> DatabaseResult<std::collections::HashMap<String, i64>> {
        const TABLES: &[&str] = &[
            "species",
            "unified_traits",
            "species_regions",
            "species_geometry",
            "climate_envelopes",
            "occurrences",
            "recommendation_cache",
        ];
        let mut counts = std::collections::HashMap::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(&self.pool).await?;
            counts.insert(table.to_string(), count);
        }
        Ok(counts)
    }

    /// Pool-level metrics surfaced alongside service health.
    pub fn metrics(&self) -> DatabaseMetrics {
        DatabaseMetrics {
            active_connections: self.pool.size(),
            max_connections: self.pool.options().get_max_connections(),
            ..Default::default()
        }
    }

    // ---- taxonomy -----------------------------------------------------

    /// Batched upsert of backbone species rows.
    pub async fn upsert_species(&self, species: &[Species]) -> DatabaseResult<u64> {
        if species.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for chunk in species.chunks(500) {
            let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO species (id, canonical_name, genus, family, backbone_id, taxonomic_status, accepted_species_id) ",
            );
            qb.push_values(chunk, |mut b, s| {
                b.push_bind(s.id.as_i64())
                    .push_bind(&s.canonical_name)
                    .push_bind(&s.genus)
                    .push_bind(&s.family)
                    .push_bind(&s.backbone_id)
                    .push_bind(taxonomic_status_tag(s.taxonomic_status))
                    .push_bind(s.accepted_species_id.map(|id| id.as_i64()));
            });
            qb.push(
                " ON CONFLICT (id) DO UPDATE SET \
                  canonical_name = EXCLUDED.canonical_name, \
                  genus = EXCLUDED.genus, \
                  family = EXCLUDED.family, \
                  backbone_id = EXCLUDED.backbone_id, \
                  taxonomic_status = EXCLUDED.taxonomic_status, \
                  accepted_species_id = EXCLUDED.accepted_species_id",
            );
            let result = qb.build().execute(&self.pool).await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Find a species by its exact canonical name — the taxonomy
    /// disambiguator's first match tier.
    pub async fn find_species_by_canonical_name(
        &self,
        name: &str,
    ) -> DatabaseResult<Option<Species>> {
        let row = sqlx::query_as::<_, SpeciesRow>(
            "SELECT id, canonical_name, genus, family, backbone_id, taxonomic_status, accepted_species_id \
             FROM species WHERE canonical_name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Fetch every canonical name, used to build the fuzzy-match candidate
    /// pool in `floracat-taxonomy` (kept small: one column, streamed once
    /// per crawl run rather than per record).
    pub async fn all_canonical_names(&self) -> DatabaseResult<Vec<(SpeciesId, String)>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, canonical_name FROM species")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, name)| (SpeciesId::new(id), name)).collect())
    }

    /// Batch-upsert vernacular names, keyed by species id. Either language
    /// column may be `None`; an upsert only overwrites columns present in
    /// `names` for that row, so a later source can fill in the other
    /// language without clobbering an earlier one.
    pub async fn upsert_common_names(
        &self,
        rows: &[(SpeciesId, CommonNames)],
    ) -> DatabaseResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for chunk in rows.chunks(500) {
            let mut qb: QueryBuilder<sqlx::Postgres> =
                QueryBuilder::new("INSERT INTO common_names (species_id, name_pt, name_en) ");
            qb.push_values(chunk, |mut b, (id, names)| {
                b.push_bind(id.as_i64())
                    .push_bind(names.pt.clone())
                    .push_bind(names.en.clone());
            });
            qb.push(
                " ON CONFLICT (species_id) DO UPDATE SET \
                  name_pt = COALESCE(EXCLUDED.name_pt, common_names.name_pt), \
                  name_en = COALESCE(EXCLUDED.name_en, common_names.name_en)",
            );
            let result = qb.build().execute(&self.pool).await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Fetch vernacular names for a set of species, e.g. to decorate a
    /// recommendation response. Species with no row present are simply
    /// absent from the returned map.
    pub async fn common_names_for(
        &self,
        species_ids: &[SpeciesId],
    ) -> DatabaseResult<std::collections::HashMap<SpeciesId, CommonNames>> {
        if species_ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let ids: Vec<i64> = species_ids.iter().map(|id| id.as_i64()).collect();
        let rows: Vec<(i64, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT species_id, name_pt, name_en FROM common_names WHERE species_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, pt, en)| (SpeciesId::new(id), CommonNames { pt, en }))
            .collect())
    }

    // ---- raw / unified traits -------------------------------------------

    /// Append-only raw trait rows, one batch per crawler source.
    pub async fn insert_raw_traits(&self, traits: &[RawTrait]) -> DatabaseResult<u64> {
        if traits.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for chunk in traits.chunks(500) {
            let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO raw_traits (species_id, source, growth_form, raw_growth_form, max_height_m, \
                 woodiness, nitrogen_fixer, dispersal_syndrome, deciduousness, lifespan_years, threat_status) ",
            );
            qb.push_values(chunk, |mut b, t| {
                b.push_bind(t.species_id.as_i64())
                    .push_bind(&t.source)
                    .push_bind(t.growth_form.map(|g| g.as_str()))
                    .push_bind(&t.raw_growth_form)
                    .push_bind(t.max_height_m)
                    .push_bind(&t.woodiness)
                    .push_bind(t.nitrogen_fixer)
                    .push_bind(&t.dispersal_syndrome)
                    .push_bind(&t.deciduousness)
                    .push_bind(t.lifespan_years)
                    .push_bind(t.threat_status.map(threat_status_tag));
            });
            let result = qb.build().execute(&self.pool).await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// All raw trait rows for one species, in source-ingestion order — the
    /// input to the precedence fusion run by `floracat-consolidate`.
    pub async fn raw_traits_for_species(&self, species_id: SpeciesId) -> DatabaseResult<Vec<RawTrait>> {
        let rows: Vec<RawTraitRow> = sqlx::query_as(
            "SELECT species_id, source, growth_form, raw_growth_form, max_height_m, woodiness, \
             nitrogen_fixer, dispersal_syndrome, deciduousness, lifespan_years, threat_status \
             FROM raw_traits WHERE species_id = $1 ORDER BY ingested_at",
        )
        .bind(species_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Species ids that have at least one raw trait row, used to drive
    /// consolidation runs over the whole catalog.
    pub async fn species_ids_with_raw_traits(&self) -> DatabaseResult<Vec<SpeciesId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT species_id FROM raw_traits")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(SpeciesId::new).collect())
    }

    /// Replace the unified trait row for one species inside a transaction,
    /// so a rerun of the consolidator is never left with a half-written row.
    pub async fn replace_unified_trait(&self, unified: &UnifiedTrait) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM unified_traits WHERE species_id = $1")
            .bind(unified.species_id.as_i64())
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO unified_traits \
             (species_id, growth_form, growth_form_source, max_height_m, max_height_m_source, \
              woodiness, woodiness_source, nitrogen_fixer, nitrogen_fixer_source, \
              dispersal_syndrome, dispersal_syndrome_source, deciduousness, deciduousness_source, \
              lifespan_years, lifespan_years_source, threat_status, threat_status_source, \
              is_tree, is_shrub, is_climber, is_herb, is_palm, is_brazil_native) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)",
        )
        .bind(unified.species_id.as_i64())
        .bind(unified.growth_form.as_ref().map(|s| s.value.as_str()))
        .bind(unified.growth_form.as_ref().map(|s| s.source.clone()))
        .bind(unified.max_height_m.as_ref().map(|s| s.value))
        .bind(unified.max_height_m.as_ref().map(|s| s.source.clone()))
        .bind(unified.woodiness.as_ref().map(|s| s.value.clone()))
        .bind(unified.woodiness.as_ref().map(|s| s.source.clone()))
        .bind(unified.nitrogen_fixer.as_ref().map(|s| s.value))
        .bind(unified.nitrogen_fixer.as_ref().map(|s| s.source.clone()))
        .bind(unified.dispersal_syndrome.as_ref().map(|s| s.value.clone()))
        .bind(unified.dispersal_syndrome.as_ref().map(|s| s.source.clone()))
        .bind(unified.deciduousness.as_ref().map(|s| s.value.clone()))
        .bind(unified.deciduousness.as_ref().map(|s| s.source.clone()))
        .bind(unified.lifespan_years.as_ref().map(|s| s.value))
        .bind(unified.lifespan_years.as_ref().map(|s| s.source.clone()))
        .bind(unified.threat_status.as_ref().map(|s| threat_status_tag(s.value)))
        .bind(unified.threat_status.as_ref().map(|s| s.source.clone()))
        .bind(unified.is_tree)
        .bind(unified.is_shrub)
        .bind(unified.is_climber)
        .bind(unified.is_herb)
        .bind(unified.is_palm)
        .bind(unified.is_brazil_native)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    // ---- regions and distribution ---------------------------------------

    /// Upsert a region's reference geometry (WKT, SRID 4326) and name.
    pub async fn upsert_region(
        &self,
        code: &RegionCode,
        name: &str,
        continent: &str,
        geometry_wkt: &str,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO regions (code, name, continent, geometry) \
             VALUES ($1, $2, $3, ST_Multi(ST_GeomFromText($4, 4326))) \
             ON CONFLICT (code) DO UPDATE SET \
             name = EXCLUDED.name, continent = EXCLUDED.continent, geometry = EXCLUDED.geometry",
        )
        .bind(code.as_str())
        .bind(name)
        .bind(continent)
        .bind(geometry_wkt)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert a region's bioclimatic aggregate, populated by the climate
    /// raster source.
    pub async fn upsert_region_climate(&self, climate: &RegionClimate) -> DatabaseResult<()> {
        let s = &climate.stats;
        sqlx::query(
            "INSERT INTO region_climate \
             (region_code, temp_mean_min, temp_mean_mean, temp_mean_max, \
              temp_max_warm_min, temp_max_warm_mean, temp_max_warm_max, \
              temp_min_cold_min, temp_min_cold_mean, temp_min_cold_max, \
              precip_min, precip_mean, precip_max, \
              seasonality_min, seasonality_mean, seasonality_max) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16) \
             ON CONFLICT (region_code) DO UPDATE SET \
             temp_mean_min = EXCLUDED.temp_mean_min, temp_mean_mean = EXCLUDED.temp_mean_mean, \
             temp_mean_max = EXCLUDED.temp_mean_max, \
             temp_max_warm_min = EXCLUDED.temp_max_warm_min, temp_max_warm_mean = EXCLUDED.temp_max_warm_mean, \
             temp_max_warm_max = EXCLUDED.temp_max_warm_max, \
             temp_min_cold_min = EXCLUDED.temp_min_cold_min, temp_min_cold_mean = EXCLUDED.temp_min_cold_mean, \
             temp_min_cold_max = EXCLUDED.temp_min_cold_max, \
             precip_min = EXCLUDED.precip_min, precip_mean = EXCLUDED.precip_mean, precip_max = EXCLUDED.precip_max, \
             seasonality_min = EXCLUDED.seasonality_min, seasonality_mean = EXCLUDED.seasonality_mean, \
             seasonality_max = EXCLUDED.seasonality_max",
        )
        .bind(climate.region_code.as_str())
        .bind(s.temp_mean.min)
        .bind(s.temp_mean.mean)
        .bind(s.temp_mean.max)
        .bind(s.temp_max_warm.min)
        .bind(s.temp_max_warm.mean)
        .bind(s.temp_max_warm.max)
        .bind(s.temp_min_cold.min)
        .bind(s.temp_min_cold.mean)
        .bind(s.temp_min_cold.max)
        .bind(s.precip.min)
        .bind(s.precip.mean)
        .bind(s.precip.max)
        .bind(s.seasonality.min)
        .bind(s.seasonality.mean)
        .bind(s.seasonality.max)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a region by its exact code.
    pub async fn region_by_code(&self, code: &RegionCode) -> DatabaseResult<Option<RegionClimate>> {
        let row: Option<RegionClimateRow> = sqlx::query_as(
            "SELECT region_code, temp_mean_min, temp_mean_mean, temp_mean_max, \
             temp_max_warm_min, temp_max_warm_mean, temp_max_warm_max, \
             temp_min_cold_min, temp_min_cold_mean, temp_min_cold_max, \
             precip_min, precip_mean, precip_max, \
             seasonality_min, seasonality_mean, seasonality_max \
             FROM region_climate WHERE region_code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Human-readable name for a region code, surfaced in the location echo
    /// of a recommendation response.
    pub async fn region_name(&self, code: &RegionCode) -> DatabaseResult<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM regions WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    /// Resolve the region containing a point via PostGIS `ST_Contains`,
    /// using the same `ST_SetSRID(ST_MakePoint(...), 4326)` idiom used
    /// throughout the occurrence ingestion path.
    pub async fn region_containing_point(&self, lat: f64, lon: f64) -> DatabaseResult<Option<RegionCode>> {
        let code: Option<String> = sqlx::query_scalar(
            "SELECT code FROM regions \
             WHERE ST_Contains(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326)) \
             LIMIT 1",
        )
        .bind(lon)
        .bind(lat)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code.map(RegionCode::new))
    }

    /// Nearest region within `max_degrees` of a point that does not contain
    /// it outright — the fallback step of the location resolver's
    /// normalize-to-region-code algorithm.
    pub async fn nearest_region(
        &self,
        lat: f64,
        lon: f64,
        max_degrees: f64,
    ) -> DatabaseResult<Option<RegionCode>> {
        let code: Option<String> = sqlx::query_scalar(
            "SELECT code FROM regions \
             WHERE ST_DWithin(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326), $3) \
             ORDER BY geometry <-> ST_SetSRID(ST_MakePoint($1, $2), 4326) LIMIT 1",
        )
        .bind(lon)
        .bind(lat)
        .bind(max_degrees)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code.map(RegionCode::new))
    }

    /// Region codes where a species is present, split into native-only and
    /// all-sources sets — the join key the distribution consolidator unions
    /// into `SpeciesGeometry`.
    pub async fn regions_for_species(
        &self,
        species_id: SpeciesId,
        native_only: bool,
    ) -> DatabaseResult<Vec<RegionCode>> {
        let codes: Vec<String> = if native_only {
            sqlx::query_scalar(
                "SELECT region_code FROM species_regions WHERE species_id = $1 AND is_native",
            )
            .bind(species_id.as_i64())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT region_code FROM species_regions WHERE species_id = $1")
                .bind(species_id.as_i64())
                .fetch_all(&self.pool)
                .await?
        };
        Ok(codes.into_iter().map(RegionCode::new).collect())
    }

    /// Climate aggregates for a species' native regions — the input to the
    /// region-based envelope deriver.
    pub async fn native_region_climates_for_species(
        &self,
        species_id: SpeciesId,
    ) -> DatabaseResult<Vec<RegionClimate>> {
        let rows: Vec<RegionClimateRow> = sqlx::query_as(
            "SELECT rc.region_code, rc.temp_mean_min, rc.temp_mean_mean, rc.temp_mean_max, \
             rc.temp_max_warm_min, rc.temp_max_warm_mean, rc.temp_max_warm_max, \
             rc.temp_min_cold_min, rc.temp_min_cold_mean, rc.temp_min_cold_max, \
             rc.precip_min, rc.precip_mean, rc.precip_max, \
             rc.seasonality_min, rc.seasonality_mean, rc.seasonality_max \
             FROM region_climate rc \
             JOIN species_regions sr ON sr.region_code = rc.region_code \
             WHERE sr.species_id = $1 AND sr.is_native",
        )
        .bind(species_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Union the geometry of a region set via PostGIS `ST_Union`, returning
    /// bbox, centroid, and area (equal-area projection) alongside it.
    pub async fn union_region_geometry(
        &self,
        codes: &[RegionCode],
    ) -> DatabaseResult<Option<GeometrySummaryRow>> {
        if codes.is_empty() {
            return Ok(None);
        }
        let code_strs: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        let row: Option<GeometrySummaryRow> = sqlx::query_as(
            "SELECT ST_AsBinary(ST_Multi(ST_Union(geometry))) AS geometry, \
             ST_AsBinary(ST_Envelope(ST_Union(geometry))) AS bbox, \
             ST_AsBinary(ST_Centroid(ST_Union(geometry))) AS centroid, \
             ST_Area(ST_Transform(ST_Union(geometry), 6933)) / 1000000.0 AS area_km2 \
             FROM regions WHERE code = ANY($1)",
        )
        .bind(&code_strs as &[&str])
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replace the materialized range geometry for one species.
    pub async fn upsert_species_geometry(
        &self,
        species_id: SpeciesId,
        native_area_km2: f64,
        full_area_km2: f64,
        native_region_count: i32,
        full_region_count: i32,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO species_geometry \
             (species_id, native_area_km2, full_area_km2, native_region_count, full_region_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (species_id) DO UPDATE SET \
             native_area_km2 = EXCLUDED.native_area_km2, full_area_km2 = EXCLUDED.full_area_km2, \
             native_region_count = EXCLUDED.native_region_count, \
             full_region_count = EXCLUDED.full_region_count",
        )
        .bind(species_id.as_i64())
        .bind(native_area_km2)
        .bind(full_area_km2)
        .bind(native_region_count)
        .bind(full_region_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- occurrences and ecoregion observations --------------------------

    /// Append-only occurrence batch insert, deduplicated on `upstream_id`.
    /// Quality filtering (uncertainty/year/kingdom/per-species cap) is
    /// applied upstream during staging, not here.
    pub async fn insert_occurrences(&self, records: &[OccurrenceRecord]) -> DatabaseResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for chunk in records.chunks(500) {
            let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO occurrences (upstream_id, species_id, lat, lon, uncertainty_m, year, \
                 country_code, temp_mean, temp_max_warm, temp_min_cold, precip, seasonality, temp_seasonality) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.upstream_id)
                    .push_bind(r.species_id.as_i64())
                    .push_bind(r.lat)
                    .push_bind(r.lon)
                    .push_bind(r.uncertainty_m)
                    .push_bind(r.year)
                    .push_bind(&r.country_code)
                    .push_bind(r.bio.temp_mean)
                    .push_bind(r.bio.temp_max_warm)
                    .push_bind(r.bio.temp_min_cold)
                    .push_bind(r.bio.precip)
                    .push_bind(r.bio.seasonality)
                    .push_bind(r.temp_seasonality);
            });
            qb.push(" ON CONFLICT (upstream_id) DO NOTHING");
            let result = qb.build().execute(&self.pool).await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Occurrence points for one species, best-quality-first
    /// (uncertainty ascending, year descending), capped at `cap`.
    pub async fn occurrences_for_species(
        &self,
        species_id: SpeciesId,
        cap: i64,
    ) -> DatabaseResult<Vec<OccurrenceRecord>> {
        let rows: Vec<OccurrenceRow> = sqlx::query_as(
            "SELECT upstream_id, species_id, lat, lon, uncertainty_m, year, country_code, \
             temp_mean, temp_max_warm, temp_min_cold, precip, seasonality, temp_seasonality \
             FROM occurrences WHERE species_id = $1 \
             ORDER BY uncertainty_m ASC, year DESC LIMIT $2",
        )
        .bind(species_id.as_i64())
        .bind(cap)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Species ids with at least one occurrence row, used to drive a full
    /// occurrence-deriver run over the catalog.
    pub async fn species_ids_with_occurrences(&self) -> DatabaseResult<Vec<SpeciesId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT DISTINCT species_id FROM occurrences")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(SpeciesId::new).collect())
    }

    /// Batched upsert of ecoregion observation counts.
    pub async fn upsert_ecoregion_observations(
        &self,
        rows: &[EcoregionObservation],
    ) -> DatabaseResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for chunk in rows.chunks(500) {
            let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO ecoregion_observations (species_id, eco_id, n_observations) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.species_id.as_i64())
                    .push_bind(&r.eco_id)
                    .push_bind(r.n_observations);
            });
            qb.push(
                " ON CONFLICT (species_id, eco_id) DO UPDATE SET \
                  n_observations = EXCLUDED.n_observations",
            );
            let result = qb.build().execute(&self.pool).await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    /// Ecoregion observation rows for one species, input to the
    /// ecoregion-based envelope deriver.
    pub async fn ecoregion_observations_for_species(
        &self,
        species_id: SpeciesId,
    ) -> DatabaseResult<Vec<EcoregionObservation>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT species_id, eco_id, n_observations FROM ecoregion_observations WHERE species_id = $1",
        )
        .bind(species_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(species_id, eco_id, n_observations)| EcoregionObservation {
                species_id: SpeciesId::new(species_id),
                eco_id,
                n_observations,
            })
            .collect())
    }

    /// Upsert one ecoregion's bioclimatic centroid aggregate.
    pub async fn upsert_ecoregion_climate(&self, climate: &EcoregionClimate) -> DatabaseResult<()> {
        let s = &climate.stats;
        sqlx::query(
            "INSERT INTO ecoregion_climate \
             (eco_id, temp_mean_min, temp_mean_mean, temp_mean_max, \
              temp_max_warm_min, temp_max_warm_mean, temp_max_warm_max, \
              temp_min_cold_min, temp_min_cold_mean, temp_min_cold_max, \
              precip_min, precip_mean, precip_max, \
              seasonality_min, seasonality_mean, seasonality_max) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16) \
             ON CONFLICT (eco_id) DO UPDATE SET \
             temp_mean_min = EXCLUDED.temp_mean_min, temp_mean_mean = EXCLUDED.temp_mean_mean, \
             temp_mean_max = EXCLUDED.temp_mean_max, \
             temp_max_warm_min = EXCLUDED.temp_max_warm_min, temp_max_warm_mean = EXCLUDED.temp_max_warm_mean, \
             temp_max_warm_max = EXCLUDED.temp_max_warm_max, \
             temp_min_cold_min = EXCLUDED.temp_min_cold_min, temp_min_cold_mean = EXCLUDED.temp_min_cold_mean, \
             temp_min_cold_max = EXCLUDED.temp_min_cold_max, \
             precip_min = EXCLUDED.precip_min, precip_mean = EXCLUDED.precip_mean, precip_max = EXCLUDED.precip_max, \
             seasonality_min = EXCLUDED.seasonality_min, seasonality_mean = EXCLUDED.seasonality_mean, \
             seasonality_max = EXCLUDED.seasonality_max",
        )
        .bind(&climate.eco_id)
        .bind(s.temp_mean.min)
        .bind(s.temp_mean.mean)
        .bind(s.temp_mean.max)
        .bind(s.temp_max_warm.min)
        .bind(s.temp_max_warm.mean)
        .bind(s.temp_max_warm.max)
        .bind(s.temp_min_cold.min)
        .bind(s.temp_min_cold.mean)
        .bind(s.temp_min_cold.max)
        .bind(s.precip.min)
        .bind(s.precip.mean)
        .bind(s.precip.max)
        .bind(s.seasonality.min)
        .bind(s.seasonality.mean)
        .bind(s.seasonality.max)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Climate aggregates for a set of ecoregions, keyed by `eco_id` — the
    /// ecoregion-based envelope deriver's input alongside observation counts.
    pub async fn ecoregion_climates_for(&self, eco_ids: &[String]) -> DatabaseResult<Vec<EcoregionClimate>> {
        if eco_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<EcoregionClimateRow> = sqlx::query_as(
            "SELECT eco_id, temp_mean_min, temp_mean_mean, temp_mean_max, \
             temp_max_warm_min, temp_max_warm_mean, temp_max_warm_max, \
             temp_min_cold_min, temp_min_cold_mean, temp_min_cold_max, \
             precip_min, precip_mean, precip_max, \
             seasonality_min, seasonality_mean, seasonality_max \
             FROM ecoregion_climate WHERE eco_id = ANY($1)",
        )
        .bind(eco_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Species ids with at least one ecoregion observation row.
    pub async fn species_ids_with_ecoregion_observations(&self) -> DatabaseResult<Vec<SpeciesId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT species_id FROM ecoregion_observations")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(SpeciesId::new).collect())
    }

    /// Species ids with at least one region membership row, used to drive
    /// a full distribution-consolidator run over the catalog.
    pub async fn species_ids_with_regions(&self) -> DatabaseResult<Vec<SpeciesId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT DISTINCT species_id FROM species_regions")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(SpeciesId::new).collect())
    }

    /// OR-merge a species/region distribution flag row across sources.
    pub async fn upsert_species_region(&self, row: &SpeciesRegion) -> DatabaseResult<()> {
        let existing: Option<(bool, bool, bool)> = sqlx::query_as(
            "SELECT is_native, is_endemic, is_introduced FROM species_regions \
             WHERE species_id = $1 AND region_code = $2",
        )
        .bind(row.species_id.as_i64())
        .bind(row.region_code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let merged = match existing {
            Some((is_native, is_endemic, is_introduced)) => row.flags.merge(RegionFlags {
                is_native,
                is_endemic,
                is_introduced,
            }),
            None => row.flags,
        };

        sqlx::query(
            "INSERT INTO species_regions (species_id, region_code, is_native, is_endemic, is_introduced, source) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (species_id, region_code) DO UPDATE SET \
             is_native = EXCLUDED.is_native, is_endemic = EXCLUDED.is_endemic, \
             is_introduced = EXCLUDED.is_introduced, source = EXCLUDED.source",
        )
        .bind(row.species_id.as_i64())
        .bind(row.region_code.as_str())
        .bind(merged.is_native)
        .bind(merged.is_endemic)
        .bind(merged.is_introduced)
        .bind(&row.source)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- climate envelopes ------------------------------------------------

    /// Replace a species' envelope for one source variant (derivers
    /// are independent and idempotent — each writes its own source row).
    pub async fn upsert_climate_envelope(&self, envelope: &ClimateEnvelope) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO climate_envelopes \
             (species_id, source, temp_mean, temp_min, temp_max, temp_p05, temp_p95, \
              precip_mean, precip_min, precip_max, precip_seasonality_mean, \
              sample_count, quality, percentile_fallback) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
             ON CONFLICT (species_id, source) DO UPDATE SET \
             temp_mean = EXCLUDED.temp_mean, temp_min = EXCLUDED.temp_min, temp_max = EXCLUDED.temp_max, \
             temp_p05 = EXCLUDED.temp_p05, temp_p95 = EXCLUDED.temp_p95, \
             precip_mean = EXCLUDED.precip_mean, precip_min = EXCLUDED.precip_min, \
             precip_max = EXCLUDED.precip_max, precip_seasonality_mean = EXCLUDED.precip_seasonality_mean, \
             sample_count = EXCLUDED.sample_count, quality = EXCLUDED.quality, \
             percentile_fallback = EXCLUDED.percentile_fallback",
        )
        .bind(envelope.species_id.as_i64())
        .bind(envelope.source.to_string())
        .bind(envelope.temp.mean)
        .bind(envelope.temp.min)
        .bind(envelope.temp.max)
        .bind(envelope.temp.p05)
        .bind(envelope.temp.p95)
        .bind(envelope.precip.mean)
        .bind(envelope.precip.min)
        .bind(envelope.precip.max)
        .bind(envelope.precip.seasonality_mean)
        .bind(envelope.sample_count)
        .bind(envelope_quality_tag(envelope.quality))
        .bind(envelope.percentile_fallback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The unified, best-available envelope per species (resolver:
    /// prefer highest `EnvelopeSource::priority()`, annotate source consensus).
    pub async fn unified_envelope(&self, species_id: SpeciesId) -> DatabaseResult<Option<UnifiedEnvelope>> {
        let rows: Vec<ClimateEnvelopeRow> = sqlx::query_as(
            "SELECT species_id, source, temp_mean, temp_min, temp_max, temp_p05, temp_p95, \
             precip_mean, precip_min, precip_max, precip_seasonality_mean, \
             sample_count, quality, percentile_fallback \
             FROM climate_envelopes WHERE species_id = $1",
        )
        .bind(species_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let envelopes: Vec<ClimateEnvelope> = rows.into_iter().map(Into::into).collect();
        let best = envelopes
            .iter()
            .max_by_key(|e| e.source.priority())
            .cloned()
            .expect("non-empty");
        let consensus = match envelopes.len() {
            1 => SourceConsensus::Single,
            2 => SourceConsensus::Medium,
            _ => SourceConsensus::High,
        };
        Ok(Some(UnifiedEnvelope {
            species_id,
            envelope_source: best.source,
            envelope: best,
            source_consensus: consensus,
        }))
    }

    // ---- candidate selection ----------------------------------------------

    /// Climate-match candidate query: joins the unified envelope
    /// and unified trait views, applies the hard filter, and returns rows
    /// pre-sorted by match score so the diversity optimizer only needs to
    /// take a top-K window before running its greedy pass.
    pub async fn climate_match_candidates(
        &self,
        target: &BioVector,
        region_code: Option<&RegionCode>,
        min_match_score: f64,
        include_threatened: bool,
        growth_form_filter: Option<&[GrowthForm]>,
        limit: i64,
    ) -> DatabaseResult<Vec<CandidateRow>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT ut.species_id, s.canonical_name, s.family, ut.growth_form, \
             ut.is_tree, ut.is_shrub, ut.is_climber, ut.is_herb, ut.is_palm, \
             ut.nitrogen_fixer, ut.dispersal_syndrome, ut.max_height_m, ut.lifespan_years, \
             ut.threat_status, \
             ce.temp_mean, ce.temp_min, ce.temp_max, ce.precip_mean, ce.precip_min, ce.precip_max, \
             ce.precip_seasonality_mean AS seasonality_mean, \
             sr.is_native, sr.is_endemic, sr.is_introduced, \
             GREATEST(0.0, 1.0 - ( \
                 ABS(ce.temp_mean - ",
        );
        qb.push_bind(target.temp_mean)
            .push(") / 20.0 + ABS(ce.precip_mean - ")
            .push_bind(target.precip)
            .push(") / 2000.0) / 2.0) AS match_score \
             FROM unified_traits ut \
             JOIN species s ON s.id = ut.species_id \
             JOIN climate_envelopes ce ON ce.species_id = ut.species_id \
             LEFT JOIN species_regions sr ON sr.species_id = ut.species_id AND sr.region_code = ");
        qb.push_bind(region_code.map(|r| r.as_str().to_string()));
        qb.push(" WHERE ce.temp_min <= ")
            .push_bind(target.temp_max_warm)
            .push(" AND ce.temp_max >= ")
            .push_bind(target.temp_min_cold)
            .push(" AND ce.precip_min <= ")
            .push_bind(target.precip * 1.5)
            .push(" AND ce.precip_max >= ")
            .push_bind(target.precip * 0.5);

        if !include_threatened {
            qb.push(" AND (ut.threat_status IS NULL OR ut.threat_status NOT IN ('CR','EN','VU'))");
        }
        if let Some(forms) = growth_form_filter {
            let tags: Vec<&'static str> = forms.iter().map(|g| g.as_str()).collect();
            qb.push(" AND ut.growth_form = ANY(");
            qb.push_bind(tags);
            qb.push(")");
        }
        qb.push(" HAVING GREATEST(0.0, 1.0 - (ABS(ce.temp_mean - ")
            .push_bind(target.temp_mean)
            .push(") / 20.0 + ABS(ce.precip_mean - ")
            .push_bind(target.precip)
            .push(") / 2000.0) / 2.0) >= ")
            .push_bind(min_match_score)
            .push(" ORDER BY match_score DESC LIMIT ")
            .push_bind(limit);

        let rows = qb.build_query_as::<CandidateRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // ---- recommendation cache ----------------------------------------------

    /// Deterministic cache key for a canonicalized request payload.
    pub fn cache_key(request_json: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request_json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub async fn get_cached_recommendation(
        &self,
        cache_key: &str,
    ) -> DatabaseResult<Option<RecommendationCacheEntry>> {
        let row: Option<CacheRow> = sqlx::query_as(
            "SELECT cache_key, request_parameters, species_ids, diversity_metrics, response_body, expires_at, hit_count \
             FROM recommendation_cache WHERE cache_key = $1 AND expires_at > now()",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            sqlx::query("UPDATE recommendation_cache SET hit_count = hit_count + 1 WHERE cache_key = $1")
                .bind(cache_key)
                .execute(&self.pool)
                .await?;
        }
        Ok(row.map(Into::into))
    }

    pub async fn put_cached_recommendation(
        &self,
        entry: &RecommendationCacheEntry,
    ) -> DatabaseResult<()> {
        let species_ids: Vec<i64> = entry.species_ids.iter().map(|s| s.as_i64()).collect();
        let diversity_json = serde_json::to_value(&entry.diversity_metrics)?;
        sqlx::query(
            "INSERT INTO recommendation_cache (cache_key, request_parameters, species_ids, diversity_metrics, response_body, expires_at, hit_count) \
             VALUES ($1, $2, $3, $4, $5, $6, 0) \
             ON CONFLICT (cache_key) DO UPDATE SET \
             request_parameters = EXCLUDED.request_parameters, species_ids = EXCLUDED.species_ids, \
             diversity_metrics = EXCLUDED.diversity_metrics, response_body = EXCLUDED.response_body, \
             expires_at = EXCLUDED.expires_at",
        )
        .bind(&entry.cache_key)
        .bind(&entry.request_parameters)
        .bind(&species_ids)
        .bind(&diversity_json)
        .bind(&entry.response_body)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- crawler state ------------------------------------------------------

    /// Attempt to claim the one-instance-per-kind lock, returning
    /// `false` if another run is already `Running`.
    pub async fn try_claim_crawler(&self, crawler_name: &str) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "INSERT INTO crawler_state (crawler_name, status, updated_at) VALUES ($1, 'running', now()) \
             ON CONFLICT (crawler_name) DO UPDATE SET status = 'running', updated_at = now() \
             WHERE crawler_state.status != 'running'",
        )
        .bind(crawler_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn release_crawler(&self, crawler_name: &str, status: CrawlerStatus) -> DatabaseResult<()> {
        sqlx::query("UPDATE crawler_state SET status = $2, updated_at = now() WHERE crawler_name = $1")
            .bind(crawler_name)
            .bind(crawler_status_tag(status))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn save_checkpoint(&self, crawler_name: &str, cursor: &serde_json::Value) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE crawler_state SET cursor = $2, updated_at = now() WHERE crawler_name = $1",
        )
        .bind(crawler_name)
        .bind(cursor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_checkpoint(&self, crawler_name: &str) -> DatabaseResult<Option<serde_json::Value>> {
        let cursor: Option<Option<serde_json::Value>> =
            sqlx::query_scalar("SELECT cursor FROM crawler_state WHERE crawler_name = $1")
                .bind(crawler_name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(cursor.flatten())
    }

    pub async fn start_crawler_run(&self, crawler_name: &str) -> DatabaseResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO crawler_runs (crawler_name, started_at, status, records_processed, records_inserted, records_updated) \
             VALUES ($1, now(), 'running', 0, 0, 0) RETURNING id",
        )
        .bind(crawler_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn complete_crawler_run(
        &self,
        run_id: i64,
        status: CrawlerRunStatus,
        processed: i64,
        inserted: i64,
        updated: i64,
        error_message: Option<&str>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE crawler_runs SET completed_at = now(), status = $2, records_processed = $3, \
             records_inserted = $4, records_updated = $5, error_message = $6 WHERE id = $1",
        )
        .bind(run_id)
        .bind(crawler_run_status_tag(status))
        .bind(processed)
        .bind(inserted)
        .bind(updated)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn taxonomic_status_tag(status: TaxonomicStatus) -> &'static str {
    match status {
        TaxonomicStatus::Accepted => "accepted",
        TaxonomicStatus::Synonym => "synonym",
        TaxonomicStatus::Unresolved => "unresolved",
    }
}

fn threat_status_tag(status: ThreatStatus) -> &'static str {
    match status {
        ThreatStatus::Cr => "CR",
        ThreatStatus::En => "EN",
        ThreatStatus::Vu => "VU",
        ThreatStatus::Nt => "NT",
        ThreatStatus::Lc => "LC",
        ThreatStatus::Dd => "DD",
        ThreatStatus::Ne => "NE",
    }
}

fn envelope_quality_tag(quality: EnvelopeQuality) -> &'static str {
    match quality {
        EnvelopeQuality::High => "high",
        EnvelopeQuality::Medium => "medium",
        EnvelopeQuality::Low => "low",
    }
}

fn crawler_status_tag(status: CrawlerStatus) -> &'static str {
    match status {
        CrawlerStatus::Idle => "idle",
        CrawlerStatus::Running => "running",
        CrawlerStatus::Failed => "failed",
    }
}

fn crawler_run_status_tag(status: CrawlerRunStatus) -> &'static str {
    match status {
        CrawlerRunStatus::Running => "running",
        CrawlerRunStatus::Succeeded => "succeeded",
        CrawlerRunStatus::Failed => "failed",
    }
}

#[derive(sqlx::FromRow)]
struct SpeciesRow {
    id: i64,
    canonical_name: String,
    genus: String,
    family: String,
    backbone_id: Option<String>,
    taxonomic_status: String,
    accepted_species_id: Option<i64>,
}

impl From<SpeciesRow> for Species {
    fn from(r: SpeciesRow) -> Self {
        Species {
            id: SpeciesId::new(r.id),
            canonical_name: r.canonical_name,
            genus: r.genus,
            family: r.family,
            backbone_id: r.backbone_id,
            taxonomic_status: match r.taxonomic_status.as_str() {
                "accepted" => TaxonomicStatus::Accepted,
                "synonym" => TaxonomicStatus::Synonym,
                _ => TaxonomicStatus::Unresolved,
            },
            accepted_species_id: r.accepted_species_id.map(SpeciesId::new),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RawTraitRow {
    species_id: i64,
    source: String,
    growth_form: Option<String>,
    raw_growth_form: Option<String>,
    max_height_m: Option<f64>,
    woodiness: Option<String>,
    nitrogen_fixer: Option<bool>,
    dispersal_syndrome: Option<String>,
    deciduousness: Option<String>,
    lifespan_years: Option<f64>,
    threat_status: Option<String>,
}

impl From<RawTraitRow> for RawTrait {
    fn from(r: RawTraitRow) -> Self {
        RawTrait {
            species_id: SpeciesId::new(r.species_id),
            source: r.source,
            growth_form: r.growth_form.and_then(|s| GrowthForm::from_str_opt(&s)),
            raw_growth_form: r.raw_growth_form,
            max_height_m: r.max_height_m,
            woodiness: r.woodiness,
            nitrogen_fixer: r.nitrogen_fixer,
            dispersal_syndrome: r.dispersal_syndrome,
            deciduousness: r.deciduousness,
            lifespan_years: r.lifespan_years,
            threat_status: r.threat_status.and_then(|s| parse_threat_status(&s)),
        }
    }
}

fn parse_threat_status(s: &str) -> Option<ThreatStatus> {
    Some(match s {
        "CR" => ThreatStatus::Cr,
        "EN" => ThreatStatus::En,
        "VU" => ThreatStatus::Vu,
        "NT" => ThreatStatus::Nt,
        "LC" => ThreatStatus::Lc,
        "DD" => ThreatStatus::Dd,
        "NE" => ThreatStatus::Ne,
        _ => return None,
    })
}

#[derive(sqlx::FromRow)]
struct RegionClimateRow {
    region_code: String,
    temp_mean_min: f64,
    temp_mean_mean: f64,
    temp_mean_max: f64,
    temp_max_warm_min: f64,
    temp_max_warm_mean: f64,
    temp_max_warm_max: f64,
    temp_min_cold_min: f64,
    temp_min_cold_mean: f64,
    temp_min_cold_max: f64,
    precip_min: f64,
    precip_mean: f64,
    precip_max: f64,
    seasonality_min: f64,
    seasonality_mean: f64,
    seasonality_max: f64,
}

#[derive(sqlx::FromRow)]
struct EcoregionClimateRow {
    eco_id: String,
    temp_mean_min: f64,
    temp_mean_mean: f64,
    temp_mean_max: f64,
    temp_max_warm_min: f64,
    temp_max_warm_mean: f64,
    temp_max_warm_max: f64,
    temp_min_cold_min: f64,
    temp_min_cold_mean: f64,
    temp_min_cold_max: f64,
    precip_min: f64,
    precip_mean: f64,
    precip_max: f64,
    seasonality_min: f64,
    seasonality_mean: f64,
    seasonality_max: f64,
}

impl From<EcoregionClimateRow> for EcoregionClimate {
    fn from(r: EcoregionClimateRow) -> Self {
        EcoregionClimate {
            eco_id: r.eco_id,
            stats: RegionClimateStats {
                temp_mean: MinMeanMax { min: r.temp_mean_min, mean: r.temp_mean_mean, max: r.temp_mean_max },
                temp_max_warm: MinMeanMax { min: r.temp_max_warm_min, mean: r.temp_max_warm_mean, max: r.temp_max_warm_max },
                temp_min_cold: MinMeanMax { min: r.temp_min_cold_min, mean: r.temp_min_cold_mean, max: r.temp_min_cold_max },
                precip: MinMeanMax { min: r.precip_min, mean: r.precip_mean, max: r.precip_max },
                seasonality: MinMeanMax { min: r.seasonality_min, mean: r.seasonality_mean, max: r.seasonality_max },
            },
        }
    }
}

impl From<RegionClimateRow> for RegionClimate {
    fn from(r: RegionClimateRow) -> Self {
        RegionClimate {
            region_code: RegionCode::new(r.region_code),
            stats: RegionClimateStats {
                temp_mean: MinMeanMax { min: r.temp_mean_min, mean: r.temp_mean_mean, max: r.temp_mean_max },
                temp_max_warm: MinMeanMax { min: r.temp_max_warm_min, mean: r.temp_max_warm_mean, max: r.temp_max_warm_max },
                temp_min_cold: MinMeanMax { min: r.temp_min_cold_min, mean: r.temp_min_cold_mean, max: r.temp_min_cold_max },
                precip: MinMeanMax { min: r.precip_min, mean: r.precip_mean, max: r.precip_max },
                seasonality: MinMeanMax { min: r.seasonality_min, mean: r.seasonality_mean, max: r.seasonality_max },
            },
        }
    }
}

/// Result of unioning a set of region geometries, in WKB form. Left
/// unparsed here — the distribution consolidator only needs the derived
/// area figure; bbox/centroid WKB are carried through for callers that do.
#[derive(sqlx::FromRow)]
pub struct GeometrySummaryRow {
    pub geometry: Vec<u8>,
    pub bbox: Vec<u8>,
    pub centroid: Vec<u8>,
    pub area_km2: f64,
}

#[derive(sqlx::FromRow)]
struct OccurrenceRow {
    upstream_id: String,
    species_id: i64,
    lat: f64,
    lon: f64,
    uncertainty_m: f64,
    year: i32,
    country_code: Option<String>,
    temp_mean: f64,
    temp_max_warm: f64,
    temp_min_cold: f64,
    precip: f64,
    seasonality: f64,
    temp_seasonality: f64,
}

impl From<OccurrenceRow> for OccurrenceRecord {
    fn from(r: OccurrenceRow) -> Self {
        OccurrenceRecord {
            upstream_id: r.upstream_id,
            species_id: SpeciesId::new(r.species_id),
            lat: r.lat,
            lon: r.lon,
            uncertainty_m: r.uncertainty_m,
            year: r.year,
            country_code: r.country_code,
            bio: BioVector {
                temp_mean: r.temp_mean,
                temp_max_warm: r.temp_max_warm,
                temp_min_cold: r.temp_min_cold,
                precip: r.precip,
                seasonality: r.seasonality,
            },
            temp_seasonality: r.temp_seasonality,
        }
    }
}

#[derive(sqlx::FromRow, Clone)]
struct ClimateEnvelopeRow {
    species_id: i64,
    source: String,
    temp_mean: f64,
    temp_min: f64,
    temp_max: f64,
    temp_p05: Option<f64>,
    temp_p95: Option<f64>,
    precip_mean: f64,
    precip_min: f64,
    precip_max: f64,
    precip_seasonality_mean: f64,
    sample_count: i64,
    quality: String,
    percentile_fallback: bool,
}

impl From<ClimateEnvelopeRow> for ClimateEnvelope {
    fn from(r: ClimateEnvelopeRow) -> Self {
        ClimateEnvelope {
            species_id: SpeciesId::new(r.species_id),
            source: match r.source.as_str() {
                "occurrence" => EnvelopeSource::Occurrence,
                "ecoregion" => EnvelopeSource::Ecoregion,
                _ => EnvelopeSource::Region,
            },
            temp: TemperatureStats {
                mean: r.temp_mean,
                min: r.temp_min,
                max: r.temp_max,
                p05: r.temp_p05,
                p95: r.temp_p95,
            },
            precip: PrecipitationStats {
                mean: r.precip_mean,
                min: r.precip_min,
                max: r.precip_max,
                seasonality_mean: r.precip_seasonality_mean,
            },
            sample_count: r.sample_count,
            quality: match r.quality.as_str() {
                "high" => EnvelopeQuality::High,
                "medium" => EnvelopeQuality::Medium,
                _ => EnvelopeQuality::Low,
            },
            percentile_fallback: r.percentile_fallback,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    cache_key: String,
    request_parameters: serde_json::Value,
    species_ids: Vec<i64>,
    diversity_metrics: serde_json::Value,
    response_body: serde_json::Value,
    expires_at: DateTime<Utc>,
    hit_count: i64,
}

impl From<CacheRow> for RecommendationCacheEntry {
    fn from(r: CacheRow) -> Self {
        RecommendationCacheEntry {
            cache_key: r.cache_key,
            request_parameters: r.request_parameters,
            species_ids: r.species_ids.into_iter().map(SpeciesId::new).collect(),
            diversity_metrics: serde_json::from_value(r.diversity_metrics).unwrap_or(DiversityMetrics {
                functional_diversity: 0.0,
                phylogenetic_diversity: 0.0,
                growth_form_richness: 0.0,
                total_diversity_score: 0.0,
                n_species: 0,
                n_families: 0,
                n_growth_forms: 0,
            }),
            response_body: r.response_body,
            expires_at: r.expires_at,
            hit_count: r.hit_count,
        }
    }
}

/// Row shape returned by `climate_match_candidates`: a candidate species
/// paired with its envelope and trait fields, ready for the exact
/// `climate_match_score` formula and the diversity optimizer's Gower
/// distance — both computed in Rust rather than in SQL (§4.I scoring
/// math is kept pure and unit-testable; this query only pre-filters and
/// pre-sorts by the coarse `match_score` approximation so the optimizer
/// only ever looks at a bounded top-K window).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub species_id: i64,
    pub canonical_name: String,
    pub family: String,
    pub growth_form: Option<String>,
    pub is_tree: bool,
    pub is_shrub: bool,
    pub is_climber: bool,
    pub is_herb: bool,
    pub is_palm: bool,
    pub nitrogen_fixer: Option<bool>,
    pub dispersal_syndrome: Option<String>,
    pub max_height_m: Option<f64>,
    pub lifespan_years: Option<f64>,
    pub threat_status: Option<String>,
    pub temp_mean: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub precip_mean: f64,
    pub precip_min: f64,
    pub precip_max: f64,
    pub seasonality_mean: f64,
    pub is_native: Option<bool>,
    pub is_endemic: Option<bool>,
    pub is_introduced: Option<bool>,
    pub match_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic_and_hex() {
        let a = CatalogStore::cache_key(r#"{"tdwg_code":"BZS","n_species":20}"#);
        let b = CatalogStore::cache_key(r#"{"tdwg_code":"BZS","n_species":20}"#);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_key_differs_for_different_payloads() {
        let a = CatalogStore::cache_key(r#"{"n_species":20}"#);
        let b = CatalogStore::cache_key(r#"{"n_species":21}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn crawler_status_tags_round_trip_the_documented_strings() {
        assert_eq!(crawler_status_tag(CrawlerStatus::Idle), "idle");
        assert_eq!(crawler_status_tag(CrawlerStatus::Running), "running");
        assert_eq!(crawler_status_tag(CrawlerStatus::Failed), "failed");
    }
}
