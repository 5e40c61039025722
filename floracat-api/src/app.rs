//! Router, shared state, and handlers for the recommendation API.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use floracat_core::{FloraCatConfig, FloraCatError, NullRasterSampler, RasterSampler};
use floracat_db::CatalogStore;
use floracat_recommend::{recommend, RecommendationRequest, RecommendationResponse};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub raster: Arc<dyn RasterSampler>,
    pub config: Arc<FloraCatConfig>,
}

impl AppState {
    pub fn new(store: CatalogStore, config: FloraCatConfig) -> Self {
        Self {
            store: Arc::new(store),
            raster: Arc::new(NullRasterSampler),
            config: Arc::new(config),
        }
    }
}

/// Build the router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/recommend", post(recommend_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let app = if state.config.server.enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

async fn root_handler() -> &'static str {
    "FloraCat Recommendation API"
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    database: &'static str,
    postgis_version: Option<String>,
    table_row_counts: std::collections::HashMap<String, i64>,
    version: &'static str,
    timestamp: String,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = state.store.health_check().await;
    let (status, database) = match db_status {
        floracat_db::HealthStatus::Healthy => ("healthy", "healthy"),
        floracat_db::HealthStatus::Degraded => ("degraded", "degraded"),
        floracat_db::HealthStatus::Unhealthy => ("unhealthy", "unhealthy"),
    };

    let (postgis_version, table_row_counts) = if db_status == floracat_db::HealthStatus::Unhealthy {
        (None, std::collections::HashMap::new())
    } else {
        (
            state.store.postgis_version().await.unwrap_or(None),
            state.store.table_row_counts().await.unwrap_or_default(),
        )
    };

    let body = HealthResponse {
        status,
        service: "floracat-api",
        database,
        postgis_version,
        table_row_counts,
        version: floracat_core::VERSION,
        timestamp: Utc::now().to_rfc3339(),
    };

    let code = if status == "unhealthy" { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };
    (code, Json(body))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    hint: Option<String>,
}

fn error_response(err: FloraCatError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        FloraCatError::InputInvalid(_) | FloraCatError::Serialization(_) => StatusCode::BAD_REQUEST,
        FloraCatError::LocationUnresolved(_) | FloraCatError::NoCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FloraCatError::ClimateUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        FloraCatError::StoreUnavailable(_) | FloraCatError::Database(_) | FloraCatError::Io(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        FloraCatError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("unhandled recommendation error: {}", err);
    } else {
        warn!("recommendation request rejected: {}", err);
    }

    let body = ErrorBody {
        error: err.tag(),
        message: err.to_string(),
        hint: err.hint().map(str::to_string),
    };
    (status, Json(body))
}

async fn recommend_handler(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, (StatusCode, Json<ErrorBody>)> {
    let canonical = serde_json::to_string(&request).map_err(|e| error_response(FloraCatError::Serialization(e)))?;
    let cache_key = CatalogStore::cache_key(&canonical);

    if let Ok(Some(entry)) = state.store.get_cached_recommendation(&cache_key).await {
        if let Ok(response) = serde_json::from_value::<RecommendationResponse>(entry.response_body) {
            info!(%cache_key, "recommendation cache hit");
            return Ok(Json(response));
        }
    }

    let response = recommend(&state.store, state.raster.as_ref(), &request)
        .await
        .map_err(error_response)?;

    let entry = floracat_core::RecommendationCacheEntry {
        cache_key: cache_key.clone(),
        request_parameters: serde_json::to_value(&request).unwrap_or(serde_json::Value::Null),
        species_ids: response.species.iter().map(|s| s.species_id).collect(),
        diversity_metrics: response.diversity_metrics.clone(),
        response_body: serde_json::to_value(&response).unwrap_or(serde_json::Value::Null),
        expires_at: Utc::now() + chrono::Duration::hours(state.config.cache.ttl_hours as i64),
        hit_count: 0,
    };
    if let Err(e) = state.store.put_cached_recommendation(&entry).await {
        warn!("failed to write recommendation cache entry: {}", e);
    }

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_invalid_maps_to_bad_request() {
        let (status, _) = error_response(FloraCatError::InputInvalid("bad coords".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn no_candidates_maps_to_unprocessable_entity() {
        let (status, body) = error_response(FloraCatError::NoCandidates { hint: "lower threshold".to_string() });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0.hint.as_deref(), Some("lower threshold"));
    }

    #[test]
    fn store_unavailable_maps_to_service_unavailable() {
        let (status, _) = error_response(FloraCatError::StoreUnavailable("pool exhausted".to_string()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
