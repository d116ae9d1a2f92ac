//! HTTP API for health checks, Prometheus metrics and node temperature

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use heat_lib::{
    health::{ComponentStatus, HealthRegistry},
    pyrometer::NodeTemperatureState,
    summary::GenericSummary,
    Dimension, HeatZone, NormalizedValue, ShardKey,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub registry: Registry,
    pub temperature: Arc<NodeTemperatureState>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        registry: Registry,
        temperature: Arc<NodeTemperatureState>,
    ) -> Self {
        Self {
            health_registry,
            registry,
            temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TemperatureQuery {
    pub dimension: Option<String>,
}

/// One dimension's latest node temperature
#[derive(Debug, Serialize)]
pub struct NodeTemperatureView {
    pub timestamp_millis: i64,
    pub summary: serde_json::Value,
}

fn parse_dimension(raw: Option<&str>) -> Result<Option<Dimension>, Response> {
    raw.map(str::parse::<Dimension>)
        .transpose()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}

/// Latest node summary per dimension
async fn temperature(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TemperatureQuery>,
) -> Response {
    let dimension = match parse_dimension(query.dimension.as_deref()) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };

    let units = match dimension {
        Some(dimension) => match state.temperature.latest(dimension).await {
            Some(unit) => vec![unit],
            None => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    format!("No temperature computed for {}", dimension),
                )
            }
        },
        None => state.temperature.latest_all().await,
    };

    let views: Vec<NodeTemperatureView> = units
        .iter()
        .map(|unit| NodeTemperatureView {
            timestamp_millis: unit.timestamp_millis(),
            summary: unit.summary().to_json(),
        })
        .collect();
    Json(views).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ShardQuery {
    pub zone: Option<String>,
    pub dimension: Option<String>,
}

/// A shard's temperature vector and its zone in the latest evaluation of each dimension
#[derive(Debug, Serialize)]
pub struct ShardView {
    pub index_name: String,
    pub shard_id: i32,
    pub temperature: BTreeMap<Dimension, NormalizedValue>,
    pub zones: BTreeMap<Dimension, HeatZone>,
}

/// Tracked shard profiles, optionally restricted to a zone and to one dimension
async fn shards(State(state): State<Arc<AppState>>, Query(query): Query<ShardQuery>) -> Response {
    let dimension = match parse_dimension(query.dimension.as_deref()) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };
    let zone = match query.zone.as_deref().map(str::parse::<HeatZone>).transpose() {
        Ok(zone) => zone,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let mut zones: BTreeMap<ShardKey, BTreeMap<Dimension, HeatZone>> = BTreeMap::new();
    for unit in state.temperature.latest_all().await {
        for shard in unit.summary().shards() {
            zones
                .entry(shard.key.clone())
                .or_default()
                .insert(shard.dimension, shard.zone);
        }
    }

    let views: Vec<ShardView> = state
        .temperature
        .shard_profiles()
        .await
        .into_iter()
        .filter_map(|profile| {
            let mut view = ShardView {
                index_name: profile.index_name().to_string(),
                shard_id: profile.shard_id(),
                temperature: profile.temperature().iter().collect(),
                zones: zones.remove(profile.key()).unwrap_or_default(),
            };
            if let Some(want) = dimension {
                view.temperature.retain(|d, _| *d == want);
                view.zones.retain(|d, _| *d == want);
                if view.temperature.is_empty() {
                    return None;
                }
            }
            Some(view)
        })
        .filter(|view| zone.map_or(true, |zone| view.zones.values().any(|z| *z == zone)))
        .collect();
    Json(views).into_response()
}

/// Persisted rows of one summary table
async fn table(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.temperature.table(&name).await {
        Some(table) => Json(table).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Unknown table {}", name)),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/temperature", get(temperature))
        .route("/api/v1/shards", get(shards))
        .route("/api/v1/tables/:name", get(table))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
