// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP API over the layer store.
//!
//! - `GET /api/health` - liveness probe
//! - `GET /api/keyvisual/heatmaps` - heatmap matrix for a time and key range
//! - `GET /api/keyvisual/layers` - per-layer retention statistics

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::config::HeatmapConfig;
use crate::error::Error;
use crate::matrix::{HeatmapRequest, KeyRange, Matrix, MatrixBuilder, Timestamp};
use crate::storage::LayerStats;

/// Application state shared across handlers.
pub struct AppState {
    pub builder: MatrixBuilder,
    pub heatmap: HeatmapConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/keyvisual/heatmaps", get(heatmap_handler))
        .route("/api/keyvisual/layers", get(layers_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` flips to true.
pub async fn run_server(
    state: Arc<AppState>,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Key visualizer API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            // A dropped sender also means shutdown.
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    tracing::info!("Key visualizer API stopped");
    Ok(())
}

/// Engine error rendered as `{"error": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::EmptyRange { .. } | Error::InvalidResolution(_) | Error::InvalidKeyRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::OutOfRange { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Heatmap query failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// GET /api/health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Query string of the heatmap endpoint. Times are Unix seconds.
#[derive(Debug, Default, Deserialize)]
pub struct HeatmapQuery {
    #[serde(default)]
    pub starttime: Option<Timestamp>,
    #[serde(default)]
    pub endtime: Option<Timestamp>,
    #[serde(default)]
    pub startkey: Option<String>,
    #[serde(default)]
    pub endkey: Option<String>,
    #[serde(default)]
    pub maxrows: Option<usize>,
    #[serde(default)]
    pub maxcols: Option<usize>,
}

impl HeatmapQuery {
    /// Fill in defaults and clamp budgets to the configured maxima.
    ///
    /// `latest` is the newest retained sample, used as the default end.
    fn into_request(
        self,
        config: &HeatmapConfig,
        latest: Option<Timestamp>,
    ) -> Result<HeatmapRequest, Error> {
        let end = self
            .endtime
            .or(latest)
            .unwrap_or_else(|| Utc::now().timestamp());
        let window = Timestamp::try_from(config.default_window_secs).unwrap_or(Timestamp::MAX);
        let start = self.starttime.unwrap_or_else(|| end.saturating_sub(window));
        let key_range = KeyRange::new(
            self.startkey.unwrap_or_default(),
            self.endkey.unwrap_or_default(),
        )?;
        Ok(HeatmapRequest {
            start,
            end,
            key_range,
            max_rows: self.maxrows.map_or(config.max_rows, |rows| rows.min(config.max_rows)),
            max_cols: self.maxcols.map_or(config.max_cols, |cols| cols.min(config.max_cols)),
        })
    }
}

/// GET /api/keyvisual/heatmaps
async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Matrix>, ApiError> {
    let latest = state
        .builder
        .store()
        .retained_window()
        .map(|(_, latest)| latest);
    let request = query.into_request(&state.heatmap, latest)?;
    Ok(Json(state.builder.build(&request)?))
}

/// GET /api/keyvisual/layers
async fn layers_handler(State(state): State<Arc<AppState>>) -> Json<LayersResponse> {
    Json(LayersResponse {
        layers: state.builder.store().stats(),
    })
}

#[derive(Serialize)]
struct LayersResponse {
    layers: Vec<LayerStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HeatmapConfig {
        HeatmapConfig {
            max_rows: 10,
            max_cols: 20,
            default_window_secs: 3600,
        }
    }

    #[test]
    fn test_query_defaults_to_latest_sample() {
        let request = HeatmapQuery::default()
            .into_request(&config(), Some(10_000))
            .unwrap();
        assert_eq!(request.end, 10_000);
        assert_eq!(request.start, 10_000 - 3600);
        assert_eq!(request.max_rows, 10);
        assert_eq!(request.max_cols, 20);
        assert!(request.key_range.is_all());
    }

    #[test]
    fn test_query_clamps_budgets() {
        let query = HeatmapQuery {
            starttime: Some(5),
            endtime: Some(50),
            maxrows: Some(1000),
            maxcols: Some(3),
            ..Default::default()
        };
        let request = query.into_request(&config(), None).unwrap();
        assert_eq!((request.start, request.end), (5, 50));
        assert_eq!(request.max_rows, 10);
        assert_eq!(request.max_cols, 3);
    }

    #[test]
    fn test_query_rejects_inverted_keys() {
        let query = HeatmapQuery {
            startkey: Some("z".to_string()),
            endkey: Some("a".to_string()),
            ..Default::default()
        };
        let err = query.into_request(&config(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyRange { .. }));
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: Error| ApiError(err).into_response().status();
        assert_eq!(status(Error::EmptyRange { start: 1, end: 1 }), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::InvalidResolution(0)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::OutOfRange {
                start: 0,
                end: 1,
                earliest: 5
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(Error::InvalidBoundarySet("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
