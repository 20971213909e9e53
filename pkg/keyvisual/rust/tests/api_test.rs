// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! End-to-end tests of the HTTP API against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use keyvisual::config::HeatmapConfig;
use keyvisual::server::{router, AppState};
use keyvisual::{Axis, Chunk, LayerConfig, LayerStore, MatrixBuilder};

fn keys(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|k| k.to_string()).collect()
}

fn app() -> axum::Router {
    let store = Arc::new(LayerStore::new(&[
        LayerConfig::new(Duration::from_secs(60), 4),
        LayerConfig::new(Duration::from_secs(120), 4),
    ]));
    for i in 1..=6 {
        let chunk = Chunk::new(keys(&["", "a", "m", "t", ""]), vec![1, 2 * i, 3, 4]).unwrap();
        store.append(Axis::new(1000 + i as i64 * 60, chunk)).unwrap();
    }
    router(Arc::new(AppState {
        builder: MatrixBuilder::new(store),
        heatmap: HeatmapConfig {
            max_rows: 100,
            max_cols: 100,
            default_window_secs: 3600,
        },
    }))
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_heatmap_defaults_cover_recent_window() {
    let (status, body) = get("/api/keyvisual/heatmaps").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keyAxis"], serde_json::json!(["", "a", "m", "t", ""]));

    // The two oldest samples were merged into one stamped 1120.
    let times = body["timeAxis"].as_array().unwrap();
    assert_eq!(times.len(), 5);
    assert_eq!(times.first(), Some(&Value::from(1120)));
    assert_eq!(times.last(), Some(&Value::from(1360)));

    let values = body["values"].as_array().unwrap();
    assert_eq!(values.len(), times.len());
    let total: u64 = values
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .map(|v| v.as_u64().unwrap())
        .sum();
    // Six samples of 1 + 2i + 3 + 4.
    assert_eq!(total, 6 * 8 + 2 * 21);
}

#[tokio::test]
async fn test_heatmap_key_filter_and_budgets() {
    let (status, body) =
        get("/api/keyvisual/heatmaps?starttime=1000&endtime=2000&startkey=b&endkey=n&maxrows=2&maxcols=1")
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keyAxis"], serde_json::json!(["a", "t"]));
    assert_eq!(body["timeAxis"].as_array().unwrap().len(), 2);
    for row in body["values"].as_array().unwrap() {
        assert_eq!(row.as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_heatmap_error_statuses() {
    let (status, body) = get("/api/keyvisual/heatmaps?starttime=50&endtime=50").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty time range"));

    let (status, _) = get("/api/keyvisual/heatmaps?starttime=0&endtime=10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get("/api/keyvisual/heatmaps?startkey=z&endkey=a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get("/api/keyvisual/heatmaps?maxcols=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_layers_report_retention() {
    let (status, body) = get("/api/keyvisual/layers").await;
    assert_eq!(status, StatusCode::OK);
    let layers = body["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["granularity_secs"], 60);
    assert_eq!(layers[0]["capacity"], 4);
    assert_eq!(layers[0]["len"], 4);
    assert_eq!(layers[0]["latest"], 1360);
}
