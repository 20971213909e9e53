// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Ingestion of key-space snapshots into the layer store.
//!
//! A [`Collector`] produces at most one axis per tick. [`run_collector`] is
//! the single writer of a store: it drives one collector on a fixed interval
//! until shutdown is signalled.

pub mod file;
pub mod region;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::matrix::{Axis, Timestamp};
use crate::storage::LayerStore;

pub use file::{AxisRecord, FileCollector};
pub use region::{RegionCollector, RegionMetric};

/// Source of key-space snapshots.
#[async_trait]
pub trait Collector: Send {
    /// Fetch the snapshot for the tick at `now`.
    ///
    /// `Ok(None)` means there is nothing to ingest this tick.
    async fn collect(&mut self, now: Timestamp) -> anyhow::Result<Option<Axis>>;

    fn name(&self) -> &'static str;
}

/// Feed `store` from `collector` every `interval` until `shutdown` flips to
/// true or its sender goes away.
///
/// Late ticks are skipped rather than queued. A failed fetch or a rejected
/// axis is logged and leaves the store untouched.
pub async fn run_collector<C: Collector>(
    store: Arc<LayerStore>,
    mut collector: C,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(
        collector = collector.name(),
        interval_ms = interval.as_millis() as u64,
        "Starting collector loop"
    );

    let mut ingested = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now().timestamp();
                match collector.collect(now).await {
                    Ok(Some(axis)) => {
                        let time = axis.time();
                        match store.append(axis) {
                            Ok(()) => ingested += 1,
                            Err(e) => tracing::warn!(error = %e, time, "Rejected collected axis"),
                        }
                    }
                    Ok(None) => tracing::debug!(collector = collector.name(), "Nothing collected"),
                    Err(e) => tracing::warn!(error = %e, collector = collector.name(), "Collection failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(collector = collector.name(), ingested, "Collector loop stopped");
}
