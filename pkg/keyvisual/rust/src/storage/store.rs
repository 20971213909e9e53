// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Stack of layers at doubling granularities.
//!
//! The finest layer receives every collected axis. Overflowing pairs cascade
//! into coarser layers and leave the coarsest one for good. Each layer sits
//! behind its own lock: the single writer holds at most two adjacent layer
//! locks while moving a merged axis down, and readers hold one at a time,
//! finest first, so a query never sees a pair missing from both layers.

use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::matrix::chunk::{Chunk, common_boundaries};
use crate::matrix::{Axis, BoundaryStrategy, HotspotStrategy, KeyRange, Matrix, TimeRange, Timestamp};
use crate::storage::layer::Layer;

const POISONED: &str = "layer lock poisoned by a panicking writer";

/// Shape of one layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfig {
    pub granularity: Duration,
    pub capacity: usize,
}

impl LayerConfig {
    pub fn new(granularity: Duration, capacity: usize) -> Self {
        Self {
            granularity,
            capacity,
        }
    }
}

/// Point-in-time description of one layer.
///
/// `len` counts the ring only. A layer with a `staged` axis serves
/// `len + 1` axes, so retention per layer peaks at `capacity + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerStats {
    pub granularity_secs: u64,
    pub capacity: usize,
    pub len: usize,
    pub staged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Timestamp>,
}

#[derive(Debug)]
pub struct LayerStore {
    layers: Vec<RwLock<Layer>>,
    strategy: Arc<dyn BoundaryStrategy>,
}

impl LayerStore {
    /// # Panics
    ///
    /// Panics if `configs` is empty or granularities are not strictly
    /// increasing.
    pub fn new(configs: &[LayerConfig]) -> Self {
        Self::with_strategy(configs, Arc::new(HotspotStrategy))
    }

    pub fn with_strategy(configs: &[LayerConfig], strategy: Arc<dyn BoundaryStrategy>) -> Self {
        assert!(!configs.is_empty(), "layer store needs at least one layer");
        assert!(
            configs
                .windows(2)
                .all(|w| w[0].granularity < w[1].granularity),
            "layer granularities must be strictly increasing"
        );

        let layers: Vec<_> = configs
            .iter()
            .map(|c| RwLock::new(Layer::new(c.granularity, c.capacity)))
            .collect();
        info!(
            layers = layers.len(),
            retained_axes = configs.iter().map(|c| c.capacity).sum::<usize>(),
            "Created layer store"
        );
        Self { layers, strategy }
    }

    fn read(&self, index: usize) -> RwLockReadGuard<'_, Layer> {
        self.layers[index].read().expect(POISONED)
    }

    /// Ingest the newest axis and cascade compaction through coarser layers.
    ///
    /// Axes must arrive in strictly increasing time order.
    pub fn append(&self, axis: Axis) -> Result<()> {
        let time = axis.time();
        let mut guard = self.layers[0].write().expect(POISONED);
        if let Some(latest) = guard.latest() {
            if time <= latest {
                return Err(Error::NonMonotonicTime { latest, got: time });
            }
        }

        let mut carry = guard.push(axis)?;
        for (depth, layer) in self.layers.iter().enumerate().skip(1) {
            let Some(merged) = carry.take() else {
                break;
            };
            debug!(depth, time = merged.time(), "Cascading compacted axis");
            // Take the next lock before releasing the current one so readers
            // never observe the merged pair in neither layer.
            let mut next = layer.write().expect(POISONED);
            carry = next.push(merged)?;
            guard = next;
        }
        drop(guard);

        if let Some(discarded) = carry {
            debug!(
                time = discarded.time(),
                "Discarded axis older than the coarsest layer"
            );
        }
        Ok(())
    }

    /// Earliest and latest retained timestamps.
    pub fn retained_window(&self) -> Option<(Timestamp, Timestamp)> {
        let latest = (0..self.layers.len()).find_map(|i| self.read(i).latest())?;
        let earliest = (0..self.layers.len())
            .rev()
            .find_map(|i| self.read(i).earliest())?;
        Some((earliest, latest))
    }

    pub fn stats(&self) -> Vec<LayerStats> {
        (0..self.layers.len())
            .map(|i| {
                let layer = self.read(i);
                LayerStats {
                    granularity_secs: layer.granularity().as_secs(),
                    capacity: layer.capacity(),
                    len: layer.len(),
                    staged: layer.staged().is_some(),
                    earliest: layer.earliest(),
                    latest: layer.latest(),
                }
            })
            .collect()
    }

    /// Axes covering `range`, oldest first, taken from the finest layer
    /// available for each instant.
    pub fn collect(&self, range: TimeRange) -> Result<Vec<Axis>> {
        range.validate()?;

        let mut per_layer = Vec::with_capacity(self.layers.len());
        let mut covered_from: Option<Timestamp> = None;
        let mut earliest: Option<Timestamp> = None;
        for i in 0..self.layers.len() {
            let layer = self.read(i);
            if let Some(t) = layer.earliest() {
                earliest = Some(t);
            }
            let mut axes = layer.query(&range);
            drop(layer);

            // Finer layers already cover everything from `covered_from` on.
            if let Some(boundary) = covered_from {
                axes.retain(|axis| axis.time() < boundary);
            }
            if let Some(first) = axes.first() {
                covered_from = Some(first.time());
            }
            per_layer.push(axes);
        }

        let axes: Vec<Axis> = per_layer.into_iter().rev().flatten().collect();
        if axes.is_empty() {
            if let Some(earliest) = earliest {
                if range.end < earliest {
                    return Err(Error::OutOfRange {
                        start: range.start,
                        end: range.end,
                        earliest,
                    });
                }
            }
        }
        Ok(axes)
    }

    /// Matrix of every axis in `range`, sharing at most `max_buckets` buckets.
    pub fn query(&self, range: TimeRange, max_buckets: usize) -> Result<Matrix> {
        self.query_range(range, &KeyRange::all(), max_buckets)
    }

    /// Like [`LayerStore::query`], restricted to buckets overlapping
    /// `key_range`.
    pub fn query_range(
        &self,
        range: TimeRange,
        key_range: &KeyRange,
        max_buckets: usize,
    ) -> Result<Matrix> {
        if max_buckets < 1 {
            return Err(Error::InvalidResolution(max_buckets));
        }
        let axes: Vec<Axis> = self
            .collect(range)?
            .into_iter()
            .filter(|axis| !axis.chunk().is_empty())
            .collect();
        let Some((first, rest)) = axes.split_first() else {
            return Ok(Matrix::default());
        };

        // Only boundaries every row has can be shared by all rows.
        let mut shared = first.chunk().keys().to_vec();
        for axis in rest {
            shared = common_boundaries(&shared, axis.chunk().keys())?;
        }

        let mut rows = Vec::with_capacity(axes.len());
        let mut total: Option<Chunk> = None;
        for axis in &axes {
            let row = axis.chunk().reduce(&shared)?.clip(key_range);
            match total.as_mut() {
                Some(total) => total.accumulate(&row),
                None => total = Some(row.clone()),
            }
            rows.push((axis.time(), row));
        }
        let Some(total) = total else {
            return Ok(Matrix::default());
        };

        let selected = self.strategy.select(&total, max_buckets)?;
        let rows = rows
            .into_iter()
            .map(|(time, row)| Ok((time, row.reduce(&selected)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matrix::from_rows(selected, rows))
    }
}
