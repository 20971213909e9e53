// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Heatmap data model: chunks, axes and the matrices rendered from them.
//!
//! - `chunk` - key boundaries with per-bucket counters, and their reduction
//! - `axis` - time-stamped chunks and the boundary selection strategy
//! - `builder` - assembles a bounded matrix from the layered store

pub mod axis;
pub mod builder;
pub mod chunk;

use serde::Serialize;

use crate::error::{Error, Result};

pub use axis::{Axis, BoundaryStrategy, HotspotStrategy};
pub use builder::{HeatmapRequest, MatrixBuilder};
pub use chunk::Chunk;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Inclusive time range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(Error::EmptyRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, time: Timestamp) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Half-open key range `[start, end)`; an empty `end` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRange {
    start: String,
    end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let (start, end) = (start.into(), end.into());
        if !end.is_empty() && start >= end {
            return Err(Error::InvalidKeyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole key space.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn is_all(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// Time-ordered rows sharing one set of key boundaries.
///
/// `values[row][bucket]` is the counter of bucket
/// `[key_axis[bucket], key_axis[bucket + 1])` for the sample at
/// `time_axis[row]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    pub key_axis: Vec<String>,
    pub time_axis: Vec<Timestamp>,
    pub values: Vec<Vec<u64>>,
}

impl Matrix {
    /// Stack rows that were all reduced to `keys`.
    pub(crate) fn from_rows(keys: Vec<String>, rows: Vec<(Timestamp, Chunk)>) -> Self {
        let mut time_axis = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (time, chunk) in rows {
            assert_eq!(chunk.keys(), keys.as_slice(), "matrix rows must share boundaries");
            assert!(
                time_axis.last().is_none_or(|&last| last < time),
                "matrix rows must be time ordered"
            );
            time_axis.push(time);
            values.push(chunk.into_values());
        }
        Self {
            key_axis: keys,
            time_axis,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.time_axis.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (Timestamp, &[u64])> {
        self.time_axis
            .iter()
            .copied()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Merge consecutive rows until at most `max_rows` remain.
    ///
    /// Rows are grouped oldest first; each group is summed and stamped with
    /// its newest timestamp.
    pub fn compact_rows(self, max_rows: usize) -> Result<Matrix> {
        if max_rows < 1 {
            return Err(Error::InvalidResolution(max_rows));
        }
        let rows = self.time_axis.len();
        if rows <= max_rows {
            return Ok(self);
        }

        let group = rows.div_ceil(max_rows);
        let width = self.key_axis.len().saturating_sub(1);
        let time_axis = self
            .time_axis
            .chunks(group)
            .filter_map(|times| times.last().copied())
            .collect();
        let values = self
            .values
            .chunks(group)
            .map(|group_rows| {
                let mut merged = vec![0u64; width];
                for row in group_rows {
                    for (acc, value) in merged.iter_mut().zip(row) {
                        *acc = acc.saturating_add(*value);
                    }
                }
                merged
            })
            .collect();
        Ok(Matrix {
            key_axis: self.key_axis,
            time_axis,
            values,
        })
    }
}
