// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Turns a heatmap request into a matrix that fits the display budget.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::{KeyRange, Matrix, TimeRange, Timestamp};
use crate::storage::LayerStore;

/// A bounded heatmap query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapRequest {
    pub start: Timestamp,
    pub end: Timestamp,
    pub key_range: KeyRange,
    pub max_rows: usize,
    pub max_cols: usize,
}

#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    store: Arc<LayerStore>,
}

impl MatrixBuilder {
    pub fn new(store: Arc<LayerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<LayerStore> {
        &self.store
    }

    pub fn build(&self, request: &HeatmapRequest) -> Result<Matrix> {
        if request.max_rows < 1 {
            return Err(Error::InvalidResolution(request.max_rows));
        }
        let range = TimeRange {
            start: request.start,
            end: request.end,
        };
        let matrix = self
            .store
            .query_range(range, &request.key_range, request.max_cols)?;
        let rows = matrix.time_axis.len();
        let matrix = matrix.compact_rows(request.max_rows)?;

        debug!(
            start = request.start,
            end = request.end,
            rows,
            kept_rows = matrix.time_axis.len(),
            cols = matrix.key_axis.len().saturating_sub(1),
            "Built heatmap matrix"
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::chunk::keys;
    use crate::matrix::{Axis, Chunk};
    use crate::storage::LayerConfig;
    use std::time::Duration;

    fn store_with(samples: Vec<(Timestamp, Vec<&str>, Vec<u64>)>) -> Arc<LayerStore> {
        let store = LayerStore::new(&[
            LayerConfig::new(Duration::from_secs(60), 8),
            LayerConfig::new(Duration::from_secs(120), 8),
        ]);
        for (time, raw_keys, values) in samples {
            let chunk = Chunk::new(keys(&raw_keys), values).unwrap();
            store.append(Axis::new(time, chunk)).unwrap();
        }
        Arc::new(store)
    }

    fn request(start: Timestamp, end: Timestamp) -> HeatmapRequest {
        HeatmapRequest {
            start,
            end,
            key_range: KeyRange::all(),
            max_rows: 100,
            max_cols: 100,
        }
    }

    #[test]
    fn test_build_filters_keys_without_splitting_buckets() {
        let builder = MatrixBuilder::new(store_with(vec![
            (60, vec!["", "a", "c", "e", ""], vec![1, 2, 3, 4]),
            (120, vec!["", "a", "c", "e", ""], vec![10, 20, 30, 40]),
        ]));
        let mut req = request(0, 200);
        req.key_range = KeyRange::new("b", "d").unwrap();

        let matrix = builder.build(&req).unwrap();
        assert_eq!(matrix.key_axis, keys(&["a", "c", "e"]));
        assert_eq!(matrix.time_axis, vec![60, 120]);
        assert_eq!(matrix.values, vec![vec![2, 3], vec![20, 30]]);
    }

    #[test]
    fn test_build_respects_row_budget() {
        let samples = (1..=6)
            .map(|i| (i * 60, vec!["", "k", ""], vec![1, 2]))
            .collect();
        let builder = MatrixBuilder::new(store_with(samples));
        let mut req = request(0, 1000);
        req.max_rows = 3;

        let matrix = builder.build(&req).unwrap();
        assert_eq!(matrix.time_axis, vec![120, 240, 360]);
        assert_eq!(matrix.values, vec![vec![2, 4]; 3]);
    }

    #[test]
    fn test_build_rejects_zero_budgets() {
        let builder = MatrixBuilder::new(store_with(vec![(60, vec!["", ""], vec![1])]));
        let mut req = request(0, 100);
        req.max_rows = 0;
        assert_eq!(builder.build(&req).unwrap_err(), Error::InvalidResolution(0));

        let mut req = request(0, 100);
        req.max_cols = 0;
        assert_eq!(builder.build(&req).unwrap_err(), Error::InvalidResolution(0));
    }
}
