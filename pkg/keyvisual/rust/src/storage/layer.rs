// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! A bounded ring of axes sampled at one granularity.
//!
//! When the ring overflows, its oldest axis moves to a one-slot staging area.
//! Once two axes are staged they are merged and handed to the caller, which
//! pushes the result into the next coarser layer. The staged axis is still
//! part of this layer's coverage and is returned by queries.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;
use crate::matrix::{Axis, TimeRange, Timestamp};

#[derive(Debug)]
pub struct Layer {
    granularity: Duration,
    capacity: usize,
    ring: VecDeque<Axis>,
    staged: Option<Axis>,
}

impl Layer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(granularity: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "layer capacity must be positive");
        Self {
            granularity,
            capacity,
            ring: VecDeque::with_capacity(capacity + 1),
            staged: None,
        }
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Axes held in the ring, excluding the staged one.
    ///
    /// Queries also serve the staged axis, so a layer retains up to
    /// `capacity + 1` axes in total.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty() && self.staged.is_none()
    }

    pub fn staged(&self) -> Option<&Axis> {
        self.staged.as_ref()
    }

    pub fn earliest(&self) -> Option<Timestamp> {
        self.staged
            .as_ref()
            .or_else(|| self.ring.front())
            .map(Axis::time)
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.ring
            .back()
            .or(self.staged.as_ref())
            .map(Axis::time)
    }

    /// Append the newest axis.
    ///
    /// Returns the merged axis that must move to the next coarser layer, if
    /// this append completed a pair of overflowed axes. On error the layer is
    /// left untouched.
    pub fn push(&mut self, axis: Axis) -> Result<Option<Axis>> {
        debug_assert!(
            self.latest().is_none_or(|latest| latest < axis.time()),
            "layer axes must be appended in time order"
        );

        if self.ring.len() < self.capacity {
            self.ring.push_back(axis);
            return Ok(None);
        }

        let merged = match (&self.staged, self.ring.front()) {
            (Some(staged), Some(oldest)) => Some(Axis::merge(staged, oldest)?),
            _ => None,
        };
        let oldest = self.ring.pop_front();
        self.ring.push_back(axis);
        if merged.is_some() {
            self.staged = None;
        } else {
            self.staged = oldest;
        }

        assert!(self.ring.len() <= self.capacity, "layer exceeded capacity");
        Ok(merged)
    }

    /// Axes with a timestamp inside `range`, oldest first.
    pub fn query(&self, range: &TimeRange) -> Vec<Axis> {
        self.axes()
            .filter(|axis| range.contains(axis.time()))
            .cloned()
            .collect()
    }

    /// Every axis held by the layer, oldest first.
    pub fn axes(&self) -> impl Iterator<Item = &Axis> {
        self.staged.iter().chain(self.ring.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Chunk;
    use crate::matrix::chunk::keys;
    use proptest::prelude::*;

    fn axis(time: Timestamp, value: u64) -> Axis {
        Axis::new(time, Chunk::new(keys(&["", "m", ""]), vec![value, 1]).unwrap())
    }

    fn layer(capacity: usize) -> Layer {
        Layer::new(Duration::from_secs(60), capacity)
    }

    #[test]
    fn test_push_within_capacity() {
        let mut layer = layer(3);
        for t in 1..=3 {
            assert!(layer.push(axis(t, 1)).unwrap().is_none());
        }
        assert_eq!(layer.len(), 3);
        assert!(layer.staged().is_none());
        assert_eq!(layer.earliest(), Some(1));
        assert_eq!(layer.latest(), Some(3));
    }

    #[test]
    fn test_overflow_stages_then_merges_pairs() {
        let mut layer = layer(2);
        layer.push(axis(1, 1)).unwrap();
        layer.push(axis(2, 2)).unwrap();

        assert!(layer.push(axis(3, 4)).unwrap().is_none());
        assert_eq!(layer.staged().map(Axis::time), Some(1));
        assert_eq!(layer.len(), 2);

        let merged = layer.push(axis(4, 8)).unwrap().expect("pair should merge");
        assert_eq!(merged.time(), 2);
        assert_eq!(merged.chunk().values(), &[3, 2]);
        assert!(layer.staged().is_none());
        assert_eq!(
            layer.axes().map(Axis::time).collect::<Vec<_>>(),
            vec![3, 4]
        );
    }

    #[test]
    fn test_query_includes_staged_axis() {
        let mut layer = layer(2);
        for t in 1..=3 {
            layer.push(axis(t * 10, 1)).unwrap();
        }
        let range = TimeRange::new(0, 100).unwrap();
        let times: Vec<_> = layer.query(&range).iter().map(Axis::time).collect();
        assert_eq!(times, vec![10, 20, 30]);

        let range = TimeRange::new(15, 25).unwrap();
        let times: Vec<_> = layer.query(&range).iter().map(Axis::time).collect();
        assert_eq!(times, vec![20]);
    }

    #[test]
    fn test_query_without_coverage_is_empty() {
        let layer = layer(4);
        assert!(layer.query(&TimeRange::new(0, 100).unwrap()).is_empty());
        assert!(layer.is_empty());
    }

    proptest! {
        #[test]
        fn test_capacity_holds_and_merges_are_counted(capacity in 1usize..8, appends in 0usize..64) {
            let mut layer = layer(capacity);
            let mut merges = 0;
            for t in 0..appends {
                if layer.push(axis(t as Timestamp + 1, 1)).unwrap().is_some() {
                    merges += 1;
                }
                prop_assert!(layer.len() <= capacity);
                prop_assert!(layer.axes().count() <= capacity + 1);
            }
            let overflowed = appends.saturating_sub(capacity);
            prop_assert_eq!(layer.len(), appends.min(capacity));
            prop_assert_eq!(merges, overflowed / 2);
            prop_assert_eq!(layer.staged().is_some(), overflowed % 2 == 1);
            prop_assert_eq!(
                layer.axes().count(),
                appends.min(capacity) + overflowed % 2
            );
        }
    }
}
