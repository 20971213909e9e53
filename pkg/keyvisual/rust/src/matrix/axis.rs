// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Time-stamped chunks and the choice of which boundaries survive a budget.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::{Error, Result};
use crate::matrix::Timestamp;
use crate::matrix::chunk::{Chunk, common_boundaries};

/// One full-resolution snapshot of the key space at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    time: Timestamp,
    chunk: Chunk,
}

impl Axis {
    pub fn new(time: Timestamp, chunk: Chunk) -> Self {
        Self { time, chunk }
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn into_chunk(self) -> Chunk {
        self.chunk
    }

    /// Combine two adjacent samples into one covering both.
    ///
    /// Both chunks are reduced to the boundaries they have in common and
    /// summed bucket by bucket. The result carries the newer timestamp: it
    /// stands for the period ending at `newer`.
    pub fn merge(older: &Axis, newer: &Axis) -> Result<Axis> {
        debug_assert!(older.time < newer.time, "merged axes out of order");
        let chunk = if older.chunk.is_empty() {
            newer.chunk.clone()
        } else if newer.chunk.is_empty() {
            older.chunk.clone()
        } else {
            let keys = common_boundaries(older.chunk.keys(), newer.chunk.keys())?;
            let mut merged = older.chunk.reduce(&keys)?;
            merged.accumulate(&newer.chunk.reduce(&keys)?);
            merged
        };
        Ok(Axis::new(newer.time, chunk))
    }
}

/// Picks the boundaries to keep when a chunk must fit a bucket budget.
///
/// Implementations must always keep the chunk's first and last boundary,
/// return at most `max_buckets + 1` boundaries, and be deterministic.
pub trait BoundaryStrategy: fmt::Debug + Send + Sync {
    fn select(&self, chunk: &Chunk, max_buckets: usize) -> Result<Vec<String>>;
}

/// Keeps hot buckets apart and folds cold runs into similarly sized groups.
///
/// A threshold is searched so that the number of groups fits the budget.
/// Scanning left to right, a new group starts before any bucket whose value
/// reaches the threshold, and after a group whose sum reaches it. Hot buckets
/// therefore keep their own column while cold neighbours merge into
/// evenly weighted runs.
///
/// Mass alone cannot tell tied buckets apart, so whatever budget the grouping
/// leaves unused goes to splitting the widest groups into evenly spaced
/// pieces. An idle stretch of key space keeps its shape instead of folding
/// into one column.
#[derive(Debug, Default, Clone, Copy)]
pub struct HotspotStrategy;

impl HotspotStrategy {
    /// Start index of every group after the first, plus the end index.
    fn group_ends(values: &[u64], threshold: u64) -> Vec<usize> {
        let mut ends = Vec::new();
        let mut start = 0;
        let mut group_sum = 0u64;
        for (i, &value) in values.iter().enumerate() {
            if i > start && (value >= threshold || group_sum >= threshold) {
                ends.push(i);
                start = i;
                group_sum = 0;
            }
            group_sum = group_sum.saturating_add(value);
        }
        if values.len() > start {
            ends.push(values.len());
        }
        ends
    }

    fn group_count(values: &[u64], threshold: u64) -> usize {
        Self::group_ends(values, threshold).len()
    }

    /// Cut groups into more pieces until `max_buckets` are used.
    ///
    /// Each step gives one more piece to the group whose pieces are widest,
    /// leftmost first on ties. A group is cut into pieces of near equal
    /// bucket count and never below one bucket per piece.
    fn spread(ends: &[usize], max_buckets: usize) -> Vec<usize> {
        let groups: Vec<(usize, usize)> = ends
            .iter()
            .scan(0, |start, &end| {
                let group = (*start, end);
                *start = end;
                Some(group)
            })
            .collect();

        let mut pieces = vec![1usize; groups.len()];
        let mut widest: BinaryHeap<(usize, Reverse<usize>)> = groups
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| (end - start, Reverse(i)))
            .collect();
        let mut used = groups.len();
        while used < max_buckets {
            let Some((width, Reverse(i))) = widest.pop() else {
                break;
            };
            if width <= 1 {
                break;
            }
            pieces[i] += 1;
            used += 1;
            let (start, end) = groups[i];
            widest.push(((end - start).div_ceil(pieces[i]), Reverse(i)));
        }

        let mut spread = Vec::with_capacity(used);
        for (&(start, end), &count) in groups.iter().zip(&pieces) {
            let span = end - start;
            spread.extend((1..count).map(|k| start + span * k / count));
            spread.push(end);
        }
        spread
    }
}

impl BoundaryStrategy for HotspotStrategy {
    fn select(&self, chunk: &Chunk, max_buckets: usize) -> Result<Vec<String>> {
        if max_buckets < 1 {
            return Err(Error::InvalidResolution(max_buckets));
        }
        if chunk.len() <= max_buckets {
            return Ok(chunk.keys().to_vec());
        }

        let values = chunk.values();
        // Above the total no group ever splits, so `hi` always fits.
        let (mut lo, mut hi) = (0u64, chunk.total().saturating_add(1));
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if Self::group_count(values, mid) > max_buckets {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let keys = chunk.keys();
        let mut selected = Vec::with_capacity(max_buckets + 1);
        selected.push(keys[0].clone());
        let ends = Self::spread(&Self::group_ends(values, hi), max_buckets);
        selected.extend(ends.into_iter().map(|end| keys[end].clone()));
        assert!(
            selected.len() <= max_buckets + 1,
            "boundary selection exceeded its budget"
        );
        Ok(selected)
    }
}
