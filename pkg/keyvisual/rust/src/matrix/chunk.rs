// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Ordered key boundaries with one aggregated counter per bucket.
//!
//! A chunk partitions the key space with `keys`; `values[i]` belongs to the
//! half-open range `[keys[i], keys[i + 1])`. A chunk built from collected data
//! always spans the whole key space: it starts and ends with the empty key,
//! which stands for "before the first key" at the front and "after the last
//! key" at the back.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::KeyRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    keys: Vec<String>,
    values: Vec<u64>,
}

impl Chunk {
    /// Build a chunk from collected data, checking its shape.
    pub fn new(keys: Vec<String>, values: Vec<u64>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::MalformedChunk("chunk has no boundaries".to_string()));
        }
        if keys.len() != values.len() + 1 {
            return Err(Error::MalformedChunk(format!(
                "{} boundaries cannot delimit {} buckets",
                keys.len(),
                values.len()
            )));
        }
        if !keys[0].is_empty() || !keys[keys.len() - 1].is_empty() {
            return Err(Error::MalformedChunk(
                "chunk must start and end with the open sentinel".to_string(),
            ));
        }
        if keys.len() > 1 {
            let interior = &keys[1..keys.len() - 1];
            if let Some(key) = interior.iter().find(|k| k.is_empty()) {
                return Err(Error::MalformedChunk(format!(
                    "interior boundary {key:?} collides with the sentinel"
                )));
            }
            if let Some(pair) = interior.windows(2).find(|w| w[0] >= w[1]) {
                return Err(Error::MalformedChunk(format!(
                    "boundaries not strictly increasing at {:?} -> {:?}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Self { keys, values })
    }

    /// A chunk without any bucket.
    pub fn empty() -> Self {
        Self {
            keys: vec![String::new()],
            values: Vec::new(),
        }
    }

    /// Engine-internal constructor; shape is guaranteed by the caller.
    pub(crate) fn from_parts(keys: Vec<String>, values: Vec<u64>) -> Self {
        assert_eq!(
            keys.len(),
            values.len() + 1,
            "chunk boundaries and buckets out of step"
        );
        Self { keys, values }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> u64 {
        sum(&self.values)
    }

    pub(crate) fn into_values(self) -> Vec<u64> {
        self.values
    }

    /// Merge whole buckets so that only `target` boundaries remain.
    ///
    /// `target` must be an in-order subsequence of this chunk's boundaries
    /// that keeps the first and last one. The result is computed in a single
    /// forward pass and never splits an original bucket.
    pub fn reduce(&self, target: &[String]) -> Result<Chunk> {
        let indices = self.locate(target)?;
        let values = indices
            .windows(2)
            .map(|w| sum(&self.values[w[0]..w[1]]))
            .collect();
        Ok(Chunk::from_parts(target.to_vec(), values))
    }

    /// Map every target boundary to its index among this chunk's boundaries.
    fn locate(&self, target: &[String]) -> Result<Vec<usize>> {
        let last = self.keys.len() - 1;
        let (Some(first_key), Some(last_key)) = (target.first(), target.last()) else {
            return Err(Error::InvalidBoundarySet(
                "target boundary set is empty".to_string(),
            ));
        };
        if *first_key != self.keys[0] || *last_key != self.keys[last] {
            return Err(Error::InvalidBoundarySet(format!(
                "target must start at {:?} and end at {:?}",
                self.keys[0], self.keys[last]
            )));
        }
        if last == 0 {
            return match target.len() {
                1 => Ok(vec![0]),
                n => Err(Error::InvalidBoundarySet(format!(
                    "{n} boundaries requested from a chunk with a single boundary"
                ))),
            };
        }
        if target.len() < 2 {
            return Err(Error::InvalidBoundarySet(
                "target must keep both sentinels".to_string(),
            ));
        }

        let mut indices = Vec::with_capacity(target.len());
        indices.push(0);
        let mut cursor = 1;
        for key in &target[1..target.len() - 1] {
            match self.keys[cursor..last].iter().position(|k| k == key) {
                Some(offset) => {
                    indices.push(cursor + offset);
                    cursor += offset + 1;
                }
                None => {
                    return Err(Error::InvalidBoundarySet(format!(
                        "{key:?} is not an in-order boundary of the chunk"
                    )));
                }
            }
        }
        indices.push(last);
        Ok(indices)
    }

    /// Keep only the buckets overlapping `range`.
    ///
    /// A bucket partially inside the range is kept whole, so the result's
    /// outer boundaries may lie outside the range.
    pub fn clip(&self, range: &KeyRange) -> Chunk {
        if range.is_all() || self.is_empty() {
            return self.clone();
        }
        let last_bucket = self.values.len() - 1;
        let overlaps = |i: usize| {
            let lower = self.keys[i].as_str();
            let upper = self.keys[i + 1].as_str();
            let open_upper = i == last_bucket && upper.is_empty();
            let below_end = range.end().is_empty() || lower < range.end();
            let above_start = open_upper || upper > range.start();
            below_end && above_start
        };

        let Some(lo) = (0..self.values.len()).position(overlaps) else {
            return Chunk::empty();
        };
        let hi = (lo..self.values.len())
            .take_while(|&i| overlaps(i))
            .last()
            .unwrap_or(lo);
        Chunk::from_parts(
            self.keys[lo..=hi + 1].to_vec(),
            self.values[lo..=hi].to_vec(),
        )
    }

    /// Add another chunk with identical boundaries into this one.
    pub(crate) fn accumulate(&mut self, other: &Chunk) {
        assert_eq!(
            self.keys, other.keys,
            "accumulated chunks must share boundaries"
        );
        for (acc, value) in self.values.iter_mut().zip(&other.values) {
            *acc = acc.saturating_add(*value);
        }
    }
}

/// Boundaries present in both sets, keeping the shared sentinels.
///
/// Both inputs must be full-key-space boundary sets. The result is a valid
/// reduction target for either side.
pub fn common_boundaries(a: &[String], b: &[String]) -> Result<Vec<String>> {
    if a.len() < 2 || b.len() < 2 {
        return Err(Error::InvalidBoundarySet(
            "cannot intersect a boundary set without buckets".to_string(),
        ));
    }
    if a[0] != b[0] || a[a.len() - 1] != b[b.len() - 1] {
        return Err(Error::InvalidBoundarySet(
            "boundary sets do not share sentinels".to_string(),
        ));
    }

    let (left, right) = (&a[1..a.len() - 1], &b[1..b.len() - 1]);
    let mut keys = Vec::with_capacity(left.len().min(right.len()) + 2);
    keys.push(a[0].clone());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                keys.push(left[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    keys.push(a[a.len() - 1].clone());
    Ok(keys)
}

fn sum(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

#[cfg(test)]
pub(crate) fn keys(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|k| k.to_string()).collect()
}
