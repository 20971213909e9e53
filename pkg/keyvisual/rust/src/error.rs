// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Errors raised by the heatmap engine.
//!
//! These are the recoverable conditions a caller can act on. Broken internal
//! invariants are not represented here: the engine panics on those instead of
//! rendering a wrong heatmap.

use thiserror::Error;

use crate::matrix::Timestamp;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The target boundaries are not an in-order subsequence of the chunk's
    /// boundaries that keeps both sentinels.
    #[error("invalid boundary set: {0}")]
    InvalidBoundarySet(String),

    #[error("invalid resolution: bucket budget must be at least 1, got {0}")]
    InvalidResolution(usize),

    #[error("time range [{start}, {end}] predates retained history starting at {earliest}")]
    OutOfRange {
        start: Timestamp,
        end: Timestamp,
        earliest: Timestamp,
    },

    #[error("empty time range: start {start} is not before end {end}")]
    EmptyRange { start: Timestamp, end: Timestamp },

    #[error("invalid key range: start key {start:?} is not before end key {end:?}")]
    InvalidKeyRange { start: String, end: String },

    /// A chunk handed in from outside the engine violates the chunk shape.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("axis at {got} is not newer than the latest stored axis at {latest}")]
    NonMonotonicTime { latest: Timestamp, got: Timestamp },
}

pub type Result<T> = std::result::Result<T, Error>;
