// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Key-space heatmaps for a distributed key-value cluster.
//!
//! The service samples per-range traffic counters at a fixed interval and
//! keeps them in a stack of layers with doubling time granularity, so recent
//! history stays fine grained while older history is folded into coarser
//! samples. Queries turn any retained time window into a matrix that fits a
//! caller-supplied row and column budget.
//!
//! ## Architecture
//!
//! 1. **Matrix model** (`matrix` module) - chunks of key boundaries with one
//!    counter per bucket, reduction onto coarser boundaries, and the hotspot
//!    aware choice of which boundaries survive a budget.
//!
//! 2. **Storage** (`storage` module) - bounded layers that merge overflowing
//!    samples pairwise and cascade them into the next, coarser layer.
//!
//! 3. **Collectors** (`collector` module) - the single writer feeding the
//!    store, either from live region statistics or from a replay file.
//!
//! 4. **API** (`server` module) - the HTTP surface serving heatmaps.
//!
//! ## Usage
//!
//! ```bash
//! keyvisual --config keyvisual.yaml --pd http://pd:2379 --port 12333
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod matrix;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
pub use matrix::{Axis, Chunk, HeatmapRequest, KeyRange, Matrix, MatrixBuilder, TimeRange, Timestamp};
pub use storage::{LayerConfig, LayerStore};
