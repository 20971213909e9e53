// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Time-tiered retention of collected axes.

pub mod layer;
pub mod store;

pub use layer::Layer;
pub use store::{LayerConfig, LayerStats, LayerStore};
