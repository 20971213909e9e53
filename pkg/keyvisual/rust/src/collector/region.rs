// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Live snapshots from the placement driver's region list.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collector::Collector;
use crate::error::Result;
use crate::matrix::{Axis, Chunk, Timestamp};

/// Region counter rendered by the heatmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionMetric {
    #[default]
    WrittenBytes,
    ReadBytes,
    WrittenKeys,
    ReadKeys,
    /// Read and written bytes together.
    Integration,
}

impl RegionMetric {
    fn value(self, region: &RegionInfo) -> u64 {
        match self {
            RegionMetric::WrittenBytes => region.written_bytes,
            RegionMetric::ReadBytes => region.read_bytes,
            RegionMetric::WrittenKeys => region.written_keys,
            RegionMetric::ReadKeys => region.read_keys,
            RegionMetric::Integration => region.read_bytes.saturating_add(region.written_bytes),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionsInfo {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub regions: Vec<RegionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegionInfo {
    #[serde(default)]
    pub start_key: String,
    #[serde(default)]
    pub end_key: String,
    #[serde(default)]
    pub written_bytes: u64,
    #[serde(default)]
    pub read_bytes: u64,
    #[serde(default)]
    pub written_keys: u64,
    #[serde(default)]
    pub read_keys: u64,
}

/// Lay regions out over the whole key space.
///
/// Uncovered gaps become zero buckets. A region overlapping one already
/// placed comes from a stale heartbeat and is skipped, as is a region whose
/// end does not follow its start.
pub fn chunk_from_regions(regions: &[RegionInfo], metric: RegionMetric) -> Result<Chunk> {
    let mut sorted: Vec<&RegionInfo> = regions.iter().collect();
    sorted.sort_by(|a, b| a.start_key.cmp(&b.start_key));

    let mut keys = vec![String::new()];
    let mut values = Vec::with_capacity(sorted.len() + 1);
    let mut covered_to = String::new();
    let mut reached_end = false;
    let mut skipped = 0usize;

    for region in sorted {
        let malformed = !region.end_key.is_empty() && region.end_key <= region.start_key;
        if reached_end || malformed || region.start_key < covered_to {
            skipped += 1;
            continue;
        }
        if region.start_key > covered_to {
            keys.push(region.start_key.clone());
            values.push(0);
        }
        values.push(metric.value(region));
        keys.push(region.end_key.clone());
        if region.end_key.is_empty() {
            reached_end = true;
        } else {
            covered_to = region.end_key.clone();
        }
    }
    if !reached_end {
        keys.push(String::new());
        values.push(0);
    }
    if skipped > 0 {
        tracing::debug!(skipped, "Skipped overlapping or malformed regions");
    }
    Chunk::new(keys, values)
}

pub struct RegionCollector {
    url: String,
    metric: RegionMetric,
    client: reqwest::Client,
}

impl RegionCollector {
    pub fn new(pd_endpoint: &str, metric: RegionMetric, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            url: format!("{}/pd/api/v1/regions", pd_endpoint.trim_end_matches('/')),
            metric,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Collector for RegionCollector {
    async fn collect(&mut self, now: Timestamp) -> anyhow::Result<Option<Axis>> {
        let info: RegionsInfo = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch regions")?
            .error_for_status()
            .context("Region request rejected")?
            .json()
            .await
            .context("Failed to parse regions response")?;

        tracing::debug!(count = info.count, received = info.regions.len(), "Fetched regions");
        let chunk = chunk_from_regions(&info.regions, self.metric)?;
        Ok(Some(Axis::new(now, chunk)))
    }

    fn name(&self) -> &'static str {
        "region"
    }
}
