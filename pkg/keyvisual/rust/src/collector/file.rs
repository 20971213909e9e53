// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Replay of recorded snapshots from a JSON-lines file.
//!
//! Each line holds one `{"time", "keys", "values"}` record. Only records
//! inside the replay window are kept, and they are handed out oldest first,
//! one per tick.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collector::Collector;
use crate::matrix::{Axis, Chunk, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRecord {
    pub time: Timestamp,
    pub keys: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Debug)]
pub struct FileCollector {
    records: VecDeque<AxisRecord>,
}

impl FileCollector {
    pub fn open(path: &Path, start: Timestamp, end: Timestamp) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open replay file {}", path.display()))?;
        let collector = Self::from_reader(BufReader::new(file), start, end)?;
        tracing::info!(
            path = %path.display(),
            start,
            end,
            records = collector.remaining(),
            "Loaded replay file"
        );
        Ok(collector)
    }

    pub fn from_reader<R: BufRead>(reader: R, start: Timestamp, end: Timestamp) -> anyhow::Result<Self> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read replay file")?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AxisRecord = serde_json::from_str(&line)
                .with_context(|| format!("Invalid replay record on line {}", index + 1))?;
            if (start..=end).contains(&record.time) {
                records.push(record);
            }
        }

        // Stable sort keeps the first record written for a repeated time.
        records.sort_by_key(|record| record.time);
        records.dedup_by_key(|record| record.time);
        Ok(Self {
            records: records.into(),
        })
    }

    /// Records not yet replayed.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl Collector for FileCollector {
    async fn collect(&mut self, _now: Timestamp) -> anyhow::Result<Option<Axis>> {
        let Some(record) = self.records.pop_front() else {
            return Ok(None);
        };
        let chunk = Chunk::new(record.keys, record.values)
            .with_context(|| format!("Replay record at {} is not a valid chunk", record.time))?;
        Ok(Some(Axis::new(record.time, chunk)))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
