// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Service configuration loaded from a YAML file.
//!
//! Every section is optional; missing values fall back to the defaults
//! below. Command-line flags are applied on top by the binary before
//! [`Config::validate`] runs.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::RegionMetric;
use crate::matrix::Timestamp;
use crate::storage::LayerConfig;

const DEFAULT_LISTEN: &str = "127.0.0.1:12333";
const DEFAULT_PD_ENDPOINT: &str = "http://127.0.0.1:2379";
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REPLAY_INTERVAL_MS: u64 = 100;
const DEFAULT_LAYER_COUNT: usize = 7;
const DEFAULT_LAYER_CAPACITY: usize = 120;
const DEFAULT_MAX_ROWS: usize = 1000;
const DEFAULT_MAX_COLS: usize = 1536;
const DEFAULT_WINDOW_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    pub collector: CollectorConfig,
    pub layers: Vec<LayerTier>,
    pub heatmap: HeatmapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 12333))),
            collector: CollectorConfig::default(),
            layers: vec![
                LayerTier {
                    capacity: DEFAULT_LAYER_CAPACITY
                };
                DEFAULT_LAYER_COUNT
            ],
            heatmap: HeatmapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorMode {
    /// Poll the placement driver for region statistics.
    #[default]
    Region,
    /// Replay recorded snapshots.
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub mode: CollectorMode,
    pub interval_secs: u64,
    pub pd_endpoint: String,
    pub metric: RegionMetric,
    pub timeout_secs: u64,
    pub file: FileSourceConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mode: CollectorMode::default(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            pd_endpoint: DEFAULT_PD_ENDPOINT.to_string(),
            metric: RegionMetric::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            file: FileSourceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    pub path: Option<PathBuf>,
    /// Replay window, Unix seconds. Both bounds are required in file mode.
    pub start: Timestamp,
    pub end: Timestamp,
    /// Delay between replayed records.
    pub replay_interval_ms: u64,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            start: 0,
            end: 0,
            replay_interval_ms: DEFAULT_REPLAY_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTier {
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub max_rows: usize,
    pub max_cols: usize,
    pub default_window_secs: u64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_cols: DEFAULT_MAX_COLS,
            default_window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.layers.is_empty() {
            return invalid("at least one layer is required".to_string());
        }
        if let Some((index, layer)) = self.layers.iter().enumerate().find(|(_, l)| l.capacity < 2) {
            return invalid(format!(
                "layer {index} has capacity {}, at least 2 is required",
                layer.capacity
            ));
        }
        if self.collector.interval_secs < 1 {
            return invalid("collector.interval_secs must be at least 1".to_string());
        }
        if self.heatmap.max_rows < 1 || self.heatmap.max_cols < 1 {
            return invalid("heatmap.max_rows and heatmap.max_cols must be at least 1".to_string());
        }
        self.layer_configs()?;

        if self.collector.mode == CollectorMode::File {
            let file = &self.collector.file;
            if file.path.is_none() {
                return invalid("file mode requires collector.file.path".to_string());
            }
            if file.start == 0 || file.end == 0 {
                return invalid("file mode requires both collector.file.start and collector.file.end".to_string());
            }
            if file.start >= file.end {
                return invalid(format!(
                    "collector.file.start {} must be before collector.file.end {}",
                    file.start, file.end
                ));
            }
            if file.replay_interval_ms < 1 {
                return invalid("collector.file.replay_interval_ms must be at least 1".to_string());
            }
        }
        Ok(())
    }

    /// Layer shapes, each tier twice as coarse as the previous one.
    pub fn layer_configs(&self) -> Result<Vec<LayerConfig>, ConfigError> {
        let base = self.collector.interval_secs;
        self.layers
            .iter()
            .enumerate()
            .map(|(tier, layer)| {
                let secs = u32::try_from(tier)
                    .ok()
                    .and_then(|tier| 2u64.checked_pow(tier))
                    .and_then(|factor| base.checked_mul(factor))
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!("layer {tier} granularity overflows"))
                    })?;
                Ok(LayerConfig::new(Duration::from_secs(secs), layer.capacity))
            })
            .collect()
    }

    /// Delay between collector ticks for the configured mode.
    pub fn tick_interval(&self) -> Duration {
        match self.collector.mode {
            CollectorMode::Region => Duration::from_secs(self.collector.interval_secs),
            CollectorMode::File => Duration::from_millis(self.collector.file.replay_interval_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen.port(), 12333);
        assert_eq!(config.layers.len(), 7);
        assert_eq!(config.heatmap.max_cols, 1536);
        config.validate().unwrap();

        let layers = config.layer_configs().unwrap();
        assert_eq!(layers[0].granularity, Duration::from_secs(60));
        assert_eq!(layers[6].granularity, Duration::from_secs(60 * 64));
        assert!(layers.iter().all(|l| l.capacity == 120));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
listen: "0.0.0.0:8080"
collector:
  interval_secs: 30
  metric: integration
layers:
  - capacity: 10
  - capacity: 4
heatmap:
  max_rows: 50
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.collector.metric, RegionMetric::Integration);
        assert_eq!(config.collector.pd_endpoint, DEFAULT_PD_ENDPOINT);
        assert_eq!(config.heatmap.max_rows, 50);
        assert_eq!(config.heatmap.max_cols, DEFAULT_MAX_COLS);
        assert_eq!(
            config.layer_configs().unwrap(),
            vec![
                LayerConfig::new(Duration::from_secs(30), 10),
                LayerConfig::new(Duration::from_secs(60), 4),
            ]
        );
        assert_eq!(config.tick_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_unknown_metric() {
        let err = Config::from_yaml_str("collector:\n  metric: cpu\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_layers() {
        let mut config = Config::default();
        config.layers.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.layers = vec![LayerTier { capacity: 1 }];
        assert!(config.validate().unwrap_err().to_string().contains("layer 0"));
    }

    #[test]
    fn test_validate_rejects_zero_budgets_and_interval() {
        let mut config = Config::default();
        config.heatmap.max_cols = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.collector.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_mode_requires_window() {
        let mut config = Config::default();
        config.collector.mode = CollectorMode::File;
        config.collector.file.path = Some(PathBuf::from("/tmp/keyviz.jsonl"));
        assert!(config.validate().is_err());

        config.collector.file.start = 200;
        config.collector.file.end = 100;
        assert!(config.validate().is_err());

        config.collector.file.end = 300;
        config.validate().unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_granularity_overflow_is_invalid() {
        let mut config = Config::default();
        config.collector.interval_secs = u64::MAX / 2;
        assert!(config.layer_configs().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyvisual.yaml");
        std::fs::write(&path, "heatmap:\n  max_cols: 64\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().heatmap.max_cols, 64);

        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
