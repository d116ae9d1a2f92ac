//! Agent configuration

use anyhow::{Context, Result};
use heat_lib::{pyrometer::EvaluationConfig, Dimension};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name, stamped on every log event and flow unit
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics/temperature
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory the collectors drop `<dimension>.json` snapshots into
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Evaluation interval in seconds
    #[serde(default = "default_evaluation_interval")]
    pub evaluation_interval_secs: u64,

    /// Zone threshold on the normalized scale
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Comma separated dimensions; empty means all of them
    #[serde(default)]
    pub dimensions: String,

    /// Hottest shards persisted per dimension
    #[serde(default = "default_top_consumers")]
    pub top_consumers: usize,

    /// Rows kept per summary table before the oldest are dropped
    #[serde(default = "default_max_rows_per_table")]
    pub max_rows_per_table: usize,

    /// Consecutive failed evaluations before a dimension turns unhealthy
    #[serde(default = "default_unhealthy_after")]
    pub unhealthy_after: u32,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("/var/lib/heat/snapshots")
}

fn default_evaluation_interval() -> u64 {
    heat_lib::pyrometer::DEFAULT_EVALUATION_INTERVAL.as_secs()
}

fn default_threshold() -> f64 {
    heat_lib::temperature::DEFAULT_THRESHOLD
}

fn default_top_consumers() -> usize {
    heat_lib::pyrometer::DEFAULT_TOP_CONSUMERS
}

fn default_max_rows_per_table() -> usize {
    heat_lib::persist::DEFAULT_MAX_ROWS_PER_TABLE
}

fn default_unhealthy_after() -> u32 {
    heat_lib::health::DEFAULT_UNHEALTHY_AFTER
}

impl AgentConfig {
    /// Load configuration from `HEAT_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("HEAT"))
    }

    pub fn from_env(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    /// Dimensions to evaluate, in configuration order
    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        let names: Vec<&str> = self
            .dimensions
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Ok(Dimension::ALL.to_vec());
        }
        names
            .into_iter()
            .map(|name| name.parse::<Dimension>().map_err(anyhow::Error::msg))
            .collect()
    }

    pub fn evaluation_config(&self) -> Result<EvaluationConfig> {
        Ok(EvaluationConfig {
            interval: Duration::from_secs(self.evaluation_interval_secs.max(1)),
            dimensions: self.dimensions()?,
            threshold: self.threshold,
            top_consumers: self.top_consumers,
            max_rows_per_table: self.max_rows_per_table.max(1),
            node_id: self.node_name.clone(),
            ..Default::default()
        })
    }
}
