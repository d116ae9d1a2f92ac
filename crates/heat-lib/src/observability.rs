//! Observability infrastructure for the heat engine
//!
//! Provides:
//! - Prometheus metrics (evaluation latency and outcomes, shards per zone, persisted rows)
//! - Structured logging with tracing through an injected handle

use crate::error::HeatError;
use crate::models::{Dimension, HeatZone};
use crate::summary::DetailedNodeTemperatureSummary;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use tracing::{debug, error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Heat engine metrics, registered into a caller-owned registry
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct HeatMetrics {
    evaluation_latency_seconds: HistogramVec,
    evaluations: IntCounterVec,
    shards_in_zone: IntGaugeVec,
    shards_tracked: IntGauge,
    rows_persisted: IntCounter,
}

impl HeatMetrics {
    /// Create the metrics and register them with `registry`
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let evaluation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "heat_evaluation_latency_seconds",
                "Time spent computing the temperature of one dimension",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["dimension"],
        )?;
        let evaluations = IntCounterVec::new(
            Opts::new(
                "heat_evaluations_total",
                "Temperature evaluations by dimension and outcome",
            ),
            &["dimension", "outcome"],
        )?;
        let shards_in_zone = IntGaugeVec::new(
            Opts::new(
                "heat_shards_in_zone",
                "Shards per heat zone in the latest evaluation",
            ),
            &["dimension", "zone"],
        )?;
        let shards_tracked = IntGauge::new(
            "heat_shards_tracked",
            "Number of shard profiles held by the shard store",
        )?;
        let rows_persisted = IntCounter::new(
            "heat_rows_persisted_total",
            "Summary rows written to the table store",
        )?;

        registry.register(Box::new(evaluation_latency_seconds.clone()))?;
        registry.register(Box::new(evaluations.clone()))?;
        registry.register(Box::new(shards_in_zone.clone()))?;
        registry.register(Box::new(shards_tracked.clone()))?;
        registry.register(Box::new(rows_persisted.clone()))?;

        Ok(Self {
            evaluation_latency_seconds,
            evaluations,
            shards_in_zone,
            shards_tracked,
            rows_persisted,
        })
    }

    /// Record a latency observation for one dimension
    pub fn observe_evaluation_latency(&self, dimension: Dimension, duration_secs: f64) {
        self.evaluation_latency_seconds
            .with_label_values(&[dimension.as_str()])
            .observe(duration_secs);
    }

    /// Count a successful evaluation and publish its zone populations
    pub fn record_success(&self, summary: &DetailedNodeTemperatureSummary) {
        let dimension = summary.dimension().as_str();
        self.evaluations
            .with_label_values(&[dimension, "success"])
            .inc();
        for zone in HeatZone::ALL {
            self.shards_in_zone
                .with_label_values(&[dimension, zone.as_str()])
                .set(summary.shards_in_zone(zone).len() as i64);
        }
    }

    /// Count a failed evaluation, labelled by error kind
    pub fn record_failure(&self, dimension: Dimension, err: &HeatError) {
        self.evaluations
            .with_label_values(&[dimension.as_str(), err.kind()])
            .inc();
    }

    /// Count an evaluation whose datasets could not be fetched
    pub fn record_fetch_failure(&self, dimension: Dimension) {
        self.evaluations
            .with_label_values(&[dimension.as_str(), "fetch_failed"])
            .inc();
    }

    pub fn set_shards_tracked(&self, count: usize) {
        self.shards_tracked.set(count as i64);
    }

    pub fn add_rows_persisted(&self, rows: usize) {
        self.rows_persisted.inc_by(rows as u64);
    }

    pub fn evaluations(&self, dimension: Dimension, outcome: &str) -> u64 {
        self.evaluations
            .with_label_values(&[dimension.as_str(), outcome])
            .get()
    }
}

/// Structured logger for heat engine events
///
/// Handed to the calculator and the evaluation loop so every event carries
/// the node it was computed on.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Log a computed node temperature
    pub fn log_node_temperature(
        &self,
        summary: &DetailedNodeTemperatureSummary,
        shard_independent_usage: f64,
    ) {
        debug!(
            event = "node_temperature",
            node = %self.node_name,
            dimension = %summary.dimension(),
            mean_usage = summary.mean_usage().value(),
            total_usage = summary.total_usage(),
            shard_independent_usage = shard_independent_usage,
            num_shards = summary.num_shards(),
            hot = summary.shards_in_zone(HeatZone::Hot).len(),
            lukewarm = summary.shards_in_zone(HeatZone::Lukewarm).len(),
            cold = summary.shards_in_zone(HeatZone::Cold).len(),
            "Computed node temperature"
        );
    }

    /// Log a failed heat calculation
    pub fn log_heat_failure(&self, dimension: Dimension, err: &HeatError) {
        match err {
            HeatError::ValueFormat {
                dataset,
                column,
                raw,
                expected,
            } => {
                error!(
                    event = "heat_value_format_error",
                    node = %self.node_name,
                    dimension = %dimension,
                    dataset = %dataset,
                    column = %column,
                    raw = %raw,
                    expected = %expected,
                    "Error parsing value from dataset"
                );
            }
            other => {
                warn!(
                    event = "heat_calculation_failed",
                    node = %self.node_name,
                    dimension = %dimension,
                    kind = other.kind(),
                    error = %other,
                    "Heat calculation failed"
                );
            }
        }
    }

    /// Log a dataset source failure
    pub fn log_fetch_failure(&self, dimension: Dimension, err: &anyhow::Error) {
        warn!(
            event = "heat_fetch_failed",
            node = %self.node_name,
            dimension = %dimension,
            error = %err,
            "Failed to fetch datasets"
        );
    }

    /// Log the end of an evaluation epoch
    pub fn log_epoch(&self, epoch: u64, succeeded: usize, failed: usize, shards_tracked: usize) {
        info!(
            event = "heat_epoch_complete",
            node = %self.node_name,
            epoch = epoch,
            succeeded = succeeded,
            failed = failed,
            shards_tracked = shards_tracked,
            "Evaluation epoch complete"
        );
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, dimensions: &[Dimension]) {
        let dimensions: Vec<&str> = dimensions.iter().map(|d| d.as_str()).collect();
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            dimensions = ?dimensions,
            "Heat agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Heat agent shutting down"
        );
    }
}
