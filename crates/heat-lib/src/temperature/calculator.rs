//! Resource heat calculation for one dimension of one node
//!
//! The four inputs come from independently scheduled collectors, so their
//! shapes are checked before anything is read: drift in any of them means an
//! upstream bug and must fail the invocation instead of skewing the signal.

use super::{normalize, HeatZoneAssigner, ShardStore};
use crate::dataset::{expect_single_dataset, DatasetShape, MetricDataset};
use crate::error::{HeatError, Result};
use crate::models::{Dimension, HeatZone, NormalizedValue, ShardKey};
use crate::observability::StructuredLogger;
use crate::proto::{summary_message, FlowUnitMessage};
use crate::summary::{DetailedNodeTemperatureSummary, GenericSummary};
use serde::{Deserialize, Serialize};

pub const INDEX_NAME_COLUMN: &str = "IndexName";
pub const SHARD_ID_COLUMN: &str = "ShardID";
pub const SUM_COLUMN: &str = "sum";
pub const AVG_COLUMN: &str = "avg";

/// IndexName, ShardID, sum; one row per shard seen in the interval
const BY_SHARD_SHAPE: DatasetShape = DatasetShape::table(3);

/// Borrowed view of the four collector outputs for one dimension
#[derive(Debug, Clone, Copy)]
pub struct HeatInputs<'a> {
    /// Usage summed per (index, shard)
    pub by_shard: &'a [MetricDataset],
    /// Average usage per shard across the node
    pub avg_across_shards: &'a [MetricDataset],
    /// Usage that cannot be attributed to a shard (e.g. the HTTP server)
    pub shard_independent: &'a [MetricDataset],
    /// Total usage of the node; shard usage plus shard independent usage
    pub node_total: &'a [MetricDataset],
}

/// Owned collector outputs, as loaded from a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionSnapshot {
    #[serde(default)]
    pub by_shard: Vec<MetricDataset>,
    #[serde(default)]
    pub avg_across_shards: Vec<MetricDataset>,
    #[serde(default)]
    pub shard_independent: Vec<MetricDataset>,
    #[serde(default)]
    pub node_total: Vec<MetricDataset>,
}

impl DimensionSnapshot {
    pub fn as_inputs(&self) -> HeatInputs<'_> {
        HeatInputs {
            by_shard: &self.by_shard,
            avg_across_shards: &self.avg_across_shards,
            shard_independent: &self.shard_independent,
            node_total: &self.node_total,
        }
    }
}

/// Timestamped node temperature of one dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedNodeTemperatureFlowUnit {
    timestamp_millis: i64,
    summary: DetailedNodeTemperatureSummary,
}

impl DetailedNodeTemperatureFlowUnit {
    pub fn new(timestamp_millis: i64, summary: DetailedNodeTemperatureSummary) -> Self {
        Self {
            timestamp_millis,
            summary,
        }
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn summary(&self) -> &DetailedNodeTemperatureSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DetailedNodeTemperatureSummary {
        self.summary
    }

    pub fn to_message(&self, graph_node: &str, node_id: &str) -> FlowUnitMessage {
        FlowUnitMessage {
            graph_node: graph_node.to_string(),
            node_id: node_id.to_string(),
            timestamp: Some(prost_types::Timestamp {
                seconds: self.timestamp_millis.div_euclid(1000),
                nanos: (self.timestamp_millis.rem_euclid(1000) * 1_000_000) as i32,
            }),
            summary: Some(self.summary.to_message()),
        }
    }

    pub fn from_message(message: &FlowUnitMessage) -> Result<Self> {
        let summary_message = message.summary.as_ref().ok_or(HeatError::EmptySummary)?;
        let summary = match &summary_message.summary {
            Some(summary_message::Summary::NodeTemperature(node)) => {
                DetailedNodeTemperatureSummary::from_message(
                    node,
                    &summary_message.nested_summaries,
                )?
            }
            _ => return Err(HeatError::EmptySummary),
        };
        let timestamp_millis = message
            .timestamp
            .as_ref()
            .map(|ts| ts.seconds * 1000 + i64::from(ts.nanos) / 1_000_000)
            .unwrap_or_default();
        Ok(Self::new(timestamp_millis, summary))
    }
}

/// A shard row that passed parsing and normalization
struct ShardReading<'a> {
    index_name: &'a str,
    shard_id: i32,
    temperature: NormalizedValue,
    zone: HeatZone,
}

/// A computed node temperature whose shard temperatures are not yet in the store
#[derive(Debug, Clone)]
pub struct PendingHeat {
    dimension: Dimension,
    temperatures: Vec<(ShardKey, NormalizedValue)>,
    flow_unit: DetailedNodeTemperatureFlowUnit,
}

impl PendingHeat {
    pub fn flow_unit(&self) -> &DetailedNodeTemperatureFlowUnit {
        &self.flow_unit
    }

    /// Record every shard temperature in `store`, in row order
    pub fn commit(self, store: &mut ShardStore) -> DetailedNodeTemperatureFlowUnit {
        for (key, temperature) in self.temperatures {
            store
                .get_or_create(&key.index_name, key.shard_id)
                .add_temperature_for_dimension(self.dimension, temperature);
        }
        self.flow_unit
    }
}

/// Computes node temperature for one dimension and updates the shard store
pub struct ResourceHeatCalculator {
    threshold: NormalizedValue,
    logger: StructuredLogger,
}

impl ResourceHeatCalculator {
    pub fn new(logger: StructuredLogger, threshold: NormalizedValue) -> Self {
        Self { threshold, logger }
    }

    pub fn threshold(&self) -> NormalizedValue {
        self.threshold
    }

    /// Classify every shard of `inputs` and record its temperature
    ///
    /// On error nothing is written to `store` and no summary is produced.
    pub fn get_resource_heat(
        &self,
        store: &mut ShardStore,
        dimension: Dimension,
        inputs: &HeatInputs<'_>,
    ) -> Result<DetailedNodeTemperatureFlowUnit> {
        Ok(self.evaluate(dimension, inputs)?.commit(store))
    }

    /// Classify every shard of `inputs` without touching any store
    pub fn evaluate(&self, dimension: Dimension, inputs: &HeatInputs<'_>) -> Result<PendingHeat> {
        let result = self.calculate(dimension, inputs);
        if let Err(e) = &result {
            self.logger.log_heat_failure(dimension, e);
        }
        result
    }

    fn calculate(&self, dimension: Dimension, inputs: &HeatInputs<'_>) -> Result<PendingHeat> {
        let by_shard = expect_single_dataset("by_shard", inputs.by_shard, &BY_SHARD_SHAPE)?;
        let avg = expect_single_dataset(
            "avg_across_shards",
            inputs.avg_across_shards,
            &DatasetShape::SCALAR,
        )?;
        let shard_independent = expect_single_dataset(
            "shard_independent",
            inputs.shard_independent,
            &DatasetShape::SCALAR,
        )?;
        let node_total =
            expect_single_dataset("node_total", inputs.node_total, &DatasetShape::SCALAR)?;

        let avg_over_shards = scalar(avg, AVG_COLUMN)?;
        let total_consumed = scalar(node_total, SUM_COLUMN)?;
        let independent_usage = scalar(shard_independent, SUM_COLUMN)?;
        let avg_usage_across_shards = normalize(avg_over_shards, total_consumed)?;

        let mut readings = Vec::with_capacity(by_shard.num_rows());
        for row in by_shard.rows() {
            let temperature = normalize(row.get_f64(SUM_COLUMN)?, total_consumed)?;
            readings.push(ShardReading {
                index_name: row.get_str(INDEX_NAME_COLUMN)?,
                shard_id: row.get_i32(SHARD_ID_COLUMN)?,
                temperature,
                zone: HeatZoneAssigner::assign(
                    temperature,
                    avg_usage_across_shards,
                    self.threshold,
                ),
            });
        }

        let mut summary =
            DetailedNodeTemperatureSummary::new(dimension, avg_usage_across_shards, total_consumed);
        summary.set_num_shards(by_shard.num_rows());

        let mut temperatures = Vec::with_capacity(readings.len());
        for reading in readings {
            let key = ShardKey::new(reading.index_name, reading.shard_id);
            summary.add_shard(key.clone(), reading.temperature, reading.zone);
            temperatures.push((key, reading.temperature));
        }

        self.logger.log_node_temperature(&summary, independent_usage);

        Ok(PendingHeat {
            dimension,
            temperatures,
            flow_unit: DetailedNodeTemperatureFlowUnit::new(
                chrono::Utc::now().timestamp_millis(),
                summary,
            ),
        })
    }
}

/// The only cell of a one-row, one-column dataset
fn scalar(dataset: &MetricDataset, column: &str) -> Result<f64> {
    dataset
        .rows()
        .next()
        .ok_or_else(|| HeatError::structural(&dataset.name, "expected exactly one row"))?
        .get_f64(column)
}
