//! Periodic temperature evaluation
//!
//! Every epoch the pyrometer fetches the collector output of each configured
//! dimension, runs the heat calculator against the shared shard store and
//! persists the resulting summaries. Dimensions fail independently; a failed
//! dimension keeps its previous summary and is not retried until the next
//! epoch.

use crate::error::HeatError;
use crate::health::{component_for, HealthRegistry};
use crate::models::{Dimension, NormalizedValue};
use crate::observability::{HeatMetrics, StructuredLogger};
use crate::persist::{Table, TableStore, DEFAULT_MAX_ROWS_PER_TABLE};
use crate::proto::FlowUnitMessage;
use crate::source::DatasetSource;
use crate::summary::GenericSummary;
use crate::temperature::{
    DetailedNodeTemperatureFlowUnit, ResourceHeatCalculator, ShardProfile, ShardStore,
    DEFAULT_THRESHOLD,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, info};

/// Default time between two evaluation epochs
pub const DEFAULT_EVALUATION_INTERVAL: Duration = Duration::from_secs(60);

/// Shards persisted as top consumers per evaluated dimension
pub const DEFAULT_TOP_CONSUMERS: usize = 5;

/// Configuration for the evaluation loop
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Interval between epochs (default: 60 seconds)
    pub interval: Duration,
    /// Dimensions evaluated every epoch, in order
    pub dimensions: Vec<Dimension>,
    /// Zone threshold handed to the calculator
    pub threshold: f64,
    /// Number of hottest shards persisted as top consumers
    pub top_consumers: usize,
    /// Graph node stamped on outgoing flow units
    pub graph_node: String,
    /// Node id stamped on outgoing flow units
    pub node_id: String,
    /// Rows kept per summary table; older rows are dropped after each write
    pub max_rows_per_table: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_EVALUATION_INTERVAL,
            dimensions: Dimension::ALL.to_vec(),
            threshold: DEFAULT_THRESHOLD,
            top_consumers: DEFAULT_TOP_CONSUMERS,
            graph_node: "NodeTemperatureRca".to_string(),
            node_id: "local".to_string(),
            max_rows_per_table: DEFAULT_MAX_ROWS_PER_TABLE,
        }
    }
}

#[derive(Debug, Default)]
struct StateInner {
    shards: ShardStore,
    latest: BTreeMap<Dimension, DetailedNodeTemperatureFlowUnit>,
    tables: TableStore,
}

/// Node temperature state shared by the evaluation loop and its readers
///
/// All mutation happens under one lock, so a calculator invocation never
/// interleaves with another one or with a reader.
#[derive(Debug, Default)]
pub struct NodeTemperatureState {
    inner: Mutex<StateInner>,
}

impl NodeTemperatureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest flow unit of `dimension`, if it was ever computed
    pub async fn latest(&self, dimension: Dimension) -> Option<DetailedNodeTemperatureFlowUnit> {
        self.inner.lock().await.latest.get(&dimension).cloned()
    }

    /// Latest flow unit of every computed dimension
    pub async fn latest_all(&self) -> Vec<DetailedNodeTemperatureFlowUnit> {
        self.inner.lock().await.latest.values().cloned().collect()
    }

    pub async fn shard_profiles(&self) -> Vec<ShardProfile> {
        self.inner.lock().await.shards.profiles()
    }

    pub async fn shards_tracked(&self) -> usize {
        self.inner.lock().await.shards.len()
    }

    pub async fn table(&self, name: &str) -> Option<Table> {
        self.inner.lock().await.tables.table(name).cloned()
    }

    pub async fn table_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .tables
            .table_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// What happened to one dimension during an epoch
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Summary computed and persisted
    Computed { num_shards: usize, rows_persisted: usize },
    /// The collector output could not be fetched
    FetchFailed(String),
    /// The calculator or the table store rejected the input
    Rejected(HeatError),
}

impl EvaluationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationOutcome::Computed { .. })
    }
}

/// Evaluation loop driving the heat calculator
pub struct Pyrometer {
    source: Arc<dyn DatasetSource>,
    state: Arc<NodeTemperatureState>,
    calculator: ResourceHeatCalculator,
    config: EvaluationConfig,
    metrics: HeatMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
    epoch: AtomicU64,
}

impl Pyrometer {
    /// Create a pyrometer; fails if the configured threshold is not a valid normalized value
    pub fn new(
        source: Arc<dyn DatasetSource>,
        state: Arc<NodeTemperatureState>,
        config: EvaluationConfig,
        metrics: HeatMetrics,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> crate::error::Result<Self> {
        let threshold = NormalizedValue::new(config.threshold)?;
        Ok(Self {
            source,
            state,
            calculator: ResourceHeatCalculator::new(logger.clone(), threshold),
            config,
            metrics,
            health,
            logger,
            epoch: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> &Arc<NodeTemperatureState> {
        &self.state
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Register one health component per configured dimension
    pub async fn register_components(&self) {
        for dimension in &self.config.dimensions {
            self.health.register(&component_for(*dimension)).await;
        }
    }

    /// Run one epoch over every configured dimension
    pub async fn evaluate_once(&self) -> Vec<(Dimension, EvaluationOutcome)> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let mut outcomes = Vec::with_capacity(self.config.dimensions.len());

        for dimension in &self.config.dimensions {
            let outcome = self.evaluate_dimension(*dimension).await;
            let component = component_for(*dimension);
            match &outcome {
                EvaluationOutcome::Computed { .. } => self.health.record_success(&component).await,
                EvaluationOutcome::FetchFailed(reason) => {
                    self.health.record_failure(&component, reason.clone()).await;
                }
                EvaluationOutcome::Rejected(err) => {
                    self.health.record_failure(&component, err.to_string()).await;
                }
            }
            outcomes.push((*dimension, outcome));
        }

        let shards_tracked = self.state.shards_tracked().await;
        self.metrics.set_shards_tracked(shards_tracked);

        let succeeded = outcomes.iter().filter(|(_, o)| o.is_success()).count();
        self.logger
            .log_epoch(epoch, succeeded, outcomes.len() - succeeded, shards_tracked);
        outcomes
    }

    async fn evaluate_dimension(&self, dimension: Dimension) -> EvaluationOutcome {
        let snapshot = match self.source.fetch(dimension).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.logger.log_fetch_failure(dimension, &e);
                self.metrics.record_fetch_failure(dimension);
                return EvaluationOutcome::FetchFailed(format!("{:#}", e));
            }
        };

        let start = Instant::now();
        let result = self.calculator.evaluate(dimension, &snapshot.as_inputs());
        self.metrics
            .observe_evaluation_latency(dimension, start.elapsed().as_secs_f64());

        let pending = match result {
            Ok(pending) => pending,
            Err(e) => {
                self.metrics.record_failure(dimension, &e);
                return EvaluationOutcome::Rejected(e);
            }
        };

        let summary = pending.flow_unit().summary();
        let consumers = summary.top_consumers(self.config.top_consumers);
        let mut trees: Vec<&dyn GenericSummary> = vec![summary];
        trees.extend(consumers.iter().map(|c| c as &dyn GenericSummary));

        // Stage rows before touching the shard store; a rejected tree changes nothing.
        let mut inner = self.state.inner.lock().await;
        let staged = match inner.tables.stage(&trees) {
            Ok(staged) => staged,
            Err(e) => {
                self.logger.log_heat_failure(dimension, &e);
                self.metrics.record_failure(dimension, &e);
                return EvaluationOutcome::Rejected(e);
            }
        };

        let flow_unit = pending.commit(&mut inner.shards);
        let rows_persisted = inner.tables.commit(staged);
        let rows_dropped = inner.tables.retain_newest(self.config.max_rows_per_table);

        let summary = flow_unit.summary();
        self.metrics.record_success(summary);
        self.metrics.add_rows_persisted(rows_persisted);
        debug!(
            dimension = %dimension,
            summary = %summary,
            rows = rows_persisted,
            rows_dropped,
            "Persisted node temperature"
        );

        let num_shards = summary.num_shards();
        inner.latest.insert(dimension, flow_unit);
        EvaluationOutcome::Computed {
            num_shards,
            rows_persisted,
        }
    }

    /// Wire form of the latest flow units, stamped with this node's identity
    pub async fn latest_messages(&self) -> Vec<FlowUnitMessage> {
        self.state
            .latest_all()
            .await
            .iter()
            .map(|unit| unit.to_message(&self.config.graph_node, &self.config.node_id))
            .collect()
    }

    /// Evaluate every interval until `shutdown` fires
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            dimensions = self.config.dimensions.len(),
            "Starting temperature evaluation loop"
        );
        self.register_components().await;

        let mut ticker = interval(self.config.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evaluate_once().await;
                    self.health.set_ready(true).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down temperature evaluation loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MetricDataset;
    use crate::health::ComponentStatus;
    use crate::models::HeatZone;
    use crate::proto::summary_message;
    use crate::source::StaticSource;
    use crate::summary::{
        Column, ColumnType, DetailedNodeTemperatureSummary, ShardProfileSummary, TopConsumerSummary,
    };
    use crate::temperature::DimensionSnapshot;
    use approx::assert_relative_eq;
    use prometheus::Registry;

    fn scalar(name: &str, column: &str, value: f64) -> Vec<MetricDataset> {
        vec![MetricDataset::new(name, [column])
            .with_rows([vec![value.into()]])
            .unwrap()]
    }

    fn snapshot(shards: &[(&str, i32, f64)], avg: f64, total: f64) -> DimensionSnapshot {
        let by_shard = MetricDataset::new("by_shard", ["IndexName", "ShardID", "sum"])
            .with_rows(
                shards
                    .iter()
                    .map(|(idx, id, sum)| vec![(*idx).into(), (*id).into(), (*sum).into()]),
            )
            .unwrap();
        DimensionSnapshot {
            by_shard: vec![by_shard],
            avg_across_shards: scalar("avg", "avg", avg),
            shard_independent: scalar("independent", "sum", 0.0),
            node_total: scalar("total", "sum", total),
        }
    }

    struct Fixture {
        source: Arc<StaticSource>,
        pyrometer: Pyrometer,
        metrics: HeatMetrics,
        health: HealthRegistry,
    }

    fn fixture(dimensions: Vec<Dimension>) -> Fixture {
        fixture_with(EvaluationConfig {
            dimensions,
            top_consumers: 2,
            ..Default::default()
        })
    }

    fn fixture_with(config: EvaluationConfig) -> Fixture {
        let source = Arc::new(StaticSource::new());
        let registry = Registry::new();
        let metrics = HeatMetrics::new(&registry).unwrap();
        let health = HealthRegistry::with_unhealthy_after(2);
        let pyrometer = Pyrometer::new(
            source.clone(),
            Arc::new(NodeTemperatureState::new()),
            config,
            metrics.clone(),
            health.clone(),
            StructuredLogger::new("test-node"),
        )
        .unwrap();
        Fixture {
            source,
            pyrometer,
            metrics,
            health,
        }
    }

    #[tokio::test]
    async fn test_evaluate_once_persists_summary_and_top_consumers() {
        let f = fixture(vec![Dimension::Cpu]);
        f.source.set(
            Dimension::Cpu,
            snapshot(&[("logs", 0, 30.0), ("logs", 1, 10.0), ("metrics", 0, 5.0)], 15.0, 45.0),
        );

        let outcomes = f.pyrometer.evaluate_once().await;
        assert_eq!(
            outcomes,
            vec![(
                Dimension::Cpu,
                EvaluationOutcome::Computed {
                    num_shards: 3,
                    rows_persisted: 6
                }
            )]
        );

        let state = f.pyrometer.state();
        assert_eq!(state.shards_tracked().await, 3);
        let latest = state.latest(Dimension::Cpu).await.unwrap();
        assert_eq!(latest.summary().shards_in_zone(HeatZone::Hot).len(), 1);

        let consumers = state.table(TopConsumerSummary::TABLE_NAME).await.unwrap();
        assert_eq!(consumers.rows.len(), 2);
        assert_eq!(
            state.table_names().await,
            vec![
                DetailedNodeTemperatureSummary::TABLE_NAME.to_string(),
                ShardProfileSummary::TABLE_NAME.to_string(),
                TopConsumerSummary::TABLE_NAME.to_string(),
            ]
        );
        assert_eq!(f.metrics.evaluations(Dimension::Cpu, "success"), 1);
    }

    #[tokio::test]
    async fn test_failing_dimension_does_not_stop_others() {
        let f = fixture(vec![Dimension::Cpu, Dimension::HeapAllocRate]);
        f.source.set(
            Dimension::HeapAllocRate,
            snapshot(&[("logs", 0, 4.0)], 4.0, 8.0),
        );

        let outcomes = f.pyrometer.evaluate_once().await;
        assert!(matches!(outcomes[0].1, EvaluationOutcome::FetchFailed(_)));
        assert!(outcomes[1].1.is_success());

        let health = f.health.health().await;
        assert_eq!(
            health.components[&component_for(Dimension::Cpu)].status,
            ComponentStatus::Degraded
        );
        assert_eq!(
            health.components[&component_for(Dimension::HeapAllocRate)].status,
            ComponentStatus::Healthy
        );
        assert_eq!(f.metrics.evaluations(Dimension::Cpu, "fetch_failed"), 1);
    }

    #[tokio::test]
    async fn test_rejected_input_keeps_previous_summary() {
        let f = fixture(vec![Dimension::Cpu]);
        f.source
            .set(Dimension::Cpu, snapshot(&[("logs", 0, 2.0)], 2.0, 4.0));
        f.pyrometer.evaluate_once().await;

        let mut bad = snapshot(&[("logs", 0, 2.0)], 2.0, 4.0);
        bad.node_total.clear();
        f.source.set(Dimension::Cpu, bad);

        for _ in 0..2 {
            let outcomes = f.pyrometer.evaluate_once().await;
            assert!(matches!(
                outcomes[0].1,
                EvaluationOutcome::Rejected(HeatError::StructuralValidation { .. })
            ));
        }

        let latest = f.pyrometer.state().latest(Dimension::Cpu).await.unwrap();
        assert_relative_eq!(latest.summary().total_usage(), 4.0);
        assert_eq!(
            f.health.health().await.status,
            ComponentStatus::Unhealthy
        );
        assert_eq!(
            f.metrics
                .evaluations(Dimension::Cpu, "structural_validation"),
            2
        );
    }

    #[tokio::test]
    async fn test_latest_messages_carry_node_identity() {
        let f = fixture(vec![Dimension::Cpu]);
        f.source
            .set(Dimension::Cpu, snapshot(&[("logs", 0, 2.0)], 2.0, 4.0));
        f.pyrometer.evaluate_once().await;

        let messages = f.pyrometer.latest_messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].graph_node, "NodeTemperatureRca");
        assert_eq!(messages[0].node_id, "local");
        let summary = messages[0].summary.as_ref().unwrap();
        assert!(matches!(
            summary.summary,
            Some(summary_message::Summary::NodeTemperature(_))
        ));
        assert_eq!(summary.nested_summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_threshold_is_rejected() {
        let config = EvaluationConfig {
            threshold: 11.0,
            ..Default::default()
        };
        let result = Pyrometer::new(
            Arc::new(StaticSource::new()),
            Arc::new(NodeTemperatureState::new()),
            config,
            HeatMetrics::new(&Registry::new()).unwrap(),
            HealthRegistry::new(),
            StructuredLogger::new("test-node"),
        );
        assert!(matches!(result, Err(HeatError::OutOfRange(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(vec![Dimension::Cpu]);
        f.source
            .set(Dimension::Cpu, snapshot(&[("logs", 0, 2.0)], 2.0, 4.0));
        let pyrometer = Arc::new(f.pyrometer);
        let (tx, rx) = tokio::sync::broadcast::channel(1);

        let handle = tokio::spawn(pyrometer.clone().run(rx));
        // The first tick fires immediately.
        for _ in 0..50 {
            if pyrometer.state().latest(Dimension::Cpu).await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(pyrometer.state().latest(Dimension::Cpu).await.is_some());
        assert!(f.health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_table_rows_are_capped() {
        let f = fixture_with(EvaluationConfig {
            dimensions: vec![Dimension::Cpu],
            top_consumers: 2,
            max_rows_per_table: 4,
            ..Default::default()
        });
        f.source.set(
            Dimension::Cpu,
            snapshot(&[("logs", 0, 30.0), ("logs", 1, 10.0), ("metrics", 0, 5.0)], 15.0, 45.0),
        );

        for _ in 0..5 {
            assert!(f.pyrometer.evaluate_once().await[0].1.is_success());
        }

        let state = f.pyrometer.state();
        let shards = state.table(ShardProfileSummary::TABLE_NAME).await.unwrap();
        assert_eq!(shards.rows.len(), 4);
        let consumers = state.table(TopConsumerSummary::TABLE_NAME).await.unwrap();
        assert_eq!(consumers.rows.len(), 4);
        let nodes = state
            .table(DetailedNodeTemperatureSummary::TABLE_NAME)
            .await
            .unwrap();
        assert_eq!(nodes.rows.len(), 4);
    }

    #[tokio::test]
    async fn test_rejected_rows_leave_shard_store_untouched() {
        let f = fixture(vec![Dimension::Cpu]);
        f.pyrometer.state().inner.lock().await.tables.insert_table(
            TopConsumerSummary::TABLE_NAME,
            Table::new(vec![Column::new("Other", ColumnType::Text)]),
        );
        f.source
            .set(Dimension::Cpu, snapshot(&[("logs", 0, 2.0)], 2.0, 4.0));

        let outcomes = f.pyrometer.evaluate_once().await;
        assert!(matches!(
            outcomes[0].1,
            EvaluationOutcome::Rejected(HeatError::SchemaMismatch { .. })
        ));

        let state = f.pyrometer.state();
        assert_eq!(state.shards_tracked().await, 0);
        assert!(state.latest(Dimension::Cpu).await.is_none());
        assert!(state
            .table(DetailedNodeTemperatureSummary::TABLE_NAME)
            .await
            .is_none());
    }
}
