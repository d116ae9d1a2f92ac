//! Shard heat engine
//!
//! This crate provides the core functionality for:
//! - Normalizing per-shard resource usage into temperatures
//! - Classifying shards into heat zones against the node average
//! - Summaries with wire, JSON and tabular forms
//! - Periodic evaluation with health checks and observability

pub mod dataset;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod persist;
pub mod proto;
pub mod pyrometer;
pub mod source;
pub mod summary;
pub mod temperature;

pub use error::{HeatError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{HeatMetrics, StructuredLogger};
pub use pyrometer::{EvaluationConfig, EvaluationOutcome, NodeTemperatureState, Pyrometer};
