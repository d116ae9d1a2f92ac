//! Resource heat computation
//!
//! Turns per-shard, node-average and node-total usage of one resource
//! dimension into normalized temperatures and heat zones:
//! - `normalize` maps raw usage to a [0, 10] score relative to the node total
//! - `HeatZoneAssigner` classifies a shard against the node average
//! - `ShardStore` keeps the per-shard temperature vectors across dimensions
//! - `ResourceHeatCalculator` validates the inputs and ties it all together

mod calculator;
mod normalize;
mod shard_store;
mod zone;


pub use calculator::{
    DetailedNodeTemperatureFlowUnit, DimensionSnapshot, HeatInputs, PendingHeat, ResourceHeatCalculator,
    AVG_COLUMN, INDEX_NAME_COLUMN, SHARD_ID_COLUMN, SUM_COLUMN,
};
pub use normalize::normalize;
pub use shard_store::{ShardProfile, ShardStore};
pub use zone::{HeatZoneAssigner, DEFAULT_THRESHOLD};
