//! Heat zone assignment

use crate::models::{HeatZone, NormalizedValue};

/// Default distance from the node average before a shard leaves lukewarm
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Classifies a shard's usage relative to its node's average
///
/// Shards within `threshold` of the average (inclusive) are lukewarm; beyond
/// it they are hot above the average and cold below. Warm is never produced
/// here: a single threshold has no graduated tier to put it in.
pub struct HeatZoneAssigner;

impl HeatZoneAssigner {
    pub fn assign(
        shard: NormalizedValue,
        node_average: NormalizedValue,
        threshold: NormalizedValue,
    ) -> HeatZone {
        let diff = shard.diff(node_average);
        let threshold = threshold.value();
        if diff > threshold {
            HeatZone::Hot
        } else if diff < -threshold {
            HeatZone::Cold
        } else {
            HeatZone::Lukewarm
        }
    }
}
