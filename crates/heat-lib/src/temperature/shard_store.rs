//! Per-shard profiles of the local node

use crate::models::{Dimension, NormalizedValue, ShardKey, TemperatureVector};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Temperature of one shard across all dimensions seen so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardProfile {
    key: ShardKey,
    temperature: TemperatureVector,
}

impl ShardProfile {
    pub fn new(key: ShardKey) -> Self {
        Self {
            key,
            temperature: TemperatureVector::new(),
        }
    }

    pub fn key(&self) -> &ShardKey {
        &self.key
    }

    pub fn index_name(&self) -> &str {
        &self.key.index_name
    }

    pub fn shard_id(&self) -> i32 {
        self.key.shard_id
    }

    pub fn temperature(&self) -> &TemperatureVector {
        &self.temperature
    }

    pub fn temperature_for(&self, dimension: Dimension) -> Option<NormalizedValue> {
        self.temperature.get(dimension)
    }

    /// Replaces the value from any earlier epoch; values are never summed
    pub fn add_temperature_for_dimension(&mut self, dimension: Dimension, value: NormalizedValue) {
        self.temperature.set(dimension, value);
    }
}

/// Keyed store of shard profiles
///
/// Profiles are created on first observation and live as long as the store.
/// The store has no internal locking; callers serialize mutation.
#[derive(Debug, Default)]
pub struct ShardStore {
    profiles: BTreeMap<ShardKey, ShardProfile>,
}

impl ShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing profile for the shard, or a fresh one with no temperatures
    pub fn get_or_create(&mut self, index_name: &str, shard_id: i32) -> &mut ShardProfile {
        let key = ShardKey::new(index_name, shard_id);
        self.profiles.entry(key).or_insert_with_key(|key| {
            debug!(index = %key.index_name, shard_id = key.shard_id, "Tracking new shard");
            ShardProfile::new(key.clone())
        })
    }

    pub fn get(&self, index_name: &str, shard_id: i32) -> Option<&ShardProfile> {
        self.profiles.get(&ShardKey::new(index_name, shard_id))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles in key order
    pub fn iter(&self) -> impl Iterator<Item = &ShardProfile> + '_ {
        self.profiles.values()
    }

    /// Owned copy of every profile, for readers outside the mutation lock
    pub fn profiles(&self) -> Vec<ShardProfile> {
        self.profiles.values().cloned().collect()
    }
}
