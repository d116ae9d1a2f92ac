//! Node-level temperature of one dimension with its shards grouped by zone

use super::{Column, ColumnType, GenericSummary, SqlValue, Summary, TopConsumerSummary};
use crate::error::{HeatError, Result};
use crate::models::{Dimension, HeatZone, NormalizedValue, ShardKey};
use crate::proto::{
    summary_message, NodeTemperatureSummaryMessage, ShardProfileSummaryMessage, SummaryMessage,
};
use crate::temperature::ShardProfile;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A shard's temperature for one dimension and the zone it landed in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardProfileSummary {
    pub key: ShardKey,
    pub zone: HeatZone,
    pub dimension: Dimension,
    pub temperature: NormalizedValue,
}

impl ShardProfileSummary {
    pub const TABLE_NAME: &'static str = "ShardProfileSummary";
    pub const SCHEMA: [Column; 5] = [
        Column::new("IndexName", ColumnType::Text),
        Column::new("ShardID", ColumnType::Integer),
        Column::new("Zone", ColumnType::Text),
        Column::new("Dimension", ColumnType::Text),
        Column::new("Temperature", ColumnType::Double),
    ];

    pub fn from_message(message: &ShardProfileSummaryMessage) -> Result<Self> {
        Ok(Self {
            key: ShardKey::new(message.index_name.clone(), message.shard_id),
            zone: HeatZone::from_wire_tag(message.zone)?,
            dimension: Dimension::from_wire_tag(message.dimension)?,
            temperature: NormalizedValue::new(message.temperature)?,
        })
    }
}

impl GenericSummary for ShardProfileSummary {
    fn build_summary_message(&self) -> SummaryMessage {
        SummaryMessage {
            summary: Some(summary_message::Summary::ShardProfile(
                ShardProfileSummaryMessage {
                    index_name: self.key.index_name.clone(),
                    shard_id: self.key.shard_id,
                    zone: self.zone.wire_tag(),
                    dimension: self.dimension.wire_tag(),
                    temperature: self.temperature.value(),
                },
            )),
            nested_summaries: Vec::new(),
        }
    }

    fn table_name(&self) -> &'static str {
        Self::TABLE_NAME
    }

    fn sql_schema(&self) -> Vec<Column> {
        Self::SCHEMA.to_vec()
    }

    fn sql_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.key.index_name.clone()),
            SqlValue::Integer(self.key.shard_id as i64),
            SqlValue::Text(self.zone.to_string()),
            SqlValue::Text(self.dimension.to_string()),
            SqlValue::Double(self.temperature.value()),
        ]
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ShardProfileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}={}",
            self.key, self.zone, self.dimension, self.temperature
        )
    }
}

/// Per-node, per-dimension temperature
///
/// `mean_usage` is the normalized average usage across shards, `total_usage`
/// the absolute node consumption the normalization was based on. Shards are
/// kept per zone in the order they were added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedNodeTemperatureSummary {
    dimension: Dimension,
    mean_usage: NormalizedValue,
    total_usage: f64,
    num_shards: usize,
    zones: [Vec<ShardProfileSummary>; 4],
}

impl DetailedNodeTemperatureSummary {
    pub const TABLE_NAME: &'static str = "DetailedNodeTemperatureSummary";
    pub const SCHEMA: [Column; 8] = [
        Column::new("Dimension", ColumnType::Text),
        Column::new("MeanUsage", ColumnType::Double),
        Column::new("TotalUsage", ColumnType::Double),
        Column::new("NumShards", ColumnType::Integer),
        Column::new("HotShards", ColumnType::Integer),
        Column::new("WarmShards", ColumnType::Integer),
        Column::new("LukewarmShards", ColumnType::Integer),
        Column::new("ColdShards", ColumnType::Integer),
    ];

    pub fn new(dimension: Dimension, mean_usage: NormalizedValue, total_usage: f64) -> Self {
        Self {
            dimension,
            mean_usage,
            total_usage,
            num_shards: 0,
            zones: Default::default(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn mean_usage(&self) -> NormalizedValue {
        self.mean_usage
    }

    pub fn total_usage(&self) -> f64 {
        self.total_usage
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    pub fn set_num_shards(&mut self, num_shards: usize) {
        self.num_shards = num_shards;
    }

    /// Record the profile's current temperature for this dimension under `zone`
    pub fn add_shard_to_zone(&mut self, profile: &ShardProfile, zone: HeatZone) {
        let temperature = profile
            .temperature_for(self.dimension)
            .unwrap_or(NormalizedValue::ZERO);
        self.add_shard(profile.key().clone(), temperature, zone);
    }

    pub fn add_shard(&mut self, key: ShardKey, temperature: NormalizedValue, zone: HeatZone) {
        self.push(ShardProfileSummary {
            key,
            zone,
            dimension: self.dimension,
            temperature,
        });
    }

    fn push(&mut self, shard: ShardProfileSummary) {
        self.zones[zone_slot(shard.zone)].push(shard);
    }

    pub fn shards_in_zone(&self, zone: HeatZone) -> &[ShardProfileSummary] {
        &self.zones[zone_slot(zone)]
    }

    /// All shards, hottest zone first
    pub fn shards(&self) -> impl Iterator<Item = &ShardProfileSummary> + '_ {
        self.zones.iter().flatten()
    }

    /// The `n` hottest shards as consumer summaries, ties broken by shard key
    pub fn top_consumers(&self, n: usize) -> Vec<TopConsumerSummary> {
        let mut shards: Vec<&ShardProfileSummary> = self.shards().collect();
        shards.sort_by(|a, b| {
            b.temperature
                .partial_cmp(&a.temperature)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        shards
            .into_iter()
            .take(n)
            .map(|s| TopConsumerSummary::new(s.key.to_string(), s.temperature.value()))
            .collect()
    }

    /// Rebuild from the node message and the nested shard messages
    pub fn from_message(
        message: &NodeTemperatureSummaryMessage,
        nested: &[SummaryMessage],
    ) -> Result<Self> {
        let mut summary = Self::new(
            Dimension::from_wire_tag(message.dimension)?,
            NormalizedValue::new(message.mean_usage)?,
            message.total_usage,
        );
        summary.set_num_shards(message.num_shards.max(0) as usize);
        for child in nested {
            match Summary::from_message(child)? {
                Summary::ShardProfile(shard) => summary.push(shard),
                other => {
                    return Err(HeatError::SchemaMismatch {
                        table: Self::TABLE_NAME.to_string(),
                        reason: format!("unexpected nested summary: {}", other),
                    })
                }
            }
        }
        Ok(summary)
    }
}

fn zone_slot(zone: HeatZone) -> usize {
    match zone {
        HeatZone::Hot => 0,
        HeatZone::Warm => 1,
        HeatZone::Lukewarm => 2,
        HeatZone::Cold => 3,
    }
}

impl GenericSummary for DetailedNodeTemperatureSummary {
    fn build_summary_message(&self) -> SummaryMessage {
        SummaryMessage {
            summary: Some(summary_message::Summary::NodeTemperature(
                NodeTemperatureSummaryMessage {
                    dimension: self.dimension.wire_tag(),
                    mean_usage: self.mean_usage.value(),
                    total_usage: self.total_usage,
                    num_shards: i32::try_from(self.num_shards).unwrap_or(i32::MAX),
                },
            )),
            nested_summaries: Vec::new(),
        }
    }

    fn nested_summaries(&self) -> Vec<&dyn GenericSummary> {
        self.shards().map(|s| s as &dyn GenericSummary).collect()
    }

    fn table_name(&self) -> &'static str {
        Self::TABLE_NAME
    }

    fn sql_schema(&self) -> Vec<Column> {
        Self::SCHEMA.to_vec()
    }

    fn sql_values(&self) -> Vec<SqlValue> {
        let mut values = vec![
            SqlValue::Text(self.dimension.to_string()),
            SqlValue::Double(self.mean_usage.value()),
            SqlValue::Double(self.total_usage),
            SqlValue::Integer(i64::try_from(self.num_shards).unwrap_or(i64::MAX)),
        ];
        values.extend(
            HeatZone::ALL
                .iter()
                .map(|z| SqlValue::Integer(self.shards_in_zone(*z).len() as i64)),
        );
        values
    }

    fn to_json(&self) -> serde_json::Value {
        let zones: serde_json::Map<String, serde_json::Value> = HeatZone::ALL
            .iter()
            .map(|z| {
                let shards: Vec<serde_json::Value> =
                    self.shards_in_zone(*z).iter().map(|s| s.to_json()).collect();
                (z.to_string(), serde_json::Value::Array(shards))
            })
            .collect();
        serde_json::json!({
            "dimension": self.dimension,
            "mean_usage": self.mean_usage.value(),
            "total_usage": self.total_usage,
            "num_shards": self.num_shards,
            "zones": zones,
        })
    }
}

impl fmt::Display for DetailedNodeTemperatureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: mean={} total={} shards={}",
            self.dimension, self.mean_usage, self.total_usage, self.num_shards
        )?;
        for zone in HeatZone::ALL {
            write!(f, " {}={}", zone, self.shards_in_zone(zone).len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temperature::ShardStore;
    use prost::Message;

    fn nv(v: f64) -> NormalizedValue {
        NormalizedValue::new(v).unwrap()
    }

    fn sample() -> DetailedNodeTemperatureSummary {
        let mut store = ShardStore::new();
        let mut summary = DetailedNodeTemperatureSummary::new(Dimension::Cpu, nv(4.44), 45.0);
        summary.set_num_shards(3);
        for (shard_id, temp, zone) in [
            (0, 6.67, HeatZone::Hot),
            (1, 2.22, HeatZone::Cold),
            (2, 4.5, HeatZone::Lukewarm),
        ] {
            let profile = store.get_or_create("idx", shard_id);
            profile.add_temperature_for_dimension(Dimension::Cpu, nv(temp));
            summary.add_shard_to_zone(profile, zone);
        }
        summary
    }

    #[test]
    fn test_schema_matches_rows() {
        let summary = sample();
        assert_eq!(summary.sql_row().unwrap().len(), summary.sql_schema().len());
        for shard in summary.shards() {
            assert_eq!(shard.sql_row().unwrap().len(), shard.sql_schema().len());
        }
    }

    #[test]
    fn test_zone_counts_in_row() {
        let values = sample().sql_values();
        assert_eq!(values[3], SqlValue::Integer(3));
        assert_eq!(values[4], SqlValue::Integer(1));
        assert_eq!(values[5], SqlValue::Integer(0));
        assert_eq!(values[6], SqlValue::Integer(1));
        assert_eq!(values[7], SqlValue::Integer(1));
    }

    #[test]
    fn test_own_message_has_no_children() {
        let message = sample().build_summary_message();
        assert!(message.nested_summaries.is_empty());
    }

    #[test]
    fn test_num_shards_saturates_on_the_wire() {
        let mut summary = sample();
        summary.set_num_shards(usize::MAX);
        match summary.build_summary_message().summary {
            Some(summary_message::Summary::NodeTemperature(node)) => {
                assert_eq!(node.num_shards, i32::MAX);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_wire_round_trip_with_children() {
        let summary = sample();
        let bytes = summary.to_message().encode_to_vec();
        let decoded = SummaryMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.nested_summaries.len(), 3);

        let rebuilt = match Summary::from_message(&decoded).unwrap() {
            Summary::NodeTemperature(s) => s,
            other => panic!("unexpected summary: {other}"),
        };
        assert_eq!(rebuilt.table_name(), summary.table_name());
        assert_eq!(rebuilt.sql_values(), summary.sql_values());
        assert_eq!(rebuilt, summary);
    }

    #[test]
    fn test_top_consumers_hottest_first() {
        let top = sample().top_consumers(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name(), "idx[0]");
        assert_eq!(top[1].name(), "idx[2]");
    }

    #[test]
    fn test_nested_top_consumer_is_rejected() {
        let mut message = sample().build_summary_message();
        message
            .nested_summaries
            .push(TopConsumerSummary::new("x", 1.0).to_message());
        assert!(Summary::from_message(&message).is_err());
    }

    #[test]
    fn test_json_groups_by_zone() {
        let json = sample().to_json();
        assert_eq!(json["dimension"], "cpu");
        assert_eq!(json["zones"]["hot"].as_array().unwrap().len(), 1);
        assert_eq!(json["zones"]["warm"].as_array().unwrap().len(), 0);
    }
}
