//! Node and shard temperature queries against a running agent

use anyhow::Result;
use colored::Colorize;
use heat_lib::{Dimension, HeatZone};
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, NodeSummary};
use crate::output::{
    color_zone, format_temperature, format_timestamp, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the node temperature table
#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "Dimension")]
    dimension: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Shards")]
    shards: usize,
    #[tabled(rename = "Hot")]
    hot: usize,
    #[tabled(rename = "Lukewarm")]
    lukewarm: usize,
    #[tabled(rename = "Cold")]
    cold: usize,
    #[tabled(rename = "Computed At")]
    computed_at: String,
}

/// Row for the shard table
#[derive(Tabled, Serialize)]
struct ShardRow {
    #[tabled(rename = "Index")]
    index_name: String,
    #[tabled(rename = "Shard")]
    shard_id: i32,
    #[tabled(rename = "Temperatures")]
    temperatures: String,
    #[tabled(rename = "Zones")]
    zones: String,
}

fn zone_count(summary: &NodeSummary, zone: HeatZone) -> usize {
    summary.zones.get(zone.as_str()).map_or(0, Vec::len)
}

/// Show the latest node temperature per dimension
pub async fn show_node(
    client: &ApiClient,
    dimension: Option<Dimension>,
    format: OutputFormat,
) -> Result<()> {
    let units = client.node_temperature(dimension).await?;

    match format {
        OutputFormat::Json => print_json(&units),
        OutputFormat::Table => {
            if units.is_empty() {
                print_warning("No temperature computed yet");
                return Ok(());
            }

            let rows: Vec<NodeRow> = units
                .iter()
                .map(|unit| NodeRow {
                    dimension: unit.summary.dimension.to_string(),
                    mean: format_temperature(unit.summary.mean_usage),
                    total: format!("{}", unit.summary.total_usage),
                    shards: unit.summary.num_shards,
                    hot: zone_count(&unit.summary, HeatZone::Hot),
                    lukewarm: zone_count(&unit.summary, HeatZone::Lukewarm),
                    cold: zone_count(&unit.summary, HeatZone::Cold),
                    computed_at: format_timestamp(unit.timestamp_millis),
                })
                .collect();
            println!("{}", "Node Temperature".bold());
            print_table(&rows, format);
        }
    }

    Ok(())
}

/// List tracked shards, optionally only those in `zone`
pub async fn show_shards(
    client: &ApiClient,
    zone: Option<HeatZone>,
    dimension: Option<Dimension>,
    format: OutputFormat,
) -> Result<()> {
    let shards = client.shards(zone, dimension).await?;

    match format {
        OutputFormat::Json => print_json(&shards),
        OutputFormat::Table => {
            let rows: Vec<ShardRow> = shards
                .iter()
                .map(|shard| ShardRow {
                    index_name: shard.index_name.clone(),
                    shard_id: shard.shard_id,
                    temperatures: shard
                        .temperature
                        .iter()
                        .map(|(d, t)| format!("{}={}", d, format_temperature(*t)))
                        .collect::<Vec<_>>()
                        .join(" "),
                    zones: shard
                        .zones
                        .iter()
                        .map(|(d, z)| format!("{}={}", d, color_zone(*z)))
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}
