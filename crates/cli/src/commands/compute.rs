//! Offline temperature computation from a snapshot file

use anyhow::{Context, Result};
use colored::Colorize;
use heat_lib::{
    observability::StructuredLogger,
    source::read_snapshot,
    summary::GenericSummary,
    temperature::{ResourceHeatCalculator, ShardStore},
    Dimension, NormalizedValue,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{color_zone, format_temperature, print_json, print_table, OutputFormat};

/// Row for the shard zone table
#[derive(Tabled, Serialize)]
pub struct ZoneRow {
    #[tabled(rename = "Index")]
    pub index_name: String,
    #[tabled(rename = "Shard")]
    pub shard_id: i32,
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[tabled(rename = "Temperature")]
    pub temperature: String,
}

/// Run the calculator over one snapshot and print the zones
pub async fn compute(
    snapshot: &Path,
    dimension: Dimension,
    threshold: f64,
    format: OutputFormat,
) -> Result<()> {
    let threshold = NormalizedValue::new(threshold).context("Invalid threshold")?;
    let snapshot = read_snapshot(snapshot).await?;

    let calculator = ResourceHeatCalculator::new(StructuredLogger::new("heatctl"), threshold);
    let mut store = ShardStore::new();
    let flow_unit = calculator
        .get_resource_heat(&mut store, dimension, &snapshot.as_inputs())
        .with_context(|| format!("Failed to compute {} temperature", dimension))?;
    let summary = flow_unit.summary();

    match format {
        OutputFormat::Json => print_json(&summary.to_json()),
        OutputFormat::Table => {
            println!("{}", format!("Node temperature: {}", dimension).bold());
            println!(
                "Mean: {}  Total usage: {}  Shards: {}",
                summary.mean_usage().to_string().cyan(),
                summary.total_usage(),
                summary.num_shards()
            );
            println!();

            let rows: Vec<ZoneRow> = summary
                .shards()
                .map(|shard| ZoneRow {
                    index_name: shard.key.index_name.clone(),
                    shard_id: shard.key.shard_id,
                    zone: color_zone(shard.zone),
                    temperature: format_temperature(shard.temperature.value()),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}
