//! API client for communicating with a heat agent

use anyhow::{Context, Result};
use heat_lib::{Dimension, HeatZone};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the heat agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid agent URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Latest node temperature, for one dimension or all of them
    pub async fn node_temperature(&self, dimension: Option<Dimension>) -> Result<Vec<NodeTemperature>> {
        let query: Vec<(&str, String)> = dimension
            .map(|d| ("dimension", d.to_string()))
            .into_iter()
            .collect();
        self.get("api/v1/temperature", &query).await
    }

    /// Tracked shards, optionally restricted to a zone
    pub async fn shards(
        &self,
        zone: Option<HeatZone>,
        dimension: Option<Dimension>,
    ) -> Result<Vec<ShardInfo>> {
        let mut query = Vec::new();
        if let Some(zone) = zone {
            query.push(("zone", zone.to_string()));
        }
        if let Some(dimension) = dimension {
            query.push(("dimension", dimension.to_string()));
        }
        self.get("api/v1/shards", &query).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTemperature {
    pub timestamp_millis: i64,
    pub summary: NodeSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub dimension: Dimension,
    pub mean_usage: f64,
    pub total_usage: f64,
    pub num_shards: usize,
    /// Shards keyed by zone name, hottest zone first on the agent side
    #[serde(default)]
    pub zones: BTreeMap<String, Vec<ShardTemperature>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardTemperature {
    pub key: ShardRef,
    pub zone: HeatZone,
    pub dimension: Dimension,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardRef {
    pub index_name: String,
    pub shard_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardInfo {
    pub index_name: String,
    pub shard_id: i32,
    #[serde(default)]
    pub temperature: BTreeMap<String, f64>,
    #[serde(default)]
    pub zones: BTreeMap<String, HeatZone>,
}
