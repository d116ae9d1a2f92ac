//! Dataset sources
//!
//! The collectors that sample per-shard and node-level usage run outside this
//! crate. A source hands their latest output for one dimension to the
//! evaluation loop as a [`DimensionSnapshot`].

use crate::models::Dimension;
use crate::temperature::DimensionSnapshot;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub use async_trait::async_trait;

/// Trait for collector output providers
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Latest datasets for a dimension
    async fn fetch(&self, dimension: Dimension) -> Result<DimensionSnapshot>;
}

/// Reads `<dir>/<dimension>.json`, as dropped by the collectors
pub struct SnapshotDirSource {
    dir: PathBuf,
}

impl SnapshotDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, dimension: Dimension) -> PathBuf {
        self.dir.join(format!("{}.json", dimension.as_str()))
    }
}

#[async_trait]
impl DatasetSource for SnapshotDirSource {
    async fn fetch(&self, dimension: Dimension) -> Result<DimensionSnapshot> {
        let path = self.path_for(dimension);
        read_snapshot(&path).await
    }
}

/// Load a snapshot file
pub async fn read_snapshot(path: &Path) -> Result<DimensionSnapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// In-memory source, replaced wholesale per dimension
#[derive(Default)]
pub struct StaticSource {
    snapshots: RwLock<HashMap<Dimension, DimensionSnapshot>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot of `dimension`
    ///
    /// A poisoned lock is recovered: each entry is swapped whole, so a writer
    /// that panicked cannot have left a partial snapshot behind.
    pub fn set(&self, dimension: Dimension, snapshot: DimensionSnapshot) {
        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dimension, snapshot);
    }
}

#[async_trait]
impl DatasetSource for StaticSource {
    async fn fetch(&self, dimension: Dimension) -> Result<DimensionSnapshot> {
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        snapshots
            .get(&dimension)
            .cloned()
            .with_context(|| format!("No datasets for dimension {}", dimension))
    }
}
