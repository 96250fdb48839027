use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use super::{HazardStore, Obstacle, parse_catalogue};

/// Reads the catalogue from a JSON file on every call.
pub struct JsonFileHazardStore {
    path: PathBuf,
}

impl JsonFileHazardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl HazardStore for JsonFileHazardStore {
    async fn list(&self) -> Result<Vec<Obstacle>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read obstacle catalogue '{}'", self.path.display()))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Obstacle catalogue read");
        parse_catalogue(&bytes)
    }
}
