//! Hazard store access.
//!
//! [`HazardStore`] is the async trait for a bulk read of the obstacle
//! catalogue. [`JsonFileHazardStore`] reads a local JSON file,
//! [`S3HazardStore`] reads a (optionally gzipped) JSON object from S3 and
//! [`MemoryHazardStore`] serves a fixed list.

mod file;
mod s3;
mod types;

pub use file::JsonFileHazardStore;
pub use s3::S3HazardStore;
pub use types::{Obstacle, WayId};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Catalogue size the core is sized for; larger catalogues still load.
pub const EXPECTED_MAX_OBSTACLES: usize = 1000;

/// Bulk, unfiltered read of every obstacle record.
///
/// Called once per route request with no caching in between.
#[async_trait::async_trait]
pub trait HazardStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Obstacle>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Catalogue {
    Bare(Vec<Obstacle>),
    Envelope { items: Vec<Obstacle> },
}

/// Parses a catalogue payload: either a bare JSON array of obstacles or the
/// `{"items": [...]}` list envelope.
pub fn parse_catalogue(bytes: &[u8]) -> Result<Vec<Obstacle>> {
    let catalogue: Catalogue =
        serde_json::from_slice(bytes).context("obstacle catalogue is not valid JSON")?;

    let obstacles = match catalogue {
        Catalogue::Bare(items) | Catalogue::Envelope { items } => items,
    };

    if obstacles.len() > EXPECTED_MAX_OBSTACLES {
        warn!(
            count = obstacles.len(),
            expected_max = EXPECTED_MAX_OBSTACLES,
            "Obstacle catalogue larger than expected; matching cost grows linearly"
        );
    }

    Ok(obstacles)
}

/// Serves a fixed obstacle list.
#[derive(Debug, Clone, Default)]
pub struct MemoryHazardStore {
    obstacles: Vec<Obstacle>,
}

impl MemoryHazardStore {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }
}

#[async_trait::async_trait]
impl HazardStore for MemoryHazardStore {
    async fn list(&self) -> Result<Vec<Obstacle>> {
        Ok(self.obstacles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let obstacles =
            parse_catalogue(br#"[{"id":1,"position":[35.0,139.0]},{"id":2,"position":[0,0]}]"#)
                .unwrap();
        assert_eq!(obstacles.len(), 2);
        assert_eq!(obstacles[1].id, 2);
    }

    #[test]
    fn test_parse_items_envelope() {
        let obstacles =
            parse_catalogue(br#"{"items":[{"id":9,"position":[35.0,139.0]}]}"#).unwrap();
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0].id, 9);
    }

    #[test]
    fn test_parse_invalid_payload() {
        assert!(parse_catalogue(b"{\"oops\":").is_err());
        assert!(parse_catalogue(b"42").is_err());
    }

    #[tokio::test]
    async fn test_memory_store_returns_everything() {
        let obstacles = parse_catalogue(br#"[{"id":1,"position":[35.0,139.0]}]"#).unwrap();
        let store = MemoryHazardStore::new(obstacles.clone());
        assert_eq!(store.list().await.unwrap(), obstacles);
    }
}
