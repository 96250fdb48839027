//! Obstacle records as read from the hazard store.
//!
//! Stored records went through several schema revisions: `nodes` as a
//! two-float array, `nodes` as a list, and finally a scalar `way_id`. Every
//! shape is accepted and normalised to one canonical set of way identifiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::geometry::Coordinate;

/// Identifier of a physical road/path segment (an OSM way id).
pub type WayId = i64;

/// A georeferenced hazard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ObstacleRecord")]
pub struct Obstacle {
    pub id: i64,
    pub position: Coordinate,
    #[serde(rename = "type")]
    pub kind: i32,
    pub description: String,
    #[serde(rename = "dangerLevel")]
    pub danger_level: i32,
    /// Segments this obstacle is associated with; empty when unknown.
    pub way_ids: BTreeSet<WayId>,
    pub nearest_distance: f64,
    pub no_nearby_road: bool,
    pub image_s3_key: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
}

impl Obstacle {
    pub fn has_way_ids(&self) -> bool {
        !self.way_ids.is_empty()
    }
}

/// Wire shape accepting every historical field spelling.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ObstacleRecord {
    id: i64,
    position: [f64; 2],
    #[serde(rename = "type")]
    kind: i32,
    description: String,
    #[serde(alias = "dangerLevel")]
    danger_level: i32,
    nodes: Vec<f64>,
    way_id: Option<f64>,
    way_ids: Vec<WayId>,
    nearest_distance: f64,
    no_nearby_road: bool,
    image_s3_key: String,
    #[serde(alias = "createdAt")]
    created_at: String,
    user_id: String,
}

/// Zero, negative, fractional and non-finite values are placeholders, not ids.
fn as_way_id(raw: f64) -> Option<WayId> {
    (raw.is_finite() && raw > 0.0 && raw.fract() == 0.0).then_some(raw as WayId)
}

impl From<ObstacleRecord> for Obstacle {
    fn from(r: ObstacleRecord) -> Self {
        let way_ids = r
            .nodes
            .iter()
            .copied()
            .chain(r.way_id)
            .filter_map(as_way_id)
            .chain(r.way_ids.into_iter().filter(|id| *id > 0))
            .collect();

        Obstacle {
            id: r.id,
            position: r.position.into(),
            kind: r.kind,
            description: r.description,
            danger_level: r.danger_level,
            way_ids,
            nearest_distance: r.nearest_distance,
            no_nearby_road: r.no_nearby_road,
            image_s3_key: r.image_s3_key,
            created_at: r.created_at,
            user_id: r.user_id,
        }
    }
}
