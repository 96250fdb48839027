//! Valhalla request and response shapes.
//!
//! Response types keep every field they don't model in a flattened `extra`
//! map, so an annotated response re-serializes with the provider's maneuvers,
//! admins, units and status intact.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{BoundingBox, Coordinate};
use crate::hazards::{Obstacle, WayId};

/// Edge attributes requested from `/trace_attributes`.
pub const TRACE_ATTRIBUTES: [&str; 3] = ["edge.way_id", "edge.length", "edge.speed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Break,
    Through,
    Via,
    BreakThrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LocationKind>,
}

impl RouteLocation {
    pub fn new(at: Coordinate, kind: Option<LocationKind>) -> Self {
        Self {
            lat: at.lat,
            lon: at.lon,
            kind,
        }
    }
}

/// Body of a `/route` call.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRequest {
    pub locations: Vec<RouteLocation>,
    pub costing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_locations: Vec<RouteLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternates: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapePoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<Coordinate> for ShapePoint {
    fn from(c: Coordinate) -> Self {
        Self {
            lat: c.lat,
            lon: c.lon,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceFilters {
    pub attributes: Vec<String>,
    pub action: String,
}

/// Body of a `/trace_attributes` call.
#[derive(Debug, Clone, Serialize)]
pub struct TraceAttributesRequest {
    pub shape: Vec<ShapePoint>,
    pub costing: String,
    pub shape_match: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<TraceFilters>,
}

impl TraceAttributesRequest {
    /// Requests way id, length and speed for every edge along `shape`.
    pub fn for_shape(shape: &[Coordinate], costing: &str, shape_match: &str) -> Self {
        Self {
            shape: shape.iter().copied().map(ShapePoint::from).collect(),
            costing: costing.to_string(),
            shape_match: shape_match.to_string(),
            filters: Some(TraceFilters {
                attributes: TRACE_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
                action: "include".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraceEdge {
    #[serde(default)]
    pub way_id: Option<WayId>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceAttributesResponse {
    #[serde(default)]
    pub edges: Vec<TraceEdge>,
    #[serde(default)]
    pub shape: Option<String>,
}

/// Trip-level or leg-level summary. Only the bounding box is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Summary {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            self.min_lat?,
            self.max_lat?,
            self.min_lon?,
            self.max_lon?,
        ))
    }
}

/// A location as echoed back on a trip, possibly snapped to a way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub way_id: Option<WayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TripLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Encoded polyline, precision 6.
    #[serde(default)]
    pub shape: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One candidate path: the primary trip or an alternate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub locations: Vec<TripLocation>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub summary: Summary,
    /// Filled in by the matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacles: Option<Vec<Obstacle>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trip {
    /// Way ids the provider reported for the trip's own locations.
    pub fn location_way_ids(&self) -> impl Iterator<Item = WayId> + '_ {
        self.locations
            .iter()
            .filter_map(|l| l.way_id)
            .filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternate {
    pub trip: Trip,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `/route` response: one primary trip plus zero or more alternates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub trip: Trip,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<Alternate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RouteResponse {
    /// Primary trip first, then alternates in provider order.
    pub fn variants(&self) -> impl Iterator<Item = &Trip> {
        std::iter::once(&self.trip).chain(self.alternates.iter().map(|a| &a.trip))
    }

    pub fn variants_mut(&mut self) -> impl Iterator<Item = &mut Trip> {
        std::iter::once(&mut self.trip).chain(self.alternates.iter_mut().map(|a| &mut a.trip))
    }

    pub fn variant_count(&self) -> usize {
        1 + self.alternates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "trip": {
                "locations": [
                    {"type": "break", "lat": 35.0, "lon": 138.95, "original_index": 0, "way_id": 7},
                    {"type": "break", "lat": 35.0, "lon": 139.05, "original_index": 1, "way_id": 0}
                ],
                "legs": [{
                    "maneuvers": [{"type": 1, "instruction": "Walk east."}],
                    "summary": {"min_lat": 35.0, "max_lat": 35.0, "min_lon": 138.95, "max_lon": 139.05, "time": 60.0},
                    "shape": "abc"
                }],
                "summary": {"has_toll": false, "min_lat": 35.0, "max_lat": 35.0, "min_lon": 138.95, "max_lon": 139.05, "time": 60.0, "length": 9.1, "cost": 70.0},
                "status_message": "Found route between points",
                "status": 0,
                "units": "kilometers",
                "language": "ja-JP"
            },
            "alternates": [{"trip": {"legs": [], "summary": {}}}],
            "admins": [{"iso_3166_1": "JP"}]
        })
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let response: RouteResponse = serde_json::from_value(sample()).unwrap();
        let out = serde_json::to_value(&response).unwrap();

        assert_eq!(out["admins"], json!([{"iso_3166_1": "JP"}]));
        assert_eq!(out["trip"]["status_message"], "Found route between points");
        assert_eq!(out["trip"]["summary"]["has_toll"], false);
        assert_eq!(out["trip"]["legs"][0]["maneuvers"][0]["instruction"], "Walk east.");
        assert_eq!(out["trip"]["locations"][0]["type"], "break");
        assert!(out["trip"].get("obstacles").is_none());
    }

    #[test]
    fn test_variants_are_primary_then_alternates() {
        let response: RouteResponse = serde_json::from_value(sample()).unwrap();
        assert_eq!(response.variant_count(), 2);
        let legs: Vec<usize> = response.variants().map(|t| t.legs.len()).collect();
        assert_eq!(legs, vec![1, 0]);
    }

    #[test]
    fn test_bounding_box_needs_all_four_edges() {
        let response: RouteResponse = serde_json::from_value(sample()).unwrap();
        let bbox = response.trip.summary.bounding_box().unwrap();
        assert_eq!(bbox, BoundingBox::new(35.0, 35.0, 138.95, 139.05));
        assert!(response.alternates[0].trip.summary.bounding_box().is_none());
    }

    #[test]
    fn test_location_way_ids_skip_zero() {
        let response: RouteResponse = serde_json::from_value(sample()).unwrap();
        let ids: Vec<WayId> = response.trip.location_way_ids().collect();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn test_trace_request_shape() {
        let req = TraceAttributesRequest::for_shape(
            &[Coordinate::new(35.0, 139.0), Coordinate::new(35.1, 139.1)],
            "pedestrian",
            "map_snap",
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "shape": [{"lat": 35.0, "lon": 139.0}, {"lat": 35.1, "lon": 139.1}],
                "costing": "pedestrian",
                "shape_match": "map_snap",
                "filters": {
                    "attributes": ["edge.way_id", "edge.length", "edge.speed"],
                    "action": "include"
                }
            })
        );
    }
}
