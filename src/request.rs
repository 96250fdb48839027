//! The JSON body accepted for a route-with-obstacles request and its
//! validated mapping onto a [`RouteQuery`].

use serde::Deserialize;

use crate::error::MatchError;
use crate::geometry::Coordinate;
use crate::matcher::{DetectionPolicy, RouteQuery};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteWithObstaclesRequest {
    #[serde(default)]
    pub locations: Vec<LatLon>,
    #[serde(default)]
    pub waypoints: Vec<LatLon>,
    #[serde(default)]
    pub exclude_locations: Vec<LatLon>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub costing: Option<String>,
    /// `nodes`, `distance` or `both`.
    #[serde(default)]
    pub detection_method: Option<String>,
    /// Kilometers; zero means "use the default".
    #[serde(default)]
    pub distance_threshold: Option<f64>,
    #[serde(default)]
    pub alternates: Option<u32>,
}

impl RouteWithObstaclesRequest {
    pub fn from_json(bytes: &[u8]) -> Result<Self, MatchError> {
        serde_json::from_slice(bytes)
            .map_err(|e| MatchError::BadRequest(format!("invalid request body: {e}")))
    }

    /// Validates the request. Every failure is a `BadRequest`, raised before
    /// any outbound call.
    pub fn into_query(self) -> Result<RouteQuery, MatchError> {
        if self.locations.len() < 2 {
            return Err(MatchError::BadRequest(format!(
                "at least two locations are required, got {}",
                self.locations.len()
            )));
        }

        let policy = match self.detection_method.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<DetectionPolicy>()
                    .map_err(|e| MatchError::BadRequest(e.to_string()))?,
            ),
        };

        if let Some(km) = self.distance_threshold {
            if !km.is_finite() || km < 0.0 {
                return Err(MatchError::BadRequest(format!(
                    "distance_threshold must be a non-negative number of kilometers, got {km}"
                )));
            }
        }

        Ok(RouteQuery {
            locations: coordinates("locations", &self.locations)?,
            waypoints: coordinates("waypoints", &self.waypoints)?,
            exclude_locations: coordinates("exclude_locations", &self.exclude_locations)?,
            language: self.language.filter(|l| !l.is_empty()),
            costing: self.costing.filter(|c| !c.is_empty()),
            policy,
            distance_threshold_km: self.distance_threshold,
            alternates: self.alternates,
        })
    }
}

fn coordinates(field: &str, points: &[LatLon]) -> Result<Vec<Coordinate>, MatchError> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let c = Coordinate::new(p.lat, p.lon);
            if c.is_valid() {
                Ok(c)
            } else {
                Err(MatchError::BadRequest(format!(
                    "{field}[{i}] is not a valid coordinate: ({}, {})",
                    p.lat, p.lon
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<RouteQuery, MatchError> {
        RouteWithObstaclesRequest::from_json(body.as_bytes())?.into_query()
    }

    #[test]
    fn test_full_request() {
        let q = parse(
            r#"{
                "locations": [{"lat": 35.68, "lon": 139.76}, {"lat": 35.69, "lon": 139.70}],
                "waypoints": [{"lat": 35.685, "lon": 139.73}],
                "exclude_locations": [{"lat": 35.686, "lon": 139.74}],
                "language": "ja-JP",
                "costing": "pedestrian",
                "detection_method": "both",
                "distance_threshold": 0.04,
                "alternates": 2
            }"#,
        )
        .unwrap();

        assert_eq!(q.locations.len(), 2);
        assert_eq!(q.waypoints, vec![Coordinate::new(35.685, 139.73)]);
        assert_eq!(q.exclude_locations.len(), 1);
        assert_eq!(q.policy, Some(DetectionPolicy::Both));
        assert_eq!(q.distance_threshold_km, Some(0.04));
        assert_eq!(q.alternates, Some(2));
        assert_eq!(q.language.as_deref(), Some("ja-JP"));
    }

    #[test]
    fn test_optional_fields_left_unset() {
        let q = parse(r#"{"locations": [{"lat": 1, "lon": 2}, {"lat": 3, "lon": 4}], "detection_method": ""}"#)
            .unwrap();
        assert_eq!(q.policy, None);
        assert_eq!(q.costing, None);
        assert_eq!(q.distance_threshold_km, None);
    }

    #[test]
    fn test_rejections() {
        let cases = [
            r#"{"locations": [{"lat": 1, "lon": 2}]}"#,
            r#"{"locations": [{"lat": 1, "lon": 2}, {"lat": 91, "lon": 2}]}"#,
            r#"{"locations": [{"lat": 1, "lon": 2}, {"lat": 3, "lon": 4}], "detection_method": "either"}"#,
            r#"{"locations": [{"lat": 1, "lon": 2}, {"lat": 3, "lon": 4}], "distance_threshold": -1}"#,
            r#"{"locations": [{"lat": "x", "lon": 2}]}"#,
            r#"not json"#,
        ];
        for body in cases {
            let err = parse(body).unwrap_err();
            assert!(matches!(err, MatchError::BadRequest(_)), "{body}: {err}");
        }
    }
}
