//! Way-id correlation between obstacles and the segments a trip traverses.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::MatcherConfig;
use crate::hazards::{Obstacle, WayId};
use crate::polyline;
use crate::routing::{RoutingProvider, TraceAttributesRequest, Trip};

/// True iff any way id associated with `obstacle` is traversed by the route.
pub fn on_route_by_identifier(obstacle: &Obstacle, route_way_ids: &HashSet<WayId>) -> bool {
    obstacle.way_ids.iter().any(|id| route_way_ids.contains(id))
}

/// Way ids traversed by one trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    pub way_ids: HashSet<WayId>,
    /// The trace call failed; only ids echoed on the trip's locations are known.
    pub degraded: bool,
}

/// Collects the way ids traversed by `trip`.
///
/// The first leg's shape is traced with `/trace_attributes`; ids reported on
/// the trip's locations are added to the edge ids. A failed trace call is
/// logged and leaves the set with the location ids only.
pub async fn traversed_identifiers(
    provider: &dyn RoutingProvider,
    trip: &Trip,
    costing: &str,
    config: &MatcherConfig,
) -> Correlation {
    let mut correlation = Correlation {
        way_ids: trip.location_way_ids().collect(),
        degraded: false,
    };

    let shape = trip
        .legs
        .first()
        .map(|leg| polyline::decode(&leg.shape, config.shape_precision))
        .unwrap_or_default();

    if shape.is_empty() {
        debug!("Trip has no shape to trace; using location way ids only");
        return correlation;
    }

    let request = TraceAttributesRequest::for_shape(&shape, costing, &config.shape_match);
    match provider.trace_attributes(&request).await {
        Ok(resp) => {
            let before = correlation.way_ids.len();
            correlation
                .way_ids
                .extend(resp.edges.iter().filter_map(|e| e.way_id).filter(|id| *id != 0));
            debug!(
                edges = resp.edges.len(),
                added = correlation.way_ids.len() - before,
                "Traversed way ids collected"
            );
        }
        Err(e) => {
            warn!(error = %e, "trace_attributes failed; matching without traced way ids");
            correlation.degraded = true;
        }
    }

    correlation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::geometry::Coordinate;
    use crate::routing::{RouteRequest, RouteResponse, TraceAttributesResponse, TraceEdge};
    use reqwest::StatusCode;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct TraceOnly {
        edges: Option<Vec<Option<WayId>>>,
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl RoutingProvider for TraceOnly {
        async fn route(&self, _request: &RouteRequest) -> Result<RouteResponse, FetchError> {
            unreachable!()
        }

        async fn trace_attributes(
            &self,
            request: &TraceAttributesRequest,
        ) -> Result<TraceAttributesResponse, FetchError> {
            self.calls.lock().unwrap().push(request.shape.len());
            match &self.edges {
                Some(ids) => Ok(TraceAttributesResponse {
                    edges: ids
                        .iter()
                        .map(|id| TraceEdge {
                            way_id: *id,
                            ..Default::default()
                        })
                        .collect(),
                    shape: None,
                }),
                None => Err(FetchError::Status {
                    url: "http://valhalla.test/trace_attributes".to_string(),
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                }),
            }
        }
    }

    fn provider(edges: Option<Vec<Option<WayId>>>) -> TraceOnly {
        TraceOnly {
            edges,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn trip(shape: &str, location_way_id: Option<WayId>) -> Trip {
        serde_json::from_value(serde_json::json!({
            "locations": [{"lat": 35.0, "lon": 139.0, "way_id": location_way_id}],
            "legs": [{"shape": shape}],
            "summary": {}
        }))
        .unwrap()
    }

    fn shape() -> String {
        polyline::encode(
            &[
                Coordinate::new(35.0, 139.0),
                Coordinate::new(35.0, 139.001),
                Coordinate::new(35.0, 139.002),
            ],
            polyline::VALHALLA_PRECISION,
        )
    }

    fn obstacle(way_ids: &[WayId]) -> Obstacle {
        let mut o: Obstacle =
            serde_json::from_value(serde_json::json!({"id": 1, "position": [35.0, 139.0]})).unwrap();
        o.way_ids = way_ids.iter().copied().collect::<BTreeSet<_>>();
        o
    }

    #[test]
    fn test_identifier_match() {
        let route: HashSet<WayId> = [7, 42, 99].into();
        assert!(on_route_by_identifier(&obstacle(&[42]), &route));
        assert!(on_route_by_identifier(&obstacle(&[1, 99]), &route));
        assert!(!on_route_by_identifier(&obstacle(&[5]), &route));
        assert!(!on_route_by_identifier(&obstacle(&[]), &route));
    }

    #[tokio::test]
    async fn test_trace_ids_union_location_ids() {
        let p = provider(Some(vec![Some(42), Some(99), None, Some(0)]));
        let c = traversed_identifiers(&p, &trip(&shape(), Some(7)), "pedestrian", &MatcherConfig::default()).await;

        assert_eq!(c.way_ids, HashSet::from([7, 42, 99]));
        assert!(!c.degraded);
        assert_eq!(*p.calls.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_trace_failure_degrades() {
        let p = provider(None);
        let c = traversed_identifiers(&p, &trip(&shape(), Some(7)), "pedestrian", &MatcherConfig::default()).await;

        assert!(c.degraded);
        assert_eq!(c.way_ids, HashSet::from([7]));
    }

    #[tokio::test]
    async fn test_empty_shape_skips_trace_call() {
        let p = provider(Some(vec![Some(1)]));
        let c = traversed_identifiers(&p, &trip("", None), "pedestrian", &MatcherConfig::default()).await;

        assert!(c.way_ids.is_empty());
        assert!(!c.degraded);
        assert!(p.calls.lock().unwrap().is_empty());
    }
}
