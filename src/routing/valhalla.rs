use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

use super::{RouteRequest, RouteResponse, RoutingProvider, TraceAttributesRequest, TraceAttributesResponse};
use crate::fetch::{FetchError, HttpClient, RetryPolicy, post_json};

/// Valhalla HTTP API client (`/route` and `/trace_attributes`).
pub struct ValhallaClient<C> {
    client: C,
    route_url: Url,
    trace_url: Url,
    retry: RetryPolicy,
}

impl<C: HttpClient> ValhallaClient<C> {
    /// `base_url` may carry a path prefix (e.g. `https://host/valhalla`).
    pub fn new(client: C, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid routing provider URL '{base_url}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            route_url: base.join("route")?,
            trace_url: base.join("trace_attributes")?,
            retry,
        })
    }
}

#[async_trait]
impl<C: HttpClient> RoutingProvider for ValhallaClient<C> {
    #[tracing::instrument(skip_all, fields(locations = request.locations.len(), costing = %request.costing))]
    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, FetchError> {
        post_json(&self.client, &self.route_url, request, self.retry).await
    }

    #[tracing::instrument(skip_all, fields(points = request.shape.len()))]
    async fn trace_attributes(
        &self,
        request: &TraceAttributesRequest,
    ) -> Result<TraceAttributesResponse, FetchError> {
        post_json(&self.client, &self.trace_url, request, self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::RecordingClient;
    use crate::geometry::Coordinate;
    use crate::routing::{LocationKind, RouteLocation};
    use serde_json::json;

    fn route_request() -> RouteRequest {
        RouteRequest {
            locations: vec![
                RouteLocation::new(Coordinate::new(35.0, 138.95), None),
                RouteLocation::new(Coordinate::new(35.0, 139.0), Some(LocationKind::Through)),
                RouteLocation::new(Coordinate::new(35.0, 139.05), None),
            ],
            costing: "pedestrian".to_string(),
            language: Some("ja-JP".to_string()),
            exclude_locations: vec![],
            alternates: Some(2),
        }
    }

    #[test]
    fn test_endpoint_urls_keep_path_prefix() {
        let client = ValhallaClient::new(
            RecordingClient::default(),
            "https://maps.example/valhalla",
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(client.route_url.as_str(), "https://maps.example/valhalla/route");
        assert_eq!(
            client.trace_url.as_str(),
            "https://maps.example/valhalla/trace_attributes"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ValhallaClient::new(RecordingClient::default(), "not a url", RetryPolicy::default()).is_err());
    }

    #[tokio::test]
    async fn test_route_posts_valhalla_body() {
        let recorder = RecordingClient::new(vec![(
            200,
            json!({"trip": {"legs": [{"shape": ""}], "summary": {}}, "units": "kilometers"}).to_string(),
        )]);
        let client =
            ValhallaClient::new(recorder.clone(), "http://localhost:8002", RetryPolicy::default()).unwrap();

        let response = client.route(&route_request()).await.unwrap();
        assert_eq!(response.variant_count(), 1);
        assert_eq!(response.extra["units"], "kilometers");

        let sent = recorder.requests();
        assert_eq!(sent[0].url, "http://localhost:8002/route");
        assert_eq!(
            sent[0].body,
            json!({
                "locations": [
                    {"lat": 35.0, "lon": 138.95},
                    {"lat": 35.0, "lon": 139.0, "type": "through"},
                    {"lat": 35.0, "lon": 139.05}
                ],
                "costing": "pedestrian",
                "language": "ja-JP",
                "alternates": 2
            })
        );
    }

    #[tokio::test]
    async fn test_trace_attributes_decodes_edges() {
        let recorder = RecordingClient::new(vec![(
            200,
            json!({"edges": [{"way_id": 7, "length": 0.1}, {"way_id": 42, "speed": 5.0}, {}]}).to_string(),
        )]);
        let client =
            ValhallaClient::new(recorder.clone(), "http://localhost:8002", RetryPolicy::default()).unwrap();

        let request = TraceAttributesRequest::for_shape(
            &[Coordinate::new(35.0, 139.0), Coordinate::new(35.0, 139.01)],
            "pedestrian",
            "map_snap",
        );
        let response = client.trace_attributes(&request).await.unwrap();

        let ids: Vec<_> = response.edges.iter().map(|e| e.way_id).collect();
        assert_eq!(ids, vec![Some(7), Some(42), None]);
        assert_eq!(recorder.requests()[0].url, "http://localhost:8002/trace_attributes");
    }

    #[tokio::test]
    async fn test_route_error_status_is_propagated() {
        let recorder = RecordingClient::new(vec![(400, r#"{"error_code":171}"#.to_string())]);
        let client =
            ValhallaClient::new(recorder, "http://localhost:8002", RetryPolicy::default()).unwrap();

        let err = client.route(&route_request()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { .. }));
        assert!(err.to_string().contains("error_code"));
    }
}
