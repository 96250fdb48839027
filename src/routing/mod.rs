//! Routing provider access.
//!
//! [`RoutingProvider`] is the async trait the matcher calls for a routed
//! path and for the edges traversed by a shape. [`ValhallaClient`] implements
//! it over HTTP; [`connect`] builds one from a [`ProviderConfig`].

mod types;
mod valhalla;

pub use types::{
    Alternate, Leg, LocationKind, RouteLocation, RouteRequest, RouteResponse, ShapePoint, Summary,
    TRACE_ATTRIBUTES, TraceAttributesRequest, TraceAttributesResponse, TraceEdge, TraceFilters,
    Trip, TripLocation,
};
pub use valhalla::ValhallaClient;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{ApiKeyConfig, ProviderConfig};
use crate::fetch::auth::{ApiKey, UrlParam};
use crate::fetch::{BasicClient, FetchError};

/// A pedestrian routing engine. Both calls are read-only.
#[async_trait::async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, FetchError>;

    async fn trace_attributes(
        &self,
        request: &TraceAttributesRequest,
    ) -> Result<TraceAttributesResponse, FetchError>;
}

/// Builds a Valhalla client, wrapping the HTTP client with the configured
/// API key placement.
pub fn connect(config: &ProviderConfig) -> Result<Arc<dyn RoutingProvider>> {
    let http = BasicClient::new(config.timeout, config.connect_timeout)?;

    let provider: Arc<dyn RoutingProvider> = match &config.api_key {
        None => Arc::new(ValhallaClient::new(http, &config.base_url, config.retry)?),
        Some(ApiKeyConfig::Header { name, key }) => Arc::new(ValhallaClient::new(
            ApiKey::new(http, name, key)?,
            &config.base_url,
            config.retry,
        )?),
        Some(ApiKeyConfig::QueryParam { name, key }) => Arc::new(ValhallaClient::new(
            UrlParam {
                inner: http,
                param_name: name.clone(),
                key: key.clone(),
            },
            &config.base_url,
            config.retry,
        )?),
    };

    Ok(provider)
}
