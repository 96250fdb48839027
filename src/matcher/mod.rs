//! Route–obstacle matching.
//!
//! [`Matcher`] requests a route and the obstacle catalogue concurrently,
//! then scores every trip variant (primary first, then alternates) on its
//! own task and annotates each trip with the obstacles that satisfy the
//! active [`DetectionPolicy`].

mod correlation;
mod policy;
mod proximity;

pub use correlation::{Correlation, on_route_by_identifier, traversed_identifiers};
pub use policy::{DetectionPolicy, UnknownPolicy};
pub use proximity::RouteGeometry;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info};

use crate::config::MatcherConfig;
use crate::error::MatchError;
use crate::geometry::{Coordinate, Prefilter};
use crate::hazards::{HazardStore, Obstacle, WayId};
use crate::routing::{LocationKind, RouteLocation, RouteRequest, RouteResponse, RoutingProvider};

/// Caller input for one route-with-obstacles request. Unset options fall
/// back to the matcher's [`MatcherConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteQuery {
    /// Origin first, destination last.
    pub locations: Vec<Coordinate>,
    /// Pass-through points inserted after the origin.
    pub waypoints: Vec<Coordinate>,
    pub exclude_locations: Vec<Coordinate>,
    pub language: Option<String>,
    pub costing: Option<String>,
    pub policy: Option<DetectionPolicy>,
    pub distance_threshold_km: Option<f64>,
    pub alternates: Option<u32>,
}

impl RouteQuery {
    pub fn new(locations: Vec<Coordinate>) -> Self {
        Self {
            locations,
            ..Default::default()
        }
    }

    /// Builds the `/route` body: origin, waypoints as `through` locations,
    /// then the remaining locations.
    pub fn route_request(&self, costing: &str) -> RouteRequest {
        let mut locations = Vec::with_capacity(self.locations.len() + self.waypoints.len());
        let mut rest = self.locations.iter().copied();
        if let Some(origin) = rest.next() {
            locations.push(RouteLocation::new(origin, None));
        }
        locations.extend(
            self.waypoints
                .iter()
                .map(|&w| RouteLocation::new(w, Some(LocationKind::Through))),
        );
        locations.extend(rest.map(|l| RouteLocation::new(l, None)));

        RouteRequest {
            locations,
            costing: costing.to_string(),
            language: self.language.clone(),
            exclude_locations: self
                .exclude_locations
                .iter()
                .map(|&e| RouteLocation::new(e, None))
                .collect(),
            alternates: self.alternates,
        }
    }

    /// Caller threshold if present and nonzero, otherwise `default_km`.
    pub fn resolve_threshold(&self, default_km: f64) -> f64 {
        match self.distance_threshold_km {
            Some(km) if km != 0.0 => km,
            _ => default_km,
        }
    }
}

/// Diagnostics for one trip variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantReport {
    /// 0 is the primary trip; alternates follow in provider order.
    pub index: usize,
    pub traversed_ids: usize,
    pub trace_degraded: bool,
    pub obstacle_ids: Vec<i64>,
}

/// An annotated route plus what it took to annotate it.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub response: RouteResponse,
    pub variants: Vec<VariantReport>,
    pub policy: DetectionPolicy,
    pub threshold_km: f64,
    pub catalogue_size: usize,
}

/// Keeps the obstacles satisfying `policy` against one trip.
pub fn filter_obstacles<P: Prefilter>(
    obstacles: &[Obstacle],
    policy: DetectionPolicy,
    threshold_km: f64,
    route_way_ids: &HashSet<WayId>,
    geometry: &RouteGeometry<P>,
) -> Vec<Obstacle> {
    obstacles
        .iter()
        .filter(|o| {
            policy.admits(
                || on_route_by_identifier(o, route_way_ids),
                || geometry.is_near(o.position, threshold_km),
            )
        })
        .cloned()
        .collect()
}

pub struct Matcher {
    provider: Arc<dyn RoutingProvider>,
    hazards: Arc<dyn HazardStore>,
    config: Arc<MatcherConfig>,
}

impl Matcher {
    pub fn new(
        provider: Arc<dyn RoutingProvider>,
        hazards: Arc<dyn HazardStore>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            provider,
            hazards,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Returns the provider's route response with every trip carrying its
    /// matched `obstacles`.
    pub async fn get_route_with_obstacles(
        &self,
        query: RouteQuery,
    ) -> Result<RouteResponse, MatchError> {
        self.match_route(query).await.map(|outcome| outcome.response)
    }

    #[tracing::instrument(skip_all, fields(locations = query.locations.len(), waypoints = query.waypoints.len()))]
    pub async fn match_route(&self, query: RouteQuery) -> Result<MatchOutcome, MatchError> {
        if query.locations.len() < 2 {
            return Err(MatchError::BadRequest(
                "at least two locations are required".to_string(),
            ));
        }

        let policy = query.policy.unwrap_or(self.config.default_policy);
        let threshold_km = query.resolve_threshold(self.config.default_threshold_km);
        let costing = query
            .costing
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.config.default_costing.clone());
        let request = query.route_request(&costing);

        let (mut response, catalogue) = tokio::try_join!(
            async {
                self.provider
                    .route(&request)
                    .await
                    .map_err(MatchError::Routing)
            },
            async { self.hazards.list().await.map_err(MatchError::HazardStore) },
        )?;

        let catalogue = Arc::new(catalogue);
        info!(
            policy = %policy,
            threshold_km,
            variants = response.variant_count(),
            obstacles = catalogue.len(),
            "Route and obstacle catalogue received"
        );

        // Dropping the set aborts every variant task, so a cancelled request
        // leaves no trace calls running.
        let mut tasks = JoinSet::new();
        for (index, trip) in response.variants().enumerate() {
            let provider = self.provider.clone();
            let config = self.config.clone();
            let catalogue = catalogue.clone();
            let costing = costing.clone();
            let trip = trip.clone();

            let span = tracing::info_span!("match_variant", variant = index);

            tasks.spawn(
                async move {
                    let correlation = if policy.uses_identifiers() {
                        traversed_identifiers(provider.as_ref(), &trip, &costing, &config).await
                    } else {
                        Correlation::default()
                    };

                    let geometry = RouteGeometry::from_trip(&trip, config.shape_precision);
                    if !geometry.has_shape() {
                        debug!("Trip has no decodable shape; proximity falls back to locations");
                    }

                    let matched = filter_obstacles(
                        &catalogue,
                        policy,
                        threshold_km,
                        &correlation.way_ids,
                        &geometry,
                    );
                    debug!(
                        considered = catalogue.len(),
                        matched = matched.len(),
                        traversed_ids = correlation.way_ids.len(),
                        degraded = correlation.degraded,
                        "Variant matched"
                    );
                    (index, correlation, matched)
                }
                .instrument(span),
            );
        }

        let mut results: Vec<Option<(Correlation, Vec<Obstacle>)>> =
            vec![None; response.variant_count()];
        while let Some(joined) = tasks.join_next().await {
            let (index, correlation, matched) = joined
                .map_err(|e| MatchError::Internal(format!("matching a variant failed: {e}")))?;
            results[index] = Some((correlation, matched));
        }

        // Attach in variant order, not completion order.
        let mut variants = Vec::with_capacity(results.len());
        for (index, (result, trip)) in results.into_iter().zip(response.variants_mut()).enumerate() {
            let (correlation, matched) = result.ok_or_else(|| {
                MatchError::Internal(format!("variant {index} produced no result"))
            })?;

            variants.push(VariantReport {
                index,
                traversed_ids: correlation.way_ids.len(),
                trace_degraded: correlation.degraded,
                obstacle_ids: matched.iter().map(|o| o.id).collect(),
            });
            trip.obstacles = Some(matched);
        }

        Ok(MatchOutcome {
            response,
            variants,
            policy,
            threshold_km,
            catalogue_size: catalogue.len(),
        })
    }
}
