use crate::geometry::{BoundingBox, Coordinate, Prefilter, haversine, segment_distance};
use crate::polyline;
use crate::routing::Trip;

/// A trip's geometry, decoded once and reused for every obstacle.
#[derive(Debug, Clone)]
pub struct RouteGeometry<P = BoundingBox> {
    prefilter: Option<P>,
    legs: Vec<Vec<Coordinate>>,
    locations: Vec<Coordinate>,
}

impl RouteGeometry<BoundingBox> {
    /// Decodes every leg shape. The prefilter is the trip's reported
    /// bounding box, or the box enclosing the decoded points when the
    /// provider reported none.
    pub fn from_trip(trip: &Trip, precision: u32) -> Self {
        let legs: Vec<Vec<Coordinate>> = trip
            .legs
            .iter()
            .filter(|leg| !leg.shape.is_empty())
            .map(|leg| polyline::decode(&leg.shape, precision))
            .filter(|points| !points.is_empty())
            .collect();
        let locations: Vec<Coordinate> = trip.locations.iter().map(|l| l.coordinate()).collect();

        let prefilter = trip.summary.bounding_box().or_else(|| {
            BoundingBox::enclosing(legs.iter().flatten().chain(locations.iter()).copied())
        });

        Self {
            prefilter,
            legs,
            locations,
        }
    }
}

impl<P: Prefilter> RouteGeometry<P> {
    pub fn with_prefilter<Q: Prefilter>(self, prefilter: Q) -> RouteGeometry<Q> {
        RouteGeometry {
            prefilter: Some(prefilter),
            legs: self.legs,
            locations: self.locations,
        }
    }

    pub fn has_shape(&self) -> bool {
        !self.legs.is_empty()
    }

    /// True iff `point` passes the prefilter and lies within `threshold_km`
    /// of any leg segment or leg end point. Trip locations are only
    /// consulted when no leg has a shape.
    pub fn is_near(&self, point: Coordinate, threshold_km: f64) -> bool {
        match &self.prefilter {
            Some(p) if p.admits(point) => {}
            _ => return false,
        }

        if !self.has_shape() {
            return self
                .locations
                .iter()
                .any(|&l| haversine(point, l) <= threshold_km);
        }

        self.legs.iter().any(|points| {
            let along = points
                .windows(2)
                .any(|w| segment_distance(point, w[0], w[1]) <= threshold_km);
            let ends = [points.first(), points.last()]
                .into_iter()
                .flatten()
                .any(|&end| haversine(point, end) <= threshold_km);
            along || ends
        })
    }
}
