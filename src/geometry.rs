//! Distance computations on a spherical Earth.
//!
//! All distances are in kilometres. Point-to-segment distance projects the
//! three points onto a plane with a Mercator-style projection, which is an
//! approximation: good at pedestrian scale (sub-kilometre segments), not
//! geodesically exact.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean Earth radius used by [`haversine`], in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 latitude/longitude pair in decimal degrees.
///
/// Serialized as a two-element `[lat, lon]` array, the shape obstacle
/// positions use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lon]
    }
}

/// Great-circle distance between `a` and `b` in kilometres (haversine formula).
pub fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

fn to_mercator(c: Coordinate) -> (f64, f64) {
    let x = c.lon * PI / 180.0;
    let y = (PI / 4.0 + c.lat * PI / 360.0).tan().ln();
    (x, y)
}

fn from_mercator(x: f64, y: f64) -> Coordinate {
    let lon = x * 180.0 / PI;
    let lat = (2.0 * y.exp().atan() - PI / 2.0) * 180.0 / PI;
    Coordinate { lat, lon }
}

/// Minimum distance in kilometres from `point` to the segment `start`–`end`.
///
/// A degenerate segment (`start == end`) is plain point distance. Otherwise
/// the closest point is found in Mercator space with the projection
/// parameter clamped to `[0, 1]`, mapped back to lat/lon, and measured with
/// [`haversine`].
pub fn segment_distance(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    if start == end {
        return haversine(point, start);
    }

    let (sx, sy) = to_mercator(start);
    let (ex, ey) = to_mercator(end);
    let (px, py) = to_mercator(point);

    let (abx, aby) = (ex - sx, ey - sy);
    let (apx, apy) = (px - sx, py - sy);

    let len_sq = abx * abx + aby * aby;
    let t = ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0);

    let closest = from_mercator(sx + t * abx, sy + t * aby);
    haversine(point, closest)
}

/// Cheap rejection test applied before any segment distance is computed.
///
/// The matcher only depends on this trait, so a grid or R-tree index can
/// stand in for the bounding box later.
pub trait Prefilter {
    fn admits(&self, point: Coordinate) -> bool;
}

/// Closed, axis-aligned lat/lon rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p.lat, p.lat, p.lon, p.lon),
                Some(b) => Self::new(
                    b.min_lat.min(p.lat),
                    b.max_lat.max(p.lat),
                    b.min_lon.min(p.lon),
                    b.max_lon.max(p.lon),
                ),
            })
        })
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        in_bounds(point, self.min_lat, self.max_lat, self.min_lon, self.max_lon)
    }
}

impl Prefilter for BoundingBox {
    fn admits(&self, point: Coordinate) -> bool {
        self.contains(point)
    }
}

/// True iff `point` lies inside the closed rectangle.
pub fn in_bounds(point: Coordinate, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> bool {
    point.lat >= min_lat && point.lat <= max_lat && point.lon >= min_lon && point.lon <= max_lon
}
