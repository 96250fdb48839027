//! Google-style encoded polyline codec.
//!
//! Each coordinate component is a zig-zag signed delta from the previous
//! value, written as 5-bit groups offset by 63 with `0x20` as the
//! continuation bit. Components alternate latitude, longitude. Valhalla
//! shapes use precision 6.

use crate::geometry::Coordinate;

/// Decimal precision of Valhalla `shape` strings.
pub const VALHALLA_PRECISION: u32 = 6;

fn scale(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

/// Reads one variable-length signed value. Returns `None` if the input ends
/// before a terminating group or holds a byte outside the alphabet.
fn next_value(bytes: &mut impl Iterator<Item = u8>) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0u32;

    loop {
        let chunk = i64::from(bytes.next()?.checked_sub(63)?);
        if shift > 60 {
            return None;
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Decodes `encoded` into coordinates, dividing by `10^precision`.
///
/// Malformed input never panics: decoding stops at the first incomplete
/// coordinate and returns the points decoded so far.
pub fn decode(encoded: &str, precision: u32) -> Vec<Coordinate> {
    let factor = scale(precision);
    let mut bytes = encoded.bytes();
    let mut points = Vec::with_capacity(encoded.len() / 4);
    let (mut lat, mut lon) = (0i64, 0i64);

    while let Some(dlat) = next_value(&mut bytes) {
        let Some(dlon) = next_value(&mut bytes) else {
            break;
        };
        lat = lat.wrapping_add(dlat);
        lon = lon.wrapping_add(dlon);
        points.push(Coordinate::new(lat as f64 / factor, lon as f64 / factor));
    }

    points
}

fn push_value(out: &mut String, value: i64) {
    let mut v = ((value << 1) ^ (value >> 63)) as u64;
    while v >= 0x20 {
        out.push(char::from((0x20 | (v & 0x1f)) as u8 + 63));
        v >>= 5;
    }
    out.push(char::from(v as u8 + 63));
}

/// Encodes `points` at `precision`; the inverse of [`decode`] for
/// coordinates already rounded to that precision.
pub fn encode(points: &[Coordinate], precision: u32) -> String {
    let factor = scale(precision);
    let mut out = String::with_capacity(points.len() * 8);
    let (mut prev_lat, mut prev_lon) = (0i64, 0i64);

    for p in points {
        let lat = (p.lat * factor).round() as i64;
        let lon = (p.lon * factor).round() as i64;
        push_value(&mut out, lat.wrapping_sub(prev_lat));
        push_value(&mut out, lon.wrapping_sub(prev_lon));
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}
