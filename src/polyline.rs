//! Polyline representation for route geometries.
//!
//! Internally a polyline is a decoded coordinate sequence. The compact
//! encoded format only appears at the directions-collaborator boundary,
//! which is where [`decode`] and [`encode`] are used.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A route geometry as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Decodes the standard 5-decimal-digit encoded polyline format.
///
/// Malformed input (a truncated final chunk) yields the points decoded so
/// far; directions collaborators do not emit partial chunks in practice.
pub fn decode(encoded: &str) -> Polyline {
    let mut points = Vec::new();
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut bytes = encoded.bytes();

    loop {
        let Some(dlat) = next_varint(&mut bytes) else {
            break;
        };
        let Some(dlng) = next_varint(&mut bytes) else {
            break;
        };
        lat += dlat;
        lng += dlng;
        points.push(Coordinate::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Polyline::new(points)
}

/// Encodes a polyline back into the compact format.
pub fn encode(polyline: &Polyline) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in polyline.points() {
        let lat = (point.lat * 1e5).round() as i64;
        let lng = (point.lng * 1e5).round() as i64;
        push_varint(&mut out, lat - prev_lat);
        push_varint(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn next_varint(bytes: &mut impl Iterator<Item = u8>) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = bytes.next()? as i64 - 63;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }

    if result & 1 == 1 {
        Some(!(result >> 1))
    } else {
        Some(result >> 1)
    }
}

fn push_varint(out: &mut String, value: i64) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_points() {
        let points = vec![
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
        ];
        let polyline = Polyline::new(points.clone());
        assert_eq!(polyline.points(), &points[..]);
    }

    #[test]
    fn test_empty_polyline() {
        let polyline = Polyline::new(vec![]);
        assert!(polyline.is_empty());
        assert_eq!(decode("").points().len(), 0);
    }

    #[test]
    fn test_decode_reference_string() {
        // Reference example from the encoded polyline format description.
        let polyline = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@");
        let points = polyline.points();
        assert_eq!(points.len(), 3);
        assert!((points[0].lat - 38.5).abs() < 1e-9);
        assert!((points[0].lng - -120.2).abs() < 1e-9);
        assert!((points[2].lat - 43.252).abs() < 1e-9);
        assert!((points[2].lng - -126.453).abs() < 1e-9);
    }

    #[test]
    fn test_encode_reference_string() {
        let polyline = Polyline::new(vec![
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ]);
        assert_eq!(encode(&polyline), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let original = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
        assert_eq!(encode(&decode(original)), original);
    }

    #[test]
    fn test_truncated_input_keeps_complete_points() {
        let full = decode("_p~iF~ps|U_ulLnnqC");
        let truncated = decode("_p~iF~ps|U_ulL");
        assert_eq!(full.points().len(), 2);
        assert_eq!(truncated.points().len(), 1);
    }
}
