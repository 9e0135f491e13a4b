//! Coordinate types and the proximity tolerance used for cache keying.
//!
//! Two coordinates within [`COORD_TOLERANCE_DEG`] on both axes are treated
//! as the same place for caching purposes (~10 m at city latitudes).

use serde::{Deserialize, Serialize};

/// Per-axis tolerance, in degrees, for treating two coordinates as equal.
pub const COORD_TOLERANCE_DEG: f64 = 0.0001;

/// Decimal digits used when persisting coordinates to the fact store.
///
/// Fixed precision keeps bounding-box filters well-defined: the value read
/// back is the value that was compared against the filter.
pub const STORE_PRECISION: usize = 7;

/// Decimal digits used on the wire to routing collaborators.
pub const WIRE_PRECISION: usize = 6;

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both axes are inside the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Whether `other` falls inside the tolerance window on both axes.
    pub fn within_tolerance(&self, other: &Coordinate) -> bool {
        (self.lat - other.lat).abs() <= COORD_TOLERANCE_DEG
            && (self.lng - other.lng).abs() <= COORD_TOLERANCE_DEG
    }

    /// `"lat,lng"` at wire precision, as routing collaborators expect.
    pub fn wire_format(&self) -> String {
        format!("{:.*},{:.*}", WIRE_PRECISION, self.lat, WIRE_PRECISION, self.lng)
    }

    /// The tolerance bounding box around this coordinate.
    pub fn tolerance_box(&self) -> GeoBox {
        GeoBox {
            lat_min: self.lat - COORD_TOLERANCE_DEG,
            lat_max: self.lat + COORD_TOLERANCE_DEG,
            lng_min: self.lng - COORD_TOLERANCE_DEG,
            lng_max: self.lng + COORD_TOLERANCE_DEG,
        }
    }

    /// Microdegree-rounded key for the in-process cache tier.
    fn rounded_key(&self) -> (i64, i64) {
        (
            (self.lat * 1_000_000.0).round() as i64,
            (self.lng * 1_000_000.0).round() as i64,
        )
    }
}

/// Inclusive lat/lng range filter, passed to the persistent fact store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl GeoBox {
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coord.lat)
            && (self.lng_min..=self.lng_max).contains(&coord.lng)
    }
}

/// Exact-rounded key for an (origin, destination) pair.
///
/// Used by the hot cache tier and the directions memo. Rounding is exact,
/// not tolerance-based: near-identical pairs that round differently miss
/// here and fall through to the bounding-box lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    origin: (i64, i64),
    destination: (i64, i64),
}

impl PairKey {
    pub fn new(origin: &Coordinate, destination: &Coordinate) -> Self {
        Self {
            origin: origin.rounded_key(),
            destination: destination.rounded_key(),
        }
    }
}

/// Fixed-precision decimal string for persisting one axis value.
pub fn store_decimal(value: f64) -> String {
    format!("{:.*}", STORE_PRECISION, value)
}
