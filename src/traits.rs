//! Collaborator contracts for the route planner.
//!
//! These are intentionally minimal. Concrete adapters (`maps`, `baserow`)
//! implement them against real services; tests implement them with mocks.

use chrono::{DateTime, Utc};

use crate::cache::{DistanceFact, FactId, NewDistanceFact};
use crate::error::{PlannerError, StoreError};
use crate::geo::{Coordinate, GeoBox};
use crate::polyline::Polyline;

/// A point the oracle can be asked about: coordinates plus the free-text
/// address they were resolved from. The address travels along so persisted
/// facts keep their provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub coordinates: Coordinate,
    pub address: String,
}

impl Waypoint {
    pub fn new(coordinates: Coordinate, address: impl Into<String>) -> Self {
        Self {
            coordinates,
            address: address.into(),
        }
    }
}

/// A pairwise distance/duration measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelEstimate {
    pub distance_meters: u32,
    pub duration_seconds: u32,
}

/// A fully materialized travel leg from a directions collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsLeg {
    pub distance_meters: u32,
    pub duration_seconds: u32,
    pub polyline: Polyline,
    pub start_address: String,
    pub end_address: String,
}

/// A geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub coordinates: Coordinate,
    pub formatted_address: String,
}

/// Resolves a free-text address to coordinates.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Result<GeocodedAddress, PlannerError>;
}

/// The external pairwise-distance collaborator (normally a paid API).
pub trait DistanceProvider {
    fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TravelEstimate, PlannerError>;
}

/// The external turn-by-turn directions collaborator.
pub trait DirectionsProvider {
    fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<DirectionsLeg, PlannerError>;
}

/// The seam the sequencer consumes: cached distances and materialized legs.
///
/// [`DistanceOracle`](crate::oracle::DistanceOracle) is the production
/// implementation.
pub trait TravelOracle {
    fn travel_estimate(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<TravelEstimate, PlannerError>;

    fn leg_directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<DirectionsLeg, PlannerError>;
}

/// Record-oriented persistent store for distance facts.
///
/// The contract is typed to what the cache and janitor need: numeric-range
/// (bounding box) queries, date filters, and last-used ordering.
pub trait FactStore {
    /// Facts whose origin and destination fall inside the given boxes.
    fn find_in_box(
        &self,
        origin: GeoBox,
        destination: GeoBox,
    ) -> Result<Vec<DistanceFact>, StoreError>;

    fn insert(&self, fact: NewDistanceFact) -> Result<DistanceFact, StoreError>;

    /// Bumps `last_used_at`. Races between readers are harmless.
    fn touch(&self, id: FactId, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn delete(&self, id: FactId) -> Result<(), StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    /// Ids of facts with `last_used_at` strictly before the cutoff.
    fn find_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<FactId>, StoreError>;

    /// Ids of the `limit` least-recently-used facts, oldest first.
    fn oldest(&self, limit: usize) -> Result<Vec<FactId>, StoreError>;
}
