//! Two-tier cache of pairwise distance facts.
//!
//! Tier one is an in-process map keyed by exact-rounded coordinate pairs
//! with a 24-hour TTL. Tier two is the persistent fact store, queried with
//! a tolerance bounding box so near-identical coordinates share facts.
//! A cache miss is always safe: the oracle falls through to a live call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::geo::{Coordinate, PairKey};
use crate::health::FailureGate;
use crate::polyline::Polyline;
use crate::traits::{FactStore, TravelEstimate, Waypoint};

/// Identifier of a persisted fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactId(pub u64);

/// A persisted pairwise distance/duration measurement.
///
/// Facts are immutable once written except for `last_used_at`, which is
/// bumped on cache hits and drives janitor eviction.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceFact {
    pub id: FactId,
    pub origin_address: String,
    pub origin: Coordinate,
    pub destination_address: String,
    pub destination: Coordinate,
    pub distance_meters: u32,
    pub duration_seconds: u32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    /// Only populated by a full directions fetch; matrix facts carry `None`.
    pub polyline: Option<Polyline>,
}

impl DistanceFact {
    pub fn estimate(&self) -> TravelEstimate {
        TravelEstimate {
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// A fact about to be persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDistanceFact {
    pub origin_address: String,
    pub origin: Coordinate,
    pub destination_address: String,
    pub destination: Coordinate,
    pub distance_meters: u32,
    pub duration_seconds: u32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub polyline: Option<Polyline>,
}

impl NewDistanceFact {
    /// A fact freshly measured by the distance collaborator.
    pub fn measured(
        origin: &Waypoint,
        destination: &Waypoint,
        estimate: TravelEstimate,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            origin_address: origin.address.clone(),
            origin: origin.coordinates,
            destination_address: destination.address.clone(),
            destination: destination.coordinates,
            distance_meters: estimate.distance_meters,
            duration_seconds: estimate.duration_seconds,
            created_at: at,
            last_used_at: at,
            polyline: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// TTL of the in-process tier.
    pub hot_ttl: Duration,
    /// Consecutive store failures before the persistent tier is skipped.
    pub gate_threshold: u32,
    /// How long the persistent tier stays skipped after the gate closes.
    pub gate_cooldown: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            hot_ttl: Duration::from_secs(24 * 3600),
            gate_threshold: 3,
            gate_cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HotEntry {
    estimate: TravelEstimate,
    inserted_at: Instant,
}

/// The two-tier pairwise distance cache.
pub struct DistanceCache<S: FactStore> {
    store: S,
    options: CacheOptions,
    hot: Mutex<HashMap<PairKey, HotEntry>>,
    gate: Mutex<FailureGate>,
}

impl<S: FactStore> DistanceCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, CacheOptions::default())
    }

    pub fn with_options(store: S, options: CacheOptions) -> Self {
        let gate = FailureGate::new(options.gate_threshold, options.gate_cooldown);
        Self {
            store,
            options,
            hot: Mutex::new(HashMap::new()),
            gate: Mutex::new(gate),
        }
    }

    pub fn store_backend(&self) -> &S {
        &self.store
    }

    /// Looks up a pair, hot tier first, then the persistent bounding-box
    /// query. `None` means miss; the caller decides whether to go live.
    pub fn lookup(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
    ) -> Option<TravelEstimate> {
        let key = PairKey::new(origin, destination);

        if let Some(estimate) = self.hot_lookup(&key) {
            tracing::debug!(origin = %origin.wire_format(), "distance cache hot hit");
            return Some(estimate);
        }

        if !self.gate.lock().ok()?.should_attempt() {
            tracing::debug!("persistent tier skipped while cooling down");
            return None;
        }

        let rows = match self
            .store
            .find_in_box(origin.tolerance_box(), destination.tolerance_box())
        {
            Ok(rows) => {
                if let Ok(mut gate) = self.gate.lock() {
                    gate.reset();
                }
                rows
            }
            Err(err) => {
                if let Ok(mut gate) = self.gate.lock() {
                    gate.record_failure();
                }
                tracing::warn!(error = %err, "fact store lookup failed, treating as miss");
                return None;
            }
        };

        // Multiple rows can match the box (duplicates are tolerated by the
        // data model); take the most-recently-used, highest id on ties.
        let fact = rows
            .into_iter()
            .max_by_key(|fact| (fact.last_used_at, fact.id))?;

        if let Err(err) = self.store.touch(fact.id, Utc::now()) {
            tracing::warn!(fact_id = fact.id.0, error = %err, "last-used refresh failed");
        }

        self.hot_insert(key, fact.estimate());
        tracing::debug!(fact_id = fact.id.0, "distance cache persistent hit");
        Some(fact.estimate())
    }

    /// Persists a fact and populates the hot tier.
    ///
    /// Errors are for the caller to report; they must not abort the route
    /// computation that produced the fact.
    pub fn store(&self, fact: NewDistanceFact) -> Result<(), StoreError> {
        let gate_open = self
            .gate
            .lock()
            .map(|gate| gate.should_attempt())
            .unwrap_or(true);
        if !gate_open {
            return Err(StoreError::Suppressed);
        }

        let key = PairKey::new(&fact.origin, &fact.destination);
        match self.store.insert(fact) {
            Ok(persisted) => {
                if let Ok(mut gate) = self.gate.lock() {
                    gate.reset();
                }
                self.hot_insert(key, persisted.estimate());
                Ok(())
            }
            Err(err) => {
                if let Ok(mut gate) = self.gate.lock() {
                    gate.record_failure();
                }
                Err(err)
            }
        }
    }

    /// Deletes facts whose `last_used_at` is older than the cutoff.
    ///
    /// Returns the number of evicted facts. Concurrent lookups are safe:
    /// an evicted fact is simply a future miss.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut evicted = 0;
        for id in self.store.find_older_than(cutoff)? {
            self.store.delete(id)?;
            evicted += 1;
        }
        Ok(evicted)
    }

    /// Trims the store down to `max_records`, least-recently-used first.
    pub fn evict_excess(&self, max_records: u64) -> Result<u64, StoreError> {
        let count = self.store.count()?;
        if count <= max_records {
            return Ok(0);
        }

        let mut evicted = 0;
        let excess = (count - max_records) as usize;
        for id in self.store.oldest(excess)? {
            self.store.delete(id)?;
            evicted += 1;
        }
        Ok(evicted)
    }

    fn hot_lookup(&self, key: &PairKey) -> Option<TravelEstimate> {
        let mut hot = self.hot.lock().ok()?;
        match hot.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.options.hot_ttl => {
                Some(entry.estimate)
            }
            Some(_) => {
                hot.remove(key);
                None
            }
            None => None,
        }
    }

    fn hot_insert(&self, key: PairKey, estimate: TravelEstimate) {
        if let Ok(mut hot) = self.hot.lock() {
            hot.insert(
                key,
                HotEntry {
                    estimate,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}
