//! Distance oracle client: cache-first pairwise lookups with retries.
//!
//! Wraps the paid distance-matrix and directions collaborators. Distances
//! consult the fact cache before going live; directions are only memoized
//! in-process for a short window, enough to collapse bursts of retries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::cache::{DistanceCache, NewDistanceFact};
use crate::error::PlannerError;
use crate::geo::PairKey;
use crate::retry::{self, RetryFailure, RetryPolicy};
use crate::traits::{
    DirectionsLeg, DirectionsProvider, DistanceProvider, FactStore, TravelEstimate, TravelOracle,
    Waypoint,
};

/// How long a directions result is memoized in-process.
const DIRECTIONS_MEMO_TTL: Duration = Duration::from_secs(15 * 60);

/// Cache-hit / live-call counters, for observability only.
#[derive(Debug, Default)]
pub struct OracleStats {
    cache_hits: AtomicU64,
    live_calls: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleStatsSnapshot {
    pub cache_hits: u64,
    pub live_calls: u64,
}

impl OracleStats {
    pub fn snapshot(&self) -> OracleStatsSnapshot {
        OracleStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            live_calls: self.live_calls.load(Ordering::Relaxed),
        }
    }
}

/// The pairwise distance/directions client consumed by the sequencer.
pub struct DistanceOracle<M, D, S: FactStore> {
    matrix: M,
    directions: D,
    cache: DistanceCache<S>,
    retry: RetryPolicy,
    stats: OracleStats,
    memo: Mutex<HashMap<PairKey, (Instant, DirectionsLeg)>>,
}

impl<M, D, S> DistanceOracle<M, D, S>
where
    M: DistanceProvider,
    D: DirectionsProvider,
    S: FactStore,
{
    pub fn new(matrix: M, directions: D, cache: DistanceCache<S>) -> Self {
        Self::with_retry(matrix, directions, cache, RetryPolicy::default())
    }

    pub fn with_retry(
        matrix: M,
        directions: D,
        cache: DistanceCache<S>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            matrix,
            directions,
            cache,
            retry,
            stats: OracleStats::default(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn stats(&self) -> OracleStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache(&self) -> &DistanceCache<S> {
        &self.cache
    }

    pub fn matrix_provider(&self) -> &M {
        &self.matrix
    }

    pub fn directions_provider(&self) -> &D {
        &self.directions
    }

    /// Pairwise distance/duration, cache first, live on miss.
    pub fn distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<TravelEstimate, PlannerError> {
        if let Some(estimate) = self
            .cache
            .lookup(&origin.coordinates, &destination.coordinates)
        {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(estimate);
        }

        let estimate = self.run_live(|_| {
            self.matrix
                .distance(origin.coordinates, destination.coordinates)
        })?;
        self.stats.live_calls.fetch_add(1, Ordering::Relaxed);

        // The estimate is already in hand; a cache write failure only costs
        // a future live call.
        let fact = NewDistanceFact::measured(origin, destination, estimate, Utc::now());
        if let Err(err) = self.cache.store(fact) {
            tracing::warn!(
                origin = %origin.coordinates.wire_format(),
                destination = %destination.coordinates.wire_format(),
                error = %err,
                "distance fact write failed"
            );
        }

        Ok(estimate)
    }

    /// Full leg directions. Memoized in-process for fifteen minutes; not
    /// persisted as facts (polylines are heavy).
    pub fn directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<DirectionsLeg, PlannerError> {
        let key = PairKey::new(&origin.coordinates, &destination.coordinates);

        if let Ok(mut memo) = self.memo.lock() {
            match memo.get(&key) {
                Some((at, leg)) if at.elapsed() < DIRECTIONS_MEMO_TTL => {
                    return Ok(leg.clone());
                }
                Some(_) => {
                    memo.remove(&key);
                }
                None => {}
            }
        }

        let leg = self.run_live(|_| {
            self.directions
                .directions(origin.coordinates, destination.coordinates)
        })?;

        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, (Instant::now(), leg.clone()));
        }

        Ok(leg)
    }

    fn run_live<T>(
        &self,
        op: impl FnMut(u32) -> Result<T, PlannerError>,
    ) -> Result<T, PlannerError> {
        match retry::run(&self.retry, op) {
            Ok(value) => Ok(value),
            Err(RetryFailure::Fatal(err)) => Err(err),
            Err(RetryFailure::Exhausted { attempts, last }) => {
                Err(PlannerError::DistanceUnavailable {
                    attempts,
                    last_error: last.to_string(),
                })
            }
        }
    }
}

impl<M, D, S> TravelOracle for DistanceOracle<M, D, S>
where
    M: DistanceProvider,
    D: DirectionsProvider,
    S: FactStore,
{
    fn travel_estimate(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<TravelEstimate, PlannerError> {
        self.distance(origin, destination)
    }

    fn leg_directions(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<DirectionsLeg, PlannerError> {
        self.directions(origin, destination)
    }
}
