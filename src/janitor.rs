//! Cache janitor: retention and capacity eviction for distance facts.
//!
//! Invoked on demand by an administrative trigger. Idempotent, and safe
//! to run concurrently with lookups: an evicted fact simply becomes a
//! future cache miss.

use chrono::{Duration, Utc};

use crate::cache::DistanceCache;
use crate::error::StoreError;
use crate::traits::FactStore;

#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Facts unused for longer than this are evicted.
    pub retention_days: i64,
    /// Hard cap on stored facts; the least-recently-used go first.
    pub max_records: u64,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            retention_days: 30,
            max_records: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupReport {
    pub evicted_by_age: u64,
    pub evicted_by_capacity: u64,
}

/// Runs both cleanup phases: age-based eviction, then capacity trimming.
pub fn run_cleanup<S: FactStore>(
    cache: &DistanceCache<S>,
    options: &CleanupOptions,
) -> Result<CleanupReport, StoreError> {
    let cutoff = Utc::now() - Duration::days(options.retention_days);
    let evicted_by_age = cache.evict_older_than(cutoff)?;
    let evicted_by_capacity = cache.evict_excess(options.max_records)?;

    let report = CleanupReport {
        evicted_by_age,
        evicted_by_capacity,
    };
    tracing::info!(
        evicted_by_age = report.evicted_by_age,
        evicted_by_capacity = report.evicted_by_capacity,
        "distance fact cleanup finished"
    );

    Ok(report)
}
