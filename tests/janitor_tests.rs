//! Janitor tests: retention, capacity cap, and idempotence.

mod fixtures;

use chrono::{Duration, Utc};
use delivery_planner::cache::{DistanceCache, NewDistanceFact};
use delivery_planner::geo::Coordinate;
use delivery_planner::janitor::{run_cleanup, CleanupOptions};

use fixtures::MemoryStore;

fn fact_used_days_ago(days: i64, lng: f64) -> NewDistanceFact {
    let at = Utc::now() - Duration::days(days);
    NewDistanceFact {
        origin_address: "origin".to_string(),
        origin: Coordinate::new(-25.4284, lng),
        destination_address: "destination".to_string(),
        destination: Coordinate::new(-25.4430, -49.2870),
        distance_meters: 1000,
        duration_seconds: 100,
        created_at: at,
        last_used_at: at,
        polyline: None,
    }
}

fn seeded_cache(facts: &[NewDistanceFact]) -> DistanceCache<MemoryStore> {
    let store = MemoryStore::default();
    for fact in facts {
        store.seed(fact.clone());
    }
    DistanceCache::new(store)
}

#[test]
fn evicts_facts_older_than_retention() {
    let cache = seeded_cache(&[
        fact_used_days_ago(40, -49.27),
        fact_used_days_ago(35, -49.28),
        fact_used_days_ago(5, -49.29),
    ]);

    let report = run_cleanup(&cache, &CleanupOptions::default()).unwrap();

    assert_eq!(report.evicted_by_age, 2);
    assert_eq!(report.evicted_by_capacity, 0);
    assert_eq!(cache.store_backend().rows().len(), 1);
}

#[test]
fn trims_to_capacity_oldest_first() {
    let cache = seeded_cache(&[
        fact_used_days_ago(20, -49.27),
        fact_used_days_ago(10, -49.28),
        fact_used_days_ago(1, -49.29),
    ]);

    let options = CleanupOptions {
        retention_days: 30,
        max_records: 2,
    };
    let report = run_cleanup(&cache, &options).unwrap();

    assert_eq!(report.evicted_by_age, 0);
    assert_eq!(report.evicted_by_capacity, 1);
    let remaining = cache.store_backend().rows();
    assert_eq!(remaining.len(), 2);
    // The 20-day-old fact was the least recently used.
    assert!(remaining
        .iter()
        .all(|fact| fact.last_used_at > Utc::now() - Duration::days(15)));
}

#[test]
fn age_eviction_runs_before_capacity_check() {
    let cache = seeded_cache(&[
        fact_used_days_ago(40, -49.27),
        fact_used_days_ago(41, -49.28),
        fact_used_days_ago(2, -49.29),
    ]);

    // Age eviction alone brings the store under the cap.
    let options = CleanupOptions {
        retention_days: 30,
        max_records: 2,
    };
    let report = run_cleanup(&cache, &options).unwrap();

    assert_eq!(report.evicted_by_age, 2);
    assert_eq!(report.evicted_by_capacity, 0);
}

#[test]
fn cleanup_is_idempotent() {
    let cache = seeded_cache(&[
        fact_used_days_ago(40, -49.27),
        fact_used_days_ago(10, -49.28),
        fact_used_days_ago(9, -49.29),
        fact_used_days_ago(8, -49.30),
    ]);

    let options = CleanupOptions {
        retention_days: 30,
        max_records: 3,
    };
    let first = run_cleanup(&cache, &options).unwrap();
    assert_eq!(first.evicted_by_age + first.evicted_by_capacity, 1);

    let second = run_cleanup(&cache, &options).unwrap();
    assert_eq!(second.evicted_by_age, 0);
    assert_eq!(second.evicted_by_capacity, 0);
}

#[test]
fn empty_store_reports_zero_evictions() {
    let cache = seeded_cache(&[]);
    let report = run_cleanup(&cache, &CleanupOptions::default()).unwrap();
    assert_eq!(report.evicted_by_age, 0);
    assert_eq!(report.evicted_by_capacity, 0);
}

#[test]
fn store_failure_propagates_to_the_administrative_caller() {
    let cache = seeded_cache(&[fact_used_days_ago(40, -49.27)]);
    cache.store_backend().set_failing(true);

    assert!(run_cleanup(&cache, &CleanupOptions::default()).is_err());
}
