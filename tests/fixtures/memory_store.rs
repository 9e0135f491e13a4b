//! In-memory fact store for tests: call counters plus a failure switch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use delivery_planner::cache::{DistanceFact, FactId, NewDistanceFact};
use delivery_planner::error::StoreError;
use delivery_planner::geo::GeoBox;
use delivery_planner::traits::FactStore;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<DistanceFact>>,
    next_id: AtomicU64,
    pub finds: AtomicU64,
    pub inserts: AtomicU64,
    pub deletes: AtomicU64,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<DistanceFact> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, fact: NewDistanceFact) -> FactId {
        self.insert(fact).unwrap().id
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Http("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

impl FactStore for MemoryStore {
    fn find_in_box(
        &self,
        origin: GeoBox,
        destination: GeoBox,
    ) -> Result<Vec<DistanceFact>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|fact| origin.contains(&fact.origin) && destination.contains(&fact.destination))
            .cloned()
            .collect())
    }

    fn insert(&self, fact: NewDistanceFact) -> Result<DistanceFact, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let id = FactId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let persisted = DistanceFact {
            id,
            origin_address: fact.origin_address,
            origin: fact.origin,
            destination_address: fact.destination_address,
            destination: fact.destination,
            distance_meters: fact.distance_meters,
            duration_seconds: fact.duration_seconds,
            created_at: fact.created_at,
            last_used_at: fact.last_used_at,
            polyline: fact.polyline,
        };
        self.rows.lock().unwrap().push(persisted.clone());
        Ok(persisted)
    }

    fn touch(&self, id: FactId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(fact) = rows.iter_mut().find(|fact| fact.id == id) {
            fact.last_used_at = at;
        }
        Ok(())
    }

    fn delete(&self, id: FactId) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.rows.lock().unwrap().retain(|fact| fact.id != id);
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    fn find_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<FactId>, StoreError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|fact| fact.last_used_at < cutoff)
            .map(|fact| fact.id)
            .collect())
    }

    fn oldest(&self, limit: usize) -> Result<Vec<FactId>, StoreError> {
        self.check()?;
        let mut rows: Vec<_> = self.rows.lock().unwrap().clone();
        rows.sort_by_key(|fact| (fact.last_used_at, fact.id));
        Ok(rows.into_iter().take(limit).map(|fact| fact.id).collect())
    }
}
