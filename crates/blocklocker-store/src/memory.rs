//! Concurrent in-memory lock store.
//!
//! [`InMemoryLockStore`] keeps every record in a sharded [`DashMap`]. Reads
//! and writes on keys in different shards never contend, and each entry is
//! replaced whole, so readers cannot see a torn record.

use dashmap::DashMap;
use tracing::trace;

use blocklocker_types::{ActorId, CoordinateKey, LockRecord};

use crate::error::StoreResult;
use crate::traits::{LockStore, OwnerScan};

/// A `DashMap`-backed implementation of [`LockStore`].
///
/// Data is lost when the store is dropped unless it was snapshotted through
/// a [`PersistenceAdapter`](crate::PersistenceAdapter) first.
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    records: DashMap<CoordinateKey, LockRecord>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-sized for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
        }
    }
}

impl LockStore for InMemoryLockStore {
    fn get(&self, key: &CoordinateKey) -> StoreResult<Option<LockRecord>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    fn put(&self, record: LockRecord) -> StoreResult<()> {
        trace!(key = %record.key, owner = %record.owner, "store put");
        self.records.insert(record.key.clone(), record);
        Ok(())
    }

    fn remove(&self, key: &CoordinateKey) -> StoreResult<bool> {
        trace!(key = %key, "store remove");
        Ok(self.records.remove(key).is_some())
    }

    fn scan_by_owner(&self, owner: &ActorId) -> StoreResult<OwnerScan> {
        let owned: Vec<LockRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().owner == *owner)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(OwnerScan::new(owned))
    }

    fn records(&self) -> StoreResult<Vec<LockRecord>> {
        let mut all: Vec<LockRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    fn clear(&self) -> StoreResult<()> {
        self.records.clear();
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklocker_types::{LockMode, WorldBounds};
    use chrono::Utc;

    fn key(x: i64) -> CoordinateKey {
        CoordinateKey::new("world", x, 64, 0, &WorldBounds::default()).unwrap()
    }

    fn record(x: i64, owner: ActorId) -> LockRecord {
        LockRecord::new(key(x), owner, LockMode::Private, Utc::now())
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryLockStore::new();
        assert!(store.get(&key(1)).unwrap().is_none());
        assert!(!store.contains(&key(1)).unwrap());
    }

    #[test]
    fn put_then_get() {
        let store = InMemoryLockStore::new();
        let owner = ActorId::random();
        store.put(record(1, owner)).unwrap();

        let read = store.get(&key(1)).unwrap().unwrap();
        assert_eq!(read.owner, owner);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn put_overwrites_existing_record() {
        let store = InMemoryLockStore::new();
        let first = ActorId::random();
        let second = ActorId::random();
        store.put(record(1, first)).unwrap();
        store.put(record(1, second)).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get(&key(1)).unwrap().unwrap().owner, second);
    }

    #[test]
    fn remove_reports_existence() {
        let store = InMemoryLockStore::new();
        store.put(record(1, ActorId::random())).unwrap();

        assert!(store.remove(&key(1)).unwrap());
        assert!(!store.remove(&key(1)).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn scan_by_owner_filters_and_sorts() {
        let store = InMemoryLockStore::new();
        let alice = ActorId::random();
        let bob = ActorId::random();
        store.put(record(3, alice)).unwrap();
        store.put(record(1, alice)).unwrap();
        store.put(record(2, bob)).unwrap();

        let xs: Vec<i64> = store
            .scan_by_owner(&alice)
            .unwrap()
            .map(|r| r.key.x())
            .collect();
        assert_eq!(xs, vec![1, 3]);
        assert_eq!(store.scan_by_owner(&bob).unwrap().len(), 1);
        assert_eq!(store.scan_by_owner(&ActorId::random()).unwrap().len(), 0);
    }

    #[test]
    fn scan_is_a_snapshot_and_restartable() {
        let store = InMemoryLockStore::new();
        let alice = ActorId::random();
        store.put(record(1, alice)).unwrap();

        let scan = store.scan_by_owner(&alice).unwrap();
        store.put(record(2, alice)).unwrap();

        // The earlier scan is unaffected; a new scan sees the new record.
        assert_eq!(scan.count(), 1);
        assert_eq!(store.scan_by_owner(&alice).unwrap().count(), 2);
    }

    #[test]
    fn records_and_clear() {
        let store = InMemoryLockStore::with_capacity(4);
        let owner = ActorId::random();
        for x in [5, 2, 9] {
            store.put(record(x, owner)).unwrap();
        }
        let xs: Vec<i64> = store.records().unwrap().iter().map(|r| r.key.x()).collect();
        assert_eq!(xs, vec![2, 5, 9]);

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }
}
