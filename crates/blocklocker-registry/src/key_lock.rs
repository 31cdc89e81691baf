//! Striped table of per-key mutexes.
//!
//! Keys hash to one of N shards. A shard is a small map from key to an
//! `Arc<Mutex<()>>`; the shard lock is held only long enough to find or
//! insert the key's mutex, never while waiting for it. Two operations on
//! different keys therefore never wait on each other's critical sections,
//! even when their keys land in the same shard.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use tracing::trace;

use blocklocker_types::CoordinateKey;

type Slot = Arc<Mutex<()>>;
type Shard = Mutex<HashMap<CoordinateKey, Slot>>;

/// Mutual exclusion per [`CoordinateKey`].
pub struct KeyLockTable {
    random_state: RandomState,
    shards: Vec<Shard>,
}

/// Holds the critical section for one key until dropped.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl KeyLockTable {
    /// Create a table with `num_shards` shards (at least one).
    pub fn new(num_shards: usize) -> Self {
        let num_shards = num_shards.max(1);
        Self {
            random_state: RandomState::new(),
            shards: (0..num_shards).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, key: &CoordinateKey) -> &Shard {
        let hash = self.random_state.hash_one(key);
        // Modulo of a u64 by a usize length always fits in usize.
        let idx = (hash % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    fn slot(&self, key: &CoordinateKey) -> Slot {
        let mut shard = self.shard_for(key).lock();
        shard
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Block until the critical section for `key` is free, then take it.
    pub fn acquire(&self, key: &CoordinateKey) -> KeyGuard {
        let slot = self.slot(key);
        KeyGuard {
            _guard: slot.lock_arc(),
        }
    }

    /// Take the critical section for `key` only if nobody holds it.
    pub fn try_acquire(&self, key: &CoordinateKey) -> Option<KeyGuard> {
        let slot = self.slot(key);
        slot.try_lock_arc().map(|guard| KeyGuard { _guard: guard })
    }

    /// Drop mutexes nobody holds or waits for.
    ///
    /// A slot whose only reference is the table itself is idle: every holder
    /// and every waiter keeps its own `Arc`, and new references are only
    /// handed out under the shard lock this method holds. Shards that are
    /// busy are skipped. Returns the number of slots removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let Some(mut map) = shard.try_lock() else {
                continue;
            };
            let before = map.len();
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            removed += before - map.len();
        }
        if removed > 0 {
            trace!(removed, "pruned idle key locks");
        }
        removed
    }

    /// Number of key mutexes currently allocated across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl std::fmt::Debug for KeyLockTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLockTable")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use blocklocker_types::WorldBounds;

    fn key(x: i64) -> CoordinateKey {
        CoordinateKey::new("world", x, 64, 0, &WorldBounds::default()).unwrap()
    }

    #[test]
    fn same_key_is_exclusive() {
        let table = KeyLockTable::new(4);
        let held = table.try_acquire(&key(1));
        assert!(held.is_some());
        assert!(table.try_acquire(&key(1)).is_none());
        drop(held);
        assert!(table.try_acquire(&key(1)).is_some());
    }

    #[test]
    fn different_keys_in_one_shard_do_not_block() {
        // A single shard forces every key to share it.
        let table = KeyLockTable::new(1);
        let _a = table.acquire(&key(1));
        let b = table.try_acquire(&key(2));
        assert!(b.is_some());
    }

    #[test]
    fn zero_shards_is_clamped() {
        assert_eq!(KeyLockTable::new(0).shard_count(), 1);
    }

    #[test]
    fn cleanup_keeps_held_slots() {
        let table = KeyLockTable::new(2);
        let held = table.acquire(&key(1));
        drop(table.acquire(&key(2)));
        assert_eq!(table.len(), 2);

        assert_eq!(table.cleanup(), 1);
        assert_eq!(table.len(), 1);

        drop(held);
        assert_eq!(table.cleanup(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn critical_sections_on_one_key_never_overlap() {
        let table = Arc::new(KeyLockTable::new(8));
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..50 {
                        let _guard = table.acquire(&key(7));
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn waiter_survives_cleanup() {
        let table = Arc::new(KeyLockTable::new(1));
        let held = table.acquire(&key(1));

        let waiter = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let _guard = table.acquire(&key(1));
            })
        };
        thread::sleep(Duration::from_millis(20));
        table.cleanup();
        drop(held);
        waiter.join().unwrap();
    }
}
