use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use blocklocker_access::evaluate;
use blocklocker_store::{
    decode_snapshot, encode_snapshot, InMemoryLockStore, LockStore, MemoryAdapter,
    PersistenceAdapter,
};
use blocklocker_types::{
    AccessDecision, AccessReason, ActionKind, ActorId, CoordinateKey, LockMode, LockRecord,
};

use crate::config::RegistryConfig;
use crate::error::{LockError, Result};
use crate::key_lock::KeyLockTable;

/// Prune idle key mutexes after this many acquisitions.
const CLEANUP_EVERY: usize = 4096;

/// Concurrency-safe façade over the lock store.
///
/// Every mutating operation runs inside the critical section of its key, so
/// operations on the same key are totally ordered while operations on
/// different keys run independently. Access checks do not take the critical
/// section; they read the latest committed record.
pub struct Registry<S: LockStore = InMemoryLockStore> {
    store: S,
    adapter: Arc<dyn PersistenceAdapter>,
    locks: KeyLockTable,
    config: RegistryConfig,
    /// Bumped after every committed mutation.
    generation: AtomicU64,
    /// Generation captured by the last successful flush.
    persisted: AtomicU64,
    acquisitions: AtomicUsize,
    /// Serializes flushes so an older snapshot never overwrites a newer one.
    flush_lock: Mutex<()>,
}

impl Registry<InMemoryLockStore> {
    /// An empty registry backed by memory only. For tests and demos.
    pub fn in_memory(config: RegistryConfig) -> Result<Self> {
        Self::new(
            InMemoryLockStore::new(),
            Arc::new(MemoryAdapter::new()),
            config,
        )
    }
}

impl<S: LockStore> Registry<S> {
    /// Build a registry without loading anything from the adapter.
    pub fn new(store: S, adapter: Arc<dyn PersistenceAdapter>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            adapter,
            locks: KeyLockTable::new(config.key_lock_shards),
            config,
            generation: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            acquisitions: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
        })
    }

    /// Build a registry and load the adapter's last snapshot into `store`.
    ///
    /// Fails with [`LockError::StoreUnavailable`] if the adapter cannot be
    /// read. Starting empty in that case would erase every protection on
    /// the next flush.
    pub fn open(store: S, adapter: Arc<dyn PersistenceAdapter>, config: RegistryConfig) -> Result<Self> {
        let registry = Self::new(store, adapter, config)?;
        match registry.adapter.load()? {
            Some(bytes) => {
                let loaded = registry.load_snapshot(&bytes)?;
                // What was just read is by definition what is persisted.
                let current = registry.generation.load(Ordering::SeqCst);
                registry.persisted.store(current, Ordering::SeqCst);
                info!(records = loaded, "loaded protected blocks");
            }
            None => info!("no snapshot found, starting with an empty registry"),
        }
        Ok(registry)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Build a key for this registry's world bounds.
    pub fn key(&self, world: &str, x: i64, y: i32, z: i64) -> Result<CoordinateKey> {
        Ok(CoordinateKey::new(world, x, y, z, &self.config.bounds)?)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Lock `key` for `actor` with the given mode.
    ///
    /// Fails with [`LockError::AlreadyLocked`] if someone else owns it. If
    /// `actor` already owns it, only the mode changes; the trust list and
    /// creation time are kept.
    pub fn lock(&self, actor: ActorId, key: &CoordinateKey, mode: LockMode) -> Result<LockRecord> {
        self.lock_with_name(actor, None, key, mode)
    }

    /// [`Self::lock`], recording the owner's display name.
    pub fn lock_named(
        &self,
        actor: ActorId,
        owner_name: &str,
        key: &CoordinateKey,
        mode: LockMode,
    ) -> Result<LockRecord> {
        self.lock_with_name(actor, Some(owner_name), key, mode)
    }

    /// [`Self::lock`] using the configured default mode.
    pub fn lock_default(&self, actor: ActorId, key: &CoordinateKey) -> Result<LockRecord> {
        self.lock(actor, key, self.config.default_mode)
    }

    fn lock_with_name(
        &self,
        actor: ActorId,
        owner_name: Option<&str>,
        key: &CoordinateKey,
        mode: LockMode,
    ) -> Result<LockRecord> {
        self.check_key(key)?;
        self.with_key(key, || {
            let now = Utc::now();
            let record = match self.store.get(key)? {
                Some(existing) if !existing.is_owner(&actor) => {
                    debug!(key = %key, actor = %actor, owner = %existing.owner, "lock refused");
                    return Err(LockError::AlreadyLocked {
                        key: key.clone(),
                        owner: existing.owner,
                    });
                }
                Some(mut existing) => {
                    existing.mode = mode;
                    if let Some(name) = owner_name {
                        existing.owner_name = Some(name.to_string());
                    }
                    existing.touch(now);
                    existing
                }
                None => {
                    let record = LockRecord::new(key.clone(), actor, mode, now);
                    match owner_name {
                        Some(name) => record.with_owner_name(name),
                        None => record,
                    }
                }
            };
            self.commit(record.clone())?;
            debug!(key = %key, actor = %actor, %mode, "locked");
            Ok(record)
        })
    }

    /// Remove the lock on `key`. Only the owner may do this.
    pub fn unlock(&self, actor: ActorId, key: &CoordinateKey) -> Result<()> {
        self.with_key(key, || {
            self.owned_record(actor, key)?;
            self.store.remove(key)?;
            self.bump();
            debug!(key = %key, actor = %actor, "unlocked");
            Ok(())
        })
    }

    /// Edit the trust list of `key`. Only the owner may do this.
    ///
    /// Removals are applied before additions. The owner is never added to
    /// its own trust list. If the result would exceed
    /// `max_trusted_per_lock`, nothing changes and
    /// [`LockError::TrustLimitExceeded`] is returned.
    pub fn update_trust<A, R>(&self, actor: ActorId, key: &CoordinateKey, add: A, remove: R) -> Result<LockRecord>
    where
        A: IntoIterator<Item = ActorId>,
        R: IntoIterator<Item = ActorId>,
    {
        self.with_key(key, || {
            let record = self.owned_record(actor, key)?;
            let record = self.apply_trust(record, add, remove)?;
            debug!(key = %key, actor = %actor, trusted = record.trusted.len(), "trust updated");
            Ok(record)
        })
    }

    /// Change the mode of `key`. Only the owner may do this.
    pub fn set_mode(&self, actor: ActorId, key: &CoordinateKey, mode: LockMode) -> Result<LockRecord> {
        self.with_key(key, || {
            let record = self.owned_record(actor, key)?;
            let record = self.apply_mode(record, mode)?;
            debug!(key = %key, actor = %actor, %mode, "mode changed");
            Ok(record)
        })
    }

    /// Hand the lock on `key` to `new_owner`. Only the owner may do this.
    ///
    /// The new owner is dropped from the trust list and the recorded display
    /// name is cleared, since it named the previous owner.
    pub fn transfer_ownership(&self, actor: ActorId, key: &CoordinateKey, new_owner: ActorId) -> Result<LockRecord> {
        self.with_key(key, || {
            let mut record = self.owned_record(actor, key)?;
            if new_owner == actor {
                return Ok(record);
            }
            record.owner = new_owner;
            record.owner_name = None;
            record.trusted.remove(&new_owner);
            record.touch(Utc::now());
            self.commit(record.clone())?;
            debug!(key = %key, from = %actor, to = %new_owner, "ownership transferred");
            Ok(record)
        })
    }

    /// Remove any lock on `key` regardless of owner. Returns `true` if a
    /// lock existed.
    pub fn admin_unlock(&self, key: &CoordinateKey) -> Result<bool> {
        self.with_key(key, || {
            let existed = self.store.remove(key)?;
            if existed {
                self.bump();
                info!(key = %key, "lock removed by administrator");
            }
            Ok(existed)
        })
    }

    /// [`Self::set_mode`] without the ownership check.
    pub fn admin_set_mode(&self, key: &CoordinateKey, mode: LockMode) -> Result<LockRecord> {
        self.with_key(key, || {
            let record = self.existing_record(key)?;
            let record = self.apply_mode(record, mode)?;
            info!(key = %key, %mode, "mode set by administrator");
            Ok(record)
        })
    }

    /// [`Self::update_trust`] without the ownership check. The trust limit
    /// still applies.
    pub fn admin_update_trust<A, R>(&self, key: &CoordinateKey, add: A, remove: R) -> Result<LockRecord>
    where
        A: IntoIterator<Item = ActorId>,
        R: IntoIterator<Item = ActorId>,
    {
        self.with_key(key, || {
            let record = self.existing_record(key)?;
            let record = self.apply_trust(record, add, remove)?;
            info!(key = %key, trusted = record.trusted.len(), "trust set by administrator");
            Ok(record)
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Decide whether `actor` may perform `action` on `key`.
    ///
    /// If the store cannot be read the action is denied with
    /// [`AccessReason::StoreUnavailable`].
    pub fn check_access(&self, actor: ActorId, key: &CoordinateKey, action: ActionKind) -> AccessDecision {
        match self.try_check_access(actor, key, action) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(key = %key, actor = %actor, error = %err, "access check failed, denying");
                AccessDecision::deny(AccessReason::StoreUnavailable)
            }
        }
    }

    /// [`Self::check_access`], surfacing store failures instead of denying.
    pub fn try_check_access(&self, actor: ActorId, key: &CoordinateKey, action: ActionKind) -> Result<AccessDecision> {
        let record = self.store.get(key)?;
        let decision = evaluate(&actor, record.as_ref(), action);
        debug!(key = %key, actor = %actor, ?action, %decision, "access checked");
        Ok(decision)
    }

    /// The current lock record for `key`, if any.
    pub fn get(&self, key: &CoordinateKey) -> Result<Option<LockRecord>> {
        Ok(self.store.get(key)?)
    }

    /// Every lock `owner` holds right now, in key order.
    pub fn locks_owned_by(&self, owner: ActorId) -> Result<Vec<LockRecord>> {
        Ok(self.store.scan_by_owner(&owner)?.collect())
    }

    /// Number of protected blocks.
    pub fn len(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.is_empty()?)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serialize every record into a snapshot.
    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        let records = self.store.records()?;
        Ok(encode_snapshot(&records)?)
    }

    /// Replace the registry contents with a snapshot. Returns the number of
    /// records loaded.
    ///
    /// Safe while players are acting. Every snapshot record is written
    /// inside its key's critical section, then records present before the
    /// load but absent from the snapshot are removed the same way. A key
    /// locked both before and after the load never reads as unprotected,
    /// and locks created on other keys while the load runs are kept.
    ///
    /// When a key appears more than once, the last entry wins. Records
    /// whose keys fall outside the configured bounds are skipped with a
    /// warning. A snapshot that fails to decode changes nothing.
    pub fn load_snapshot(&self, bytes: &[u8]) -> Result<usize> {
        let decoded = decode_snapshot(bytes)?;

        let mut incoming: HashMap<CoordinateKey, LockRecord> = HashMap::with_capacity(decoded.len());
        let mut skipped = 0usize;
        for record in decoded {
            if let Err(err) = record.key.check_bounds(&self.config.bounds) {
                warn!(key = %record.key, error = %err, "skipping out-of-bounds record");
                skipped += 1;
                continue;
            }
            incoming.insert(record.key.clone(), record);
        }

        let before = self.store.records()?;

        for (key, record) in &incoming {
            self.with_key(key, || self.commit(record.clone()))?;
        }

        let mut removed = 0usize;
        for stale in before.iter().filter(|r| !incoming.contains_key(&r.key)) {
            let key = &stale.key;
            self.with_key(key, || {
                // Changed since the load started: a newer mutation, keep it.
                if self.store.get(key)?.as_ref() == Some(stale) && self.store.remove(key)? {
                    self.bump();
                    removed += 1;
                }
                Ok(())
            })?;
        }

        let loaded = incoming.len();
        debug!(loaded, skipped, removed, "snapshot applied");
        Ok(loaded)
    }

    /// Whether there are mutations not yet written by [`Self::flush`].
    pub fn is_dirty(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.persisted.load(Ordering::SeqCst)
    }

    /// Write a snapshot through the adapter if anything changed since the
    /// last flush. Returns `true` if a snapshot was written.
    ///
    /// On failure the registry stays dirty and the next flush retries.
    pub fn flush(&self) -> Result<bool> {
        let _flush = self.flush_lock.lock();
        let generation = self.generation.load(Ordering::SeqCst);
        if generation == self.persisted.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let bytes = self.save_snapshot()?;
        self.adapter.save(&bytes)?;
        self.persisted.store(generation, Ordering::SeqCst);
        info!(bytes = bytes.len(), "flushed protected blocks");
        Ok(true)
    }

    /// Final flush at plugin stop.
    pub fn shutdown(&self) -> Result<()> {
        self.flush()?;
        info!("registry shut down");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_key(&self, key: &CoordinateKey) -> Result<()> {
        Ok(key.check_bounds(&self.config.bounds)?)
    }

    /// Run `f` inside the critical section of `key`.
    fn with_key<T>(&self, key: &CoordinateKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let result = {
            let _guard = self.locks.acquire(key);
            f()
        };
        if self.acquisitions.fetch_add(1, Ordering::Relaxed) % CLEANUP_EVERY == CLEANUP_EVERY - 1 {
            self.locks.cleanup();
        }
        result
    }

    fn existing_record(&self, key: &CoordinateKey) -> Result<LockRecord> {
        self.store
            .get(key)?
            .ok_or_else(|| LockError::NotFound { key: key.clone() })
    }

    /// The record for `key`, provided `actor` owns it.
    fn owned_record(&self, actor: ActorId, key: &CoordinateKey) -> Result<LockRecord> {
        let record = self.existing_record(key)?;
        if !record.is_owner(&actor) {
            return Err(LockError::NotOwner {
                key: key.clone(),
                owner: record.owner,
            });
        }
        Ok(record)
    }

    /// Edit the trust list of `record` and commit it. Call inside the key's
    /// critical section.
    fn apply_trust<A, R>(&self, mut record: LockRecord, add: A, remove: R) -> Result<LockRecord>
    where
        A: IntoIterator<Item = ActorId>,
        R: IntoIterator<Item = ActorId>,
    {
        let mut trusted = record.trusted.clone();
        for id in remove {
            trusted.remove(&id);
        }
        trusted.extend(add.into_iter().filter(|id| *id != record.owner));

        // A list already over a since-lowered limit may still shrink.
        let limit = self.config.max_trusted_per_lock;
        if trusted.len() > limit && trusted.len() > record.trusted.len() {
            return Err(LockError::TrustLimitExceeded {
                key: record.key.clone(),
                limit,
            });
        }
        if trusted == record.trusted {
            return Ok(record);
        }

        record.trusted = trusted;
        record.touch(Utc::now());
        self.commit(record.clone())?;
        Ok(record)
    }

    /// Set the mode of `record` and commit it. Call inside the key's
    /// critical section.
    fn apply_mode(&self, mut record: LockRecord, mode: LockMode) -> Result<LockRecord> {
        if record.mode == mode {
            return Ok(record);
        }
        record.mode = mode;
        record.touch(Utc::now());
        self.commit(record.clone())?;
        Ok(record)
    }

    fn commit(&self, record: LockRecord) -> Result<()> {
        self.store.put(record)?;
        self.bump();
        Ok(())
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
