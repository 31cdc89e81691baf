use blocklocker_types::{ActorId, CoordinateKey, LockRecord};

use crate::error::StoreResult;

/// Exact-match store of lock records keyed by [`CoordinateKey`].
///
/// All implementations must satisfy these invariants:
/// - At most one record exists per key.
/// - A reader never observes a partially written record: `put` replaces the
///   whole value atomically.
/// - Failures to reach the backing medium are returned as
///   [`StoreError::Unavailable`](crate::StoreError::Unavailable), never
///   dropped.
/// - The store performs no authorization. Callers serialize conflicting
///   mutations themselves.
pub trait LockStore: Send + Sync {
    /// Look up the record for a key. No side effects.
    fn get(&self, key: &CoordinateKey) -> StoreResult<Option<LockRecord>>;

    /// Insert or overwrite the record for `record.key`.
    fn put(&self, record: LockRecord) -> StoreResult<()>;

    /// Remove the record for a key. Returns `true` if one existed.
    fn remove(&self, key: &CoordinateKey) -> StoreResult<bool>;

    /// Records owned by `owner`, as of the moment of the call.
    ///
    /// Each call takes a fresh snapshot; an [`OwnerScan`] already in hand is
    /// not affected by later mutations.
    fn scan_by_owner(&self, owner: &ActorId) -> StoreResult<OwnerScan>;

    /// Every record currently stored, in key order.
    fn records(&self) -> StoreResult<Vec<LockRecord>>;

    /// Drop every record.
    fn clear(&self) -> StoreResult<()>;

    /// Number of records currently stored.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a record exists for the key.
    fn contains(&self, key: &CoordinateKey) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Finite iterator over the records an owner held when the scan started.
#[derive(Debug)]
pub struct OwnerScan {
    inner: std::vec::IntoIter<LockRecord>,
}

impl OwnerScan {
    pub fn new(mut records: Vec<LockRecord>) -> Self {
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            inner: records.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for OwnerScan {
    type Item = LockRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for OwnerScan {}
