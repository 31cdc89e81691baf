//! Lock record storage for BlockLocker.
//!
//! The store is an exact-match key-value map from [`CoordinateKey`] to
//! [`LockRecord`]. It never evaluates access and never arbitrates
//! conflicting writers. All mutations are expected to come
//! through the registry, which serializes them per key.
//!
//! # Storage Backends
//!
//! All backends implement the [`LockStore`] trait:
//!
//! - [`InMemoryLockStore`] -- sharded `DashMap` store; the production backend
//!
//! # Persistence
//!
//! The in-memory store is made durable by periodically writing a
//! [snapshot](snapshot) through a [`PersistenceAdapter`]:
//!
//! - [`FileAdapter`] -- atomic file replacement on the local disk
//! - [`MemoryAdapter`] -- byte buffer for tests, with outage simulation
//!
//! [`CoordinateKey`]: blocklocker_types::CoordinateKey
//! [`LockRecord`]: blocklocker_types::LockRecord

pub mod adapter;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use adapter::{FileAdapter, MemoryAdapter, PersistenceAdapter};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryLockStore;
pub use snapshot::{decode_snapshot, encode_snapshot, SNAPSHOT_VERSION};
pub use traits::{LockStore, OwnerScan};
