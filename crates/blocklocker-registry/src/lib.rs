//! Lock registry service for BlockLocker.
//!
//! The [`Registry`] is the only component allowed to mutate the lock store.
//! It coordinates lookups, creates, trust edits, transfers, and deletes so
//! that conflicting operations on the same block are serialized while
//! operations on different blocks proceed in parallel.
//!
//! # Architecture
//!
//! - **Per-key critical sections**: every mutation holds the mutex for its
//!   [`CoordinateKey`](blocklocker_types::CoordinateKey) from a
//!   [`KeyLockTable`]. There is no global lock.
//! - **Lock-free reads**: access checks read the store directly and never
//!   wait on a mutation in progress.
//! - **Fail-closed**: if the store cannot be consulted, access is denied.
//! - **Lifecycle**: [`Registry::open`] loads the last snapshot,
//!   [`spawn_flusher`] persists periodically, and [`Registry::shutdown`]
//!   performs the final flush.
//!
//! # Modules
//!
//! - [`config`] -- [`RegistryConfig`] and its TOML loader
//! - [`error`] -- [`LockError`] and [`ConfigError`]
//! - [`key_lock`] -- the striped per-key mutex table
//! - [`registry`] -- the [`Registry`] service
//! - [`flusher`] -- background snapshot task

pub mod config;
pub mod error;
pub mod flusher;
pub mod key_lock;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{ConfigError, LockError, Result};
pub use flusher::{spawn_flusher, spawn_flusher_every, FlushHandle};
pub use key_lock::{KeyGuard, KeyLockTable};
pub use registry::Registry;
