//! Foundation types for BlockLocker.
//!
//! This crate provides the value types shared by every other BlockLocker
//! crate: the canonical identity of a protectable block, the identity of the
//! actor acting on it, the protection record itself, and the transient
//! decision produced when an action is evaluated.
//!
//! # Key Types
//!
//! - [`CoordinateKey`] -- Canonical block position within a named world
//! - [`WorldBounds`] -- Host-declared limits that every key must respect
//! - [`ActorId`] -- UUID identity of a player or other acting entity
//! - [`LockRecord`] -- Owner, mode, and trust list for one protected block
//! - [`LockMode`] -- Private / Shared / Public visibility policy
//! - [`ActionKind`] -- The protected in-world action being attempted
//! - [`AccessDecision`] -- Allow/deny outcome with its reason

pub mod access;
pub mod actor;
pub mod error;
pub mod key;
pub mod record;

pub use access::{AccessDecision, AccessReason, ActionKind};
pub use actor::ActorId;
pub use error::KeyError;
pub use key::{CoordinateKey, WorldBounds};
pub use record::{LockMode, LockRecord};
