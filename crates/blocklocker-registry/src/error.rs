//! Error types for registry operations.

use blocklocker_store::StoreError;
use blocklocker_types::{ActorId, CoordinateKey, KeyError};
use thiserror::Error;

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// Everything except [`LockError::StoreUnavailable`] is an expected,
/// player-facing condition.
#[derive(Debug, Error)]
pub enum LockError {
    /// The position is not a valid key in this world.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Another actor already owns a lock on this position.
    #[error("{key} is already locked by {owner}")]
    AlreadyLocked { key: CoordinateKey, owner: ActorId },

    /// The actor does not own the lock it tried to change.
    #[error("{key} is owned by {owner}")]
    NotOwner { key: CoordinateKey, owner: ActorId },

    /// There is no lock on this position.
    #[error("no lock at {key}")]
    NotFound { key: CoordinateKey },

    /// The trust list would grow past the configured maximum.
    #[error("trust list for {key} would exceed the limit of {limit}")]
    TrustLimitExceeded { key: CoordinateKey, limit: usize },

    /// The store or its persistence adapter could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A snapshot could not be encoded or decoded.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The registry configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LockError {
    /// Whether the caller must treat this as an infrastructure failure
    /// rather than a normal refusal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<KeyError> for LockError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidCoordinate { reason } => Self::InvalidCoordinate(reason),
        }
    }
}

impl From<StoreError> for LockError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Snapshot(msg) | StoreError::Serialization(msg) => Self::InvalidSnapshot(msg),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

/// Errors from loading or validating a [`RegistryConfig`](crate::RegistryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Convenience alias for registry operations.
pub type Result<T> = std::result::Result<T, LockError>;
