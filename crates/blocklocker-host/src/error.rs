use thiserror::Error;

/// Errors from arming an [`Intent`](crate::Intent).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// A trust, untrust, or transfer intent named the player themselves.
    #[error("a player cannot target themselves")]
    SelfTarget,
}
