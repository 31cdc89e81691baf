use std::fmt;

use serde::{Deserialize, Serialize};

/// The in-world action an actor is attempting on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Breaking (destroying) the block.
    Break,
    /// Placing a block against or into the protected position.
    Place,
    /// Opening or otherwise interacting with the block.
    Open,
}

/// Why an [`AccessDecision`] came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessReason {
    /// The actor owns the lock.
    Owner,
    /// The actor is on the trust list of a shared lock.
    Trusted,
    /// The position is unprotected or publicly locked.
    Public,
    /// The position is locked and the actor has no access.
    DeniedLocked,
    /// The action required a lock and there is none. Evaluation of an
    /// unprotected position yields [`AccessReason::Public`] instead.
    NotFound,
    /// The store could not be consulted; denied fail-closed.
    StoreUnavailable,
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Owner => "owner",
            Self::Trusted => "trusted",
            Self::Public => "public",
            Self::DeniedLocked => "denied: locked",
            Self::NotFound => "not found",
            Self::StoreUnavailable => "denied: store unavailable",
        };
        f.write_str(s)
    }
}

/// The outcome of evaluating one action. Transient; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub fn allow(reason: AccessReason) -> Self {
        Self {
            allow: true,
            reason,
        }
    }

    pub fn deny(reason: AccessReason) -> Self {
        Self {
            allow: false,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allow
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allow { "allow" } else { "deny" };
        write!(f, "{verdict} ({})", self.reason)
    }
}
