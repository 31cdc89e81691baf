//! Per-player pending intents.
//!
//! A command such as `/lock` does not take a position; it arms an intent and
//! the player's next block interaction supplies the target.

use dashmap::DashMap;
use tracing::debug;

use blocklocker_types::{ActorId, LockMode};

use crate::error::IntentError;

/// What the next block interaction of a player should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Lock the block. `None` uses the configured default mode.
    Lock { mode: Option<LockMode> },
    /// Remove the player's lock from the block.
    Unlock,
    /// Add an actor to the block's trust list.
    Trust(ActorId),
    /// Remove an actor from the block's trust list.
    Untrust(ActorId),
    /// Change the mode of the player's lock.
    SetMode(LockMode),
    /// Hand the player's lock to another actor.
    Transfer(ActorId),
    /// Report who owns the block.
    Info,
}

impl Intent {
    fn target(&self) -> Option<ActorId> {
        match self {
            Self::Trust(id) | Self::Untrust(id) | Self::Transfer(id) => Some(*id),
            _ => None,
        }
    }
}

/// At most one pending [`Intent`] per player.
#[derive(Debug, Default)]
pub struct IntentBook {
    pending: DashMap<ActorId, Intent>,
}

impl IntentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `intent` for `actor`, replacing and returning any earlier one.
    pub fn arm(&self, actor: ActorId, intent: Intent) -> Result<Option<Intent>, IntentError> {
        if intent.target() == Some(actor) {
            return Err(IntentError::SelfTarget);
        }
        debug!(actor = %actor, ?intent, "intent armed");
        Ok(self.pending.insert(actor, intent))
    }

    /// Remove and return the pending intent of `actor`.
    pub fn take(&self, actor: &ActorId) -> Option<Intent> {
        self.pending.remove(actor).map(|(_, intent)| intent)
    }

    pub fn peek(&self, actor: &ActorId) -> Option<Intent> {
        self.pending.get(actor).map(|entry| *entry.value())
    }

    /// Forget the pending intent of `actor`. Returns whether one existed.
    pub fn clear(&self, actor: &ActorId) -> bool {
        self.pending.remove(actor).is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
