use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::key::CoordinateKey;

/// Visibility policy of a lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Only the owner may act on the block.
    #[serde(alias = "PRIVATE")]
    Private,
    /// The owner and the trusted actors may act on the block.
    #[serde(alias = "SHARED")]
    Shared,
    /// Anyone may act on the block; ownership is still recorded.
    #[serde(alias = "PUBLIC")]
    Public,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        };
        f.write_str(s)
    }
}

/// Protection record for a single block.
///
/// Exactly one record exists per [`CoordinateKey`], or none. A key without a
/// record is unprotected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: CoordinateKey,
    pub owner: ActorId,
    /// Display name of the owner at lock time, used in player-facing messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub mode: LockMode,
    #[serde(default)]
    pub trusted: BTreeSet<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LockRecord {
    /// A fresh record with an empty trust list.
    pub fn new(key: CoordinateKey, owner: ActorId, mode: LockMode, now: DateTime<Utc>) -> Self {
        Self {
            key,
            owner,
            owner_name: None,
            mode,
            trusted: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the owner's display name.
    pub fn with_owner_name(mut self, name: impl Into<String>) -> Self {
        self.owner_name = Some(name.into());
        self
    }

    pub fn is_owner(&self, actor: &ActorId) -> bool {
        self.owner == *actor
    }

    pub fn is_trusted(&self, actor: &ActorId) -> bool {
        self.trusted.contains(actor)
    }

    /// The name to show players: the recorded display name, or the owner's
    /// short id when none was recorded.
    pub fn owner_label(&self) -> String {
        self.owner_name
            .clone()
            .unwrap_or_else(|| self.owner.short_id())
    }

    /// Bump `updated_at` after a mutation.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
