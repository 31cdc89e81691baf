use std::fmt;

use blocklocker_registry::{Registry, Result};
use blocklocker_store::LockStore;
use blocklocker_types::{ActorId, LockRecord};

/// The locks one owner holds, trimmed for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerSummary {
    pub owner: ActorId,
    /// How many locks the owner holds in total.
    pub total: usize,
    /// The first locks in key order, at most the requested limit.
    pub shown: Vec<LockRecord>,
}

impl OwnerSummary {
    /// Locks counted in `total` but left out of `shown`.
    pub fn hidden(&self) -> usize {
        self.total - self.shown.len()
    }
}

impl fmt::Display for OwnerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            0 => return f.write_str("No locks."),
            1 => writeln!(f, "1 lock:")?,
            n => writeln!(f, "{n} locks:")?,
        }
        for record in &self.shown {
            let key = &record.key;
            write!(
                f,
                "  {} {}, {}, {} [{}]",
                key.world(),
                key.x(),
                key.y(),
                key.z(),
                record.mode
            )?;
            if !record.trusted.is_empty() {
                write!(f, " ({} trusted)", record.trusted.len())?;
            }
            writeln!(f)?;
        }
        if self.hidden() > 0 {
            writeln!(f, "  ... and {} more", self.hidden())?;
        }
        Ok(())
    }
}

/// Count the locks `owner` holds and collect the first `limit` of them.
pub fn owner_summary<S: LockStore>(registry: &Registry<S>, owner: ActorId, limit: usize) -> Result<OwnerSummary> {
    let mut records = registry.locks_owned_by(owner)?;
    let total = records.len();
    records.truncate(limit);
    Ok(OwnerSummary {
        owner,
        total,
        shown: records,
    })
}
