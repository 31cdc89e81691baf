use std::fmt;

use blocklocker_types::LockMode;

/// Something the host should tell the player after a hook call.
///
/// `Display` gives a plain English rendering; hosts with their own
/// localisation match on the variants instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookMessage {
    /// Interaction blocked by someone else's lock.
    Locked { owner: String },
    /// Break blocked by someone else's lock.
    CannotBreak { owner: String },
    /// A protected block was broken and its lock removed.
    ProtectionRemoved,
    /// The lock store could not be reached; the action was refused.
    ServiceUnavailable,
    /// The position is outside the lockable world.
    InvalidPosition,
    NotProtectable { block: String },
    AlreadyLocked { owner: String },
    LockCreated { block: String, mode: LockMode },
    NotLocked,
    NotOwner,
    Unlocked,
    TrustAdded { target: String },
    TrustRemoved { target: String },
    TrustLimitReached { limit: usize },
    ModeChanged { mode: LockMode },
    Transferred { new_owner: String },
    Info { owner: String, mode: LockMode, trusted: usize },
}

impl fmt::Display for HookMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked { owner } => write!(f, "This block is locked by {owner}."),
            Self::CannotBreak { owner } => {
                write!(f, "You cannot break this block. It is locked by {owner}.")
            }
            Self::ProtectionRemoved => f.write_str("Protection removed."),
            Self::ServiceUnavailable => {
                f.write_str("Block protection is unavailable right now. Try again later.")
            }
            Self::InvalidPosition => f.write_str("Blocks at this position cannot be locked."),
            Self::NotProtectable { block } => write!(f, "{block} cannot be locked."),
            Self::AlreadyLocked { owner } => write!(f, "This block is already locked by {owner}."),
            Self::LockCreated { block, mode } => write!(f, "{block} locked ({mode})."),
            Self::NotLocked => f.write_str("This block is not locked."),
            Self::NotOwner => f.write_str("Only the owner can change this lock."),
            Self::Unlocked => f.write_str("Lock removed."),
            Self::TrustAdded { target } => write!(f, "{target} can now use this block."),
            Self::TrustRemoved { target } => write!(f, "{target} can no longer use this block."),
            Self::TrustLimitReached { limit } => {
                write!(f, "This lock already trusts the maximum of {limit} players.")
            }
            Self::ModeChanged { mode } => write!(f, "Lock mode set to {mode}."),
            Self::Transferred { new_owner } => write!(f, "Lock handed over to {new_owner}."),
            Self::Info { owner, mode, trusted } => {
                write!(f, "Locked by {owner} ({mode}, {trusted} trusted).")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_text() {
        let m = HookMessage::LockCreated {
            block: "Chest".into(),
            mode: LockMode::Shared,
        };
        assert_eq!(m.to_string(), "Chest locked (shared).");
        assert_eq!(
            HookMessage::Locked { owner: "Steve".into() }.to_string(),
            "This block is locked by Steve."
        );
    }
}
