//! Host integration for BlockLocker.
//!
//! The game server calls into this crate from its event bus. Each call is
//! answered synchronously with a [`HookOutcome`] telling the host whether to
//! cancel the in-world action and what to tell the player.
//!
//! # Flow
//!
//! 1. A command (parsed by the host) arms an [`Intent`] for a player, e.g.
//!    "lock the next block I click".
//! 2. The next block interaction consumes the intent and runs the matching
//!    registry operation.
//! 3. Without an intent, interactions and breaks are checked against the
//!    registry and cancelled when denied.
//!
//! # Modules
//!
//! - [`protectable`] -- which block types may be locked
//! - [`intent`] -- per-player pending intents
//! - [`hook`] -- [`ProtectionHook`] event handlers
//! - [`message`] -- typed player-facing messages
//! - [`summary`] -- per-owner lock listings

pub mod error;
pub mod hook;
pub mod intent;
pub mod message;
pub mod protectable;
pub mod summary;

pub use error::IntentError;
pub use hook::{BlockEvent, HookOutcome, NoBypass, PermissionSource, ProtectionHook};
pub use intent::{Intent, IntentBook};
pub use message::HookMessage;
pub use protectable::{display_name, is_protectable};
pub use summary::{owner_summary, OwnerSummary};
