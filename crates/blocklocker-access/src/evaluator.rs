use tracing::trace;

use blocklocker_types::{AccessDecision, AccessReason, ActionKind, ActorId, LockMode, LockRecord};

/// Decide whether `actor` may perform `action` on a block.
///
/// Rules, first match wins:
///
/// 1. No record: allow, [`AccessReason::Public`].
/// 2. Actor is the owner: allow, [`AccessReason::Owner`], whatever the mode.
/// 3. Public lock: allow, [`AccessReason::Public`].
/// 4. Shared lock and the actor is trusted: allow, [`AccessReason::Trusted`].
/// 5. Otherwise: deny, [`AccessReason::DeniedLocked`].
///
/// The action kind does not currently change the outcome; it is only logged.
pub fn evaluate(actor: &ActorId, record: Option<&LockRecord>, action: ActionKind) -> AccessDecision {
    let decision = match record {
        None => AccessDecision::allow(AccessReason::Public),
        Some(r) if r.is_owner(actor) => AccessDecision::allow(AccessReason::Owner),
        Some(r) if r.mode == LockMode::Public => AccessDecision::allow(AccessReason::Public),
        Some(r) if r.mode == LockMode::Shared && r.is_trusted(actor) => {
            AccessDecision::allow(AccessReason::Trusted)
        }
        Some(_) => AccessDecision::deny(AccessReason::DeniedLocked),
    };
    trace!(actor = %actor, ?action, %decision, "evaluated access");
    decision
}
