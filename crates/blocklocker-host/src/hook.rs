//! Event handlers the host calls before applying an in-world action.

use std::sync::Arc;

use tracing::{debug, warn};

use blocklocker_registry::{LockError, Registry};
use blocklocker_store::{InMemoryLockStore, LockStore};
use blocklocker_types::{AccessReason, ActionKind, ActorId, CoordinateKey};

use crate::error::IntentError;
use crate::intent::{Intent, IntentBook};
use crate::message::HookMessage;
use crate::protectable::{display_name, is_protectable};

/// Host-side permission lookups.
pub trait PermissionSource: Send + Sync {
    /// Whether `actor` may ignore every lock.
    fn has_bypass(&self, actor: &ActorId) -> bool;
}

/// A [`PermissionSource`] that grants bypass to nobody.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBypass;

impl PermissionSource for NoBypass {
    fn has_bypass(&self, _actor: &ActorId) -> bool {
        false
    }
}

impl<F> PermissionSource for F
where
    F: Fn(&ActorId) -> bool + Send + Sync,
{
    fn has_bypass(&self, actor: &ActorId) -> bool {
        self(actor)
    }
}

/// A player acting on one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEvent {
    pub actor: ActorId,
    /// Display name recorded on locks the player creates.
    pub actor_name: Option<String>,
    pub world: String,
    /// Dimension within `world` (0 is the overworld).
    pub dimension: u32,
    pub x: i64,
    pub y: i32,
    pub z: i64,
    /// Namespaced block type, e.g. `minecraft:chest`.
    pub block_id: String,
}

impl BlockEvent {
    pub fn new(actor: ActorId, world: impl Into<String>, x: i64, y: i32, z: i64, block_id: impl Into<String>) -> Self {
        Self {
            actor,
            actor_name: None,
            world: world.into(),
            dimension: 0,
            x,
            y,
            z,
            block_id: block_id.into(),
        }
    }

    pub fn with_actor_name(mut self, name: impl Into<String>) -> Self {
        self.actor_name = Some(name.into());
        self
    }

    pub fn in_dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    /// World id used for the lock key: `world/dimension`.
    pub fn world_id(&self) -> String {
        format!("{}/{}", self.world, self.dimension)
    }
}

/// What the host should do with the event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookOutcome {
    /// Cancel the in-world action.
    pub cancel: bool,
    pub message: Option<HookMessage>,
}

impl HookOutcome {
    pub fn allow() -> Self {
        Self {
            cancel: false,
            message: None,
        }
    }

    pub fn allow_with(message: HookMessage) -> Self {
        Self {
            cancel: false,
            message: Some(message),
        }
    }

    pub fn cancel(message: HookMessage) -> Self {
        Self {
            cancel: true,
            message: Some(message),
        }
    }
}

/// Connects host block events to a [`Registry`].
pub struct ProtectionHook<S: LockStore = InMemoryLockStore, P = NoBypass> {
    registry: Arc<Registry<S>>,
    intents: IntentBook,
    permissions: P,
}

impl<S: LockStore, P: PermissionSource> ProtectionHook<S, P> {
    pub fn new(registry: Arc<Registry<S>>, permissions: P) -> Self {
        Self {
            registry,
            intents: IntentBook::new(),
            permissions,
        }
    }

    pub fn registry(&self) -> &Arc<Registry<S>> {
        &self.registry
    }

    pub fn intents(&self) -> &IntentBook {
        &self.intents
    }

    /// Arm `intent` for the next block `actor` interacts with.
    pub fn arm(&self, actor: ActorId, intent: Intent) -> Result<Option<Intent>, IntentError> {
        self.intents.arm(actor, intent)
    }

    /// A player right-clicked or opened a block.
    ///
    /// A pending intent is consumed first and always cancels the
    /// interaction. Otherwise bypass players pass, and everyone else needs
    /// open access.
    pub fn on_interact(&self, event: &BlockEvent) -> HookOutcome {
        if let Some(intent) = self.intents.take(&event.actor) {
            return self.run_intent(event, intent);
        }
        if self.permissions.has_bypass(&event.actor) {
            return HookOutcome::allow();
        }
        // Positions outside the world bounds can never be locked.
        let Ok(key) = self.event_key(event) else {
            return HookOutcome::allow();
        };

        let decision = self.registry.check_access(event.actor, &key, ActionKind::Open);
        if decision.is_allowed() {
            return HookOutcome::allow();
        }
        match decision.reason {
            AccessReason::StoreUnavailable => HookOutcome::cancel(HookMessage::ServiceUnavailable),
            _ => HookOutcome::cancel(HookMessage::Locked {
                owner: self.owner_label(&key),
            }),
        }
    }

    /// A player is breaking a block.
    ///
    /// Only the owner, or a bypass player, may break a protected block.
    /// Either way the lock goes with the block.
    pub fn on_break(&self, event: &BlockEvent) -> HookOutcome {
        let Ok(key) = self.event_key(event) else {
            return HookOutcome::allow();
        };

        if self.permissions.has_bypass(&event.actor) {
            return match self.registry.admin_unlock(&key) {
                Ok(true) => HookOutcome::allow_with(HookMessage::ProtectionRemoved),
                Ok(false) => HookOutcome::allow(),
                // The lock would outlive its block.
                Err(err) => {
                    warn!(key = %key, actor = %event.actor, error = %err, "could not clear lock on bypass break");
                    HookOutcome::cancel(HookMessage::ServiceUnavailable)
                }
            };
        }

        let decision = self.registry.check_access(event.actor, &key, ActionKind::Break);
        match decision.reason {
            AccessReason::Owner => match self.registry.unlock(event.actor, &key) {
                Ok(()) => {
                    debug!(key = %key, actor = %event.actor, "owner broke protected block");
                    HookOutcome::allow_with(HookMessage::ProtectionRemoved)
                }
                // Removed concurrently; nothing left to protect.
                Err(LockError::NotFound { .. }) => HookOutcome::allow(),
                Err(err) => HookOutcome::cancel(self.refusal(&key, err)),
            },
            AccessReason::StoreUnavailable => HookOutcome::cancel(HookMessage::ServiceUnavailable),
            // Trust and public mode grant use of a block, not its removal.
            _ => match self.registry.get(&key) {
                Ok(None) => HookOutcome::allow(),
                Ok(Some(record)) => HookOutcome::cancel(HookMessage::CannotBreak {
                    owner: record.owner_label(),
                }),
                Err(_) => HookOutcome::cancel(HookMessage::ServiceUnavailable),
            },
        }
    }

    /// A player left the server.
    pub fn on_quit(&self, actor: ActorId) {
        if self.intents.clear(&actor) {
            debug!(actor = %actor, "dropped pending intent on quit");
        }
    }

    fn event_key(&self, event: &BlockEvent) -> Result<CoordinateKey, LockError> {
        self.registry.key(&event.world_id(), event.x, event.y, event.z)
    }

    fn run_intent(&self, event: &BlockEvent, intent: Intent) -> HookOutcome {
        let key = match self.event_key(event) {
            Ok(key) => key,
            Err(_) => return HookOutcome::cancel(HookMessage::InvalidPosition),
        };
        let actor = event.actor;
        debug!(key = %key, actor = %actor, ?intent, "running intent");

        let message = match intent {
            Intent::Lock { mode } => {
                let block = display_name(&event.block_id);
                if !is_protectable(&event.block_id) {
                    return HookOutcome::cancel(HookMessage::NotProtectable { block });
                }
                let mode = mode.unwrap_or(self.registry.config().default_mode);
                let result = match &event.actor_name {
                    Some(name) => self.registry.lock_named(actor, name, &key, mode),
                    None => self.registry.lock(actor, &key, mode),
                };
                result.map(|record| HookMessage::LockCreated {
                    block,
                    mode: record.mode,
                })
            }
            Intent::Unlock => self.registry.unlock(actor, &key).map(|()| HookMessage::Unlocked),
            Intent::Trust(target) => self
                .registry
                .update_trust(actor, &key, [target], std::iter::empty())
                .map(|_| HookMessage::TrustAdded {
                    target: target.short_id(),
                }),
            Intent::Untrust(target) => self
                .registry
                .update_trust(actor, &key, std::iter::empty(), [target])
                .map(|_| HookMessage::TrustRemoved {
                    target: target.short_id(),
                }),
            Intent::SetMode(mode) => self
                .registry
                .set_mode(actor, &key, mode)
                .map(|record| HookMessage::ModeChanged { mode: record.mode }),
            Intent::Transfer(new_owner) => self
                .registry
                .transfer_ownership(actor, &key, new_owner)
                .map(|_| HookMessage::Transferred {
                    new_owner: new_owner.short_id(),
                }),
            Intent::Info => self.registry.get(&key).map(|record| match record {
                Some(r) => HookMessage::Info {
                    owner: r.owner_label(),
                    mode: r.mode,
                    trusted: r.trusted.len(),
                },
                None => HookMessage::NotLocked,
            }),
        };

        match message {
            Ok(message) => HookOutcome::cancel(message),
            Err(err) => HookOutcome::cancel(self.refusal(&key, err)),
        }
    }

    fn refusal(&self, key: &CoordinateKey, err: LockError) -> HookMessage {
        match err {
            LockError::AlreadyLocked { owner, .. } => HookMessage::AlreadyLocked {
                owner: self
                    .registry
                    .get(key)
                    .ok()
                    .flatten()
                    .map(|r| r.owner_label())
                    .unwrap_or_else(|| owner.short_id()),
            },
            LockError::NotOwner { .. } => HookMessage::NotOwner,
            LockError::NotFound { .. } => HookMessage::NotLocked,
            LockError::TrustLimitExceeded { limit, .. } => HookMessage::TrustLimitReached { limit },
            LockError::InvalidCoordinate(_) => HookMessage::InvalidPosition,
            err => {
                warn!(key = %key, error = %err, "lock operation failed");
                HookMessage::ServiceUnavailable
            }
        }
    }

    fn owner_label(&self, key: &CoordinateKey) -> String {
        match self.registry.get(key) {
            Ok(Some(record)) => record.owner_label(),
            _ => "another player".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use blocklocker_registry::RegistryConfig;
    use blocklocker_store::{MemoryAdapter, OwnerScan, StoreError, StoreResult};
    use blocklocker_types::{LockMode, LockRecord};

    fn hook() -> ProtectionHook {
        let registry = Registry::in_memory(RegistryConfig::default()).unwrap();
        ProtectionHook::new(Arc::new(registry), NoBypass)
    }

    fn chest(actor: ActorId) -> BlockEvent {
        BlockEvent::new(actor, "world", 10, 64, -3, "minecraft:chest")
    }

    fn lock_chest(hook: &ProtectionHook<impl LockStore, impl PermissionSource>, owner: ActorId) {
        hook.arm(owner, Intent::Lock { mode: None }).unwrap();
        let outcome = hook.on_interact(&chest(owner).with_actor_name("Alex"));
        assert!(matches!(outcome.message, Some(HookMessage::LockCreated { .. })));
    }

    #[test]
    fn unprotected_blocks_are_untouched() {
        let hook = hook();
        let actor = ActorId::random();
        assert_eq!(hook.on_interact(&chest(actor)), HookOutcome::allow());
        assert_eq!(hook.on_break(&chest(actor)), HookOutcome::allow());
    }

    #[test]
    fn lock_intent_creates_lock_and_is_consumed() {
        let hook = hook();
        let owner = ActorId::random();
        hook.arm(owner, Intent::Lock { mode: None }).unwrap();

        let outcome = hook.on_interact(&chest(owner).with_actor_name("Alex"));
        assert_eq!(
            outcome,
            HookOutcome::cancel(HookMessage::LockCreated {
                block: "Chest".into(),
                mode: LockMode::Private,
            })
        );
        assert!(hook.intents().is_empty());

        // The next interaction is an ordinary one.
        assert_eq!(hook.on_interact(&chest(owner)), HookOutcome::allow());
    }

    #[test]
    fn strangers_are_stopped_with_owner_name() {
        let hook = hook();
        let owner = ActorId::random();
        lock_chest(&hook, owner);

        let outcome = hook.on_interact(&chest(ActorId::random()));
        assert_eq!(outcome, HookOutcome::cancel(HookMessage::Locked { owner: "Alex".into() }));
    }

    #[test]
    fn ordinary_blocks_cannot_be_locked() {
        let hook = hook();
        let owner = ActorId::random();
        hook.arm(owner, Intent::Lock { mode: Some(LockMode::Private) }).unwrap();

        let event = BlockEvent::new(owner, "world", 0, 64, 0, "minecraft:stone");
        assert_eq!(
            hook.on_interact(&event),
            HookOutcome::cancel(HookMessage::NotProtectable { block: "Stone".into() })
        );
        assert!(hook.registry().is_empty().unwrap());
    }

    #[test]
    fn locking_someone_elses_block_reports_owner() {
        let hook = hook();
        let owner = ActorId::random();
        let other = ActorId::random();
        lock_chest(&hook, owner);

        hook.arm(other, Intent::Lock { mode: None }).unwrap();
        assert_eq!(
            hook.on_interact(&chest(other)),
            HookOutcome::cancel(HookMessage::AlreadyLocked { owner: "Alex".into() })
        );
    }

    #[test]
    fn trust_then_share_grants_access() {
        let hook = hook();
        let owner = ActorId::random();
        let friend = ActorId::random();
        lock_chest(&hook, owner);

        hook.arm(owner, Intent::Trust(friend)).unwrap();
        let outcome = hook.on_interact(&chest(owner));
        assert_eq!(
            outcome.message,
            Some(HookMessage::TrustAdded { target: friend.short_id() })
        );
        // Still private: trust alone is not enough.
        assert!(hook.on_interact(&chest(friend)).cancel);

        hook.arm(owner, Intent::SetMode(LockMode::Shared)).unwrap();
        hook.on_interact(&chest(owner));
        assert_eq!(hook.on_interact(&chest(friend)), HookOutcome::allow());

        hook.arm(owner, Intent::Untrust(friend)).unwrap();
        hook.on_interact(&chest(owner));
        assert!(hook.on_interact(&chest(friend)).cancel);
    }

    #[test]
    fn only_owner_may_unlock() {
        let hook = hook();
        let owner = ActorId::random();
        let other = ActorId::random();
        lock_chest(&hook, owner);

        hook.arm(other, Intent::Unlock).unwrap();
        assert_eq!(
            hook.on_interact(&chest(other)),
            HookOutcome::cancel(HookMessage::NotOwner)
        );

        hook.arm(owner, Intent::Unlock).unwrap();
        assert_eq!(
            hook.on_interact(&chest(owner)),
            HookOutcome::cancel(HookMessage::Unlocked)
        );

        hook.arm(owner, Intent::Unlock).unwrap();
        assert_eq!(
            hook.on_interact(&chest(owner)),
            HookOutcome::cancel(HookMessage::NotLocked)
        );
    }

    #[test]
    fn info_reports_lock_state() {
        let hook = hook();
        let owner = ActorId::random();
        let viewer = ActorId::random();

        hook.arm(viewer, Intent::Info).unwrap();
        assert_eq!(
            hook.on_interact(&chest(viewer)).message,
            Some(HookMessage::NotLocked)
        );

        lock_chest(&hook, owner);
        hook.arm(viewer, Intent::Info).unwrap();
        assert_eq!(
            hook.on_interact(&chest(viewer)).message,
            Some(HookMessage::Info {
                owner: "Alex".into(),
                mode: LockMode::Private,
                trusted: 0,
            })
        );
    }

    #[test]
    fn transfer_hands_over_control() {
        let hook = hook();
        let owner = ActorId::random();
        let heir = ActorId::random();
        lock_chest(&hook, owner);

        hook.arm(owner, Intent::Transfer(heir)).unwrap();
        hook.on_interact(&chest(owner));

        assert!(hook.on_interact(&chest(owner)).cancel);
        assert_eq!(hook.on_interact(&chest(heir)), HookOutcome::allow());
    }

    #[test]
    fn strangers_and_trusted_players_cannot_break() {
        let hook = hook();
        let owner = ActorId::random();
        let friend = ActorId::random();
        lock_chest(&hook, owner);
        hook.arm(owner, Intent::Trust(friend)).unwrap();
        hook.on_interact(&chest(owner));
        hook.arm(owner, Intent::SetMode(LockMode::Shared)).unwrap();
        hook.on_interact(&chest(owner));

        for actor in [friend, ActorId::random()] {
            assert_eq!(
                hook.on_break(&chest(actor)),
                HookOutcome::cancel(HookMessage::CannotBreak { owner: "Alex".into() })
            );
        }
        assert_eq!(hook.registry().len().unwrap(), 1);
    }

    #[test]
    fn owner_break_removes_protection() {
        let hook = hook();
        let owner = ActorId::random();
        lock_chest(&hook, owner);

        assert_eq!(
            hook.on_break(&chest(owner)),
            HookOutcome::allow_with(HookMessage::ProtectionRemoved)
        );
        assert!(hook.registry().is_empty().unwrap());
    }

    #[test]
    fn bypass_ignores_locks_and_clears_on_break() {
        let admin = ActorId::random();
        let registry = Arc::new(Registry::in_memory(RegistryConfig::default()).unwrap());
        let hook = ProtectionHook::new(registry, move |actor: &ActorId| *actor == admin);
        let owner = ActorId::random();
        lock_chest(&hook, owner);

        assert_eq!(hook.on_interact(&chest(admin)), HookOutcome::allow());
        assert_eq!(
            hook.on_break(&chest(admin)),
            HookOutcome::allow_with(HookMessage::ProtectionRemoved)
        );
        assert!(hook.registry().is_empty().unwrap());
    }

    #[test]
    fn intent_outside_bounds_is_consumed() {
        let hook = hook();
        let owner = ActorId::random();
        hook.arm(owner, Intent::Lock { mode: None }).unwrap();

        let event = BlockEvent::new(owner, "world", 0, 10_000, 0, "minecraft:chest");
        assert_eq!(
            hook.on_interact(&event),
            HookOutcome::cancel(HookMessage::InvalidPosition)
        );
        assert!(hook.intents().is_empty());
    }

    #[test]
    fn quitting_drops_pending_intent() {
        let hook = hook();
        let owner = ActorId::random();
        hook.arm(owner, Intent::Lock { mode: None }).unwrap();
        hook.on_quit(owner);

        assert_eq!(hook.on_interact(&chest(owner)), HookOutcome::allow());
        assert!(hook.registry().is_empty().unwrap());
    }

    #[derive(Default)]
    struct SwitchableStore {
        inner: InMemoryLockStore,
        down: Arc<AtomicBool>,
    }

    impl SwitchableStore {
        fn check(&self) -> StoreResult<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    impl LockStore for SwitchableStore {
        fn get(&self, key: &CoordinateKey) -> StoreResult<Option<LockRecord>> {
            self.check()?;
            self.inner.get(key)
        }
        fn put(&self, record: LockRecord) -> StoreResult<()> {
            self.check()?;
            self.inner.put(record)
        }
        fn remove(&self, key: &CoordinateKey) -> StoreResult<bool> {
            self.check()?;
            self.inner.remove(key)
        }
        fn scan_by_owner(&self, owner: &ActorId) -> StoreResult<OwnerScan> {
            self.check()?;
            self.inner.scan_by_owner(owner)
        }
        fn records(&self) -> StoreResult<Vec<LockRecord>> {
            self.check()?;
            self.inner.records()
        }
        fn clear(&self) -> StoreResult<()> {
            self.check()?;
            self.inner.clear()
        }
        fn len(&self) -> StoreResult<usize> {
            self.check()?;
            self.inner.len()
        }
    }

    #[test]
    fn store_outage_fails_closed() {
        let store = SwitchableStore::default();
        let down = Arc::clone(&store.down);
        let registry =
            Registry::new(store, Arc::new(MemoryAdapter::new()), RegistryConfig::default()).unwrap();
        let hook = ProtectionHook::new(Arc::new(registry), NoBypass);
        let actor = ActorId::random();

        let key = hook.registry().key("world/0", 10, 64, -3).unwrap();
        hook.registry().lock(actor, &key, LockMode::Public).unwrap();
        assert_eq!(hook.on_interact(&chest(ActorId::random())), HookOutcome::allow());

        down.store(true, Ordering::SeqCst);
        let outcome = hook.on_interact(&chest(ActorId::random()));
        assert_eq!(outcome, HookOutcome::cancel(HookMessage::ServiceUnavailable));
        assert_eq!(
            hook.on_break(&chest(actor)),
            HookOutcome::cancel(HookMessage::ServiceUnavailable)
        );

        hook.arm(actor, Intent::Unlock).unwrap();
        assert_eq!(
            hook.on_interact(&chest(actor)),
            HookOutcome::cancel(HookMessage::ServiceUnavailable)
        );

        // A bypass break that cannot clear the lock must not destroy the block.
        let admin = ActorId::random();
        let bypass = ProtectionHook::new(Arc::clone(hook.registry()), move |a: &ActorId| *a == admin);
        assert_eq!(
            bypass.on_break(&chest(admin)),
            HookOutcome::cancel(HookMessage::ServiceUnavailable)
        );

        down.store(false, Ordering::SeqCst);
        assert!(hook.registry().get(&key).unwrap().is_some());
        assert_eq!(
            bypass.on_break(&chest(admin)),
            HookOutcome::allow_with(HookMessage::ProtectionRemoved)
        );
    }

    #[test]
    fn dimensions_of_one_world_are_separate() {
        let hook = hook();
        let owner = ActorId::random();
        let other = ActorId::random();
        lock_chest(&hook, owner);

        let nether = chest(other).in_dimension(1);
        assert_eq!(hook.on_interact(&nether), HookOutcome::allow());

        hook.arm(other, Intent::Lock { mode: None }).unwrap();
        assert!(matches!(
            hook.on_interact(&nether).message,
            Some(HookMessage::LockCreated { .. })
        ));
        assert_eq!(hook.registry().len().unwrap(), 2);
        assert!(hook.on_interact(&chest(other)).cancel);
        assert!(hook.on_interact(&chest(owner).in_dimension(1)).cancel);

        let overworld = hook.registry().key("world/0", 10, 64, -3).unwrap();
        assert!(hook.registry().get(&overworld).unwrap().unwrap().is_owner(&owner));
    }
}
