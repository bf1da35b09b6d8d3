//! Singleton Registries
//!
//! Lazily started, one-per-scope actor instances keyed by actor type.
//!
//! - [`Registry`] scopes singletons to one arbiter.
//! - [`SystemRegistry`] scopes them to the whole process, starting each on an
//!   arbiter picked from the system's pool.
//!
//! Every entry is guarded by an async lock, so racing first lookups wait for
//! the winner's construction and all receive the same address. A failed
//! construction leaves the entry empty and the next lookup retries it.

use crate::actor::Actor;
use crate::address::Address;
use crate::arbiter::{Arbiter, ArbiterHandle};
use crate::context::Context;
use crate::error::{ActorError, Result};
use crate::system::ArbiterPool;

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Slot<A> = tokio::sync::Mutex<Option<Address<A>>>;

/// Type-keyed singleton slots shared by every handle of one scope
#[derive(Default)]
pub(crate) struct RegistryEntries {
    slots: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl RegistryEntries {
    fn slot<A: Actor>(&self) -> Arc<Slot<A>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots
            .get(&TypeId::of::<A>())
            .and_then(|slot| Arc::clone(slot).downcast::<Slot<A>>().ok())
        {
            return slot;
        }

        let slot = Arc::new(Slot::<A>::new(None));
        slots.insert(TypeId::of::<A>(), slot.clone());
        slot
    }

    fn existing<A: Actor>(&self) -> Option<Arc<Slot<A>>> {
        self.slots
            .lock()
            .get(&TypeId::of::<A>())
            .and_then(|slot| Arc::clone(slot).downcast::<Slot<A>>().ok())
    }

    async fn get_or_start<A, P, F>(&self, pick: P, f: F) -> Result<Address<A>>
    where
        A: Actor,
        P: FnOnce() -> Result<ArbiterHandle>,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        let actor_type = std::any::type_name::<A>();
        let slot = self.slot::<A>();
        let mut entry = slot.lock().await;

        if let Some(address) = entry.as_ref() {
            if address.connected() {
                return Ok(address.clone());
            }
            debug!(actor_type, actor_id = %address.id(), "Registry entry disconnected, rebuilding");
        }

        let started = match pick() {
            Ok(arbiter) => arbiter.start_checked(f).await.map(|address| (arbiter, address)),
            Err(err) => Err(err),
        };

        match started {
            Ok((arbiter, address)) => {
                info!(
                    actor_type,
                    actor_id = %address.id(),
                    arbiter_id = %arbiter.id(),
                    "Registry singleton started"
                );
                *entry = Some(address.clone());
                Ok(address)
            }
            Err(err) => {
                *entry = None;
                warn!(actor_type, error = %err, "Registry singleton construction failed");
                Err(ActorError::registry_construction(actor_type, err))
            }
        }
    }

    async fn set<A: Actor>(&self, address: Address<A>) {
        *self.slot::<A>().lock().await = Some(address);
    }

    async fn contains<A: Actor>(&self) -> bool {
        match self.existing::<A>() {
            Some(slot) => slot.lock().await.as_ref().is_some_and(Address::connected),
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Actor that an arbiter can start eagerly through
/// [`ArbiterBuilder::service`](crate::arbiter::ArbiterBuilder::service)
/// instead of on first lookup
pub trait ArbiterService: Actor + Default {}

/// Singletons scoped to one arbiter
#[derive(Clone)]
pub struct Registry {
    arbiter: ArbiterHandle,
    entries: Arc<RegistryEntries>,
}

impl Registry {
    pub(crate) fn new(arbiter: ArbiterHandle, entries: Arc<RegistryEntries>) -> Self {
        Self { arbiter, entries }
    }

    /// Registry of the arbiter driving the calling thread
    pub fn current() -> Option<Registry> {
        Arbiter::current().map(|arbiter| arbiter.registry())
    }

    pub fn arbiter(&self) -> &ArbiterHandle {
        &self.arbiter
    }

    /// Singleton address for `A`, starting `A::default()` on first lookup
    pub async fn get<A: Actor + Default>(&self) -> Result<Address<A>> {
        let arbiter = self.arbiter.clone();
        self.entries
            .get_or_start(move || Ok(arbiter), |_| A::default())
            .await
    }

    /// Install an externally started instance, replacing any cached one
    pub async fn set<A: Actor>(&self, address: Address<A>) {
        self.entries.set(address).await
    }

    /// Whether a connected instance of `A` is cached
    pub async fn contains<A: Actor>(&self) -> bool {
        self.entries.contains::<A>().await
    }

    /// Number of actor types that have an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("arbiter", &self.arbiter.id())
            .field("entries", &self.len())
            .finish()
    }
}

/// Singletons scoped to the whole process
#[derive(Clone)]
pub struct SystemRegistry {
    entries: Arc<RegistryEntries>,
    pool: Arc<ArbiterPool>,
}

impl SystemRegistry {
    pub(crate) fn new(pool: Arc<ArbiterPool>) -> Self {
        Self {
            entries: Arc::new(RegistryEntries::default()),
            pool,
        }
    }

    /// Singleton address for `A`. The first lookup starts `A::default()` on
    /// an arbiter picked by the system's assignment policy.
    pub async fn get<A: Actor + Default>(&self) -> Result<Address<A>> {
        let pool = Arc::clone(&self.pool);
        self.entries
            .get_or_start(move || pool.pick(), |_| A::default())
            .await
    }

    pub async fn set<A: Actor>(&self, address: Address<A>) {
        self.entries.set(address).await
    }

    pub async fn contains<A: Actor>(&self) -> bool {
        self.entries.contains::<A>().await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Handler, Message};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Sequencer {
        next: u64,
    }

    impl Actor for Sequencer {}
    impl ArbiterService for Sequencer {}

    struct Next;

    impl Message for Next {
        type Result = u64;
    }

    #[async_trait(?Send)]
    impl Handler<Next> for Sequencer {
        type Result = u64;

        async fn handle(&mut self, _msg: Next, _ctx: &mut Context<Self>) -> u64 {
            self.next += 1;
            self.next
        }
    }

    static FLAKY_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Flaky;

    #[async_trait(?Send)]
    impl Actor for Flaky {
        async fn started(&mut self, _ctx: &mut Context<Self>) -> anyhow::Result<()> {
            if FLAKY_ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("first start always fails");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_racing_lookups_share_one_instance() {
        let arbiter = Arbiter::new().unwrap();
        let registry = arbiter.registry();

        let (a, b) = tokio::join!(registry.get::<Sequencer>(), registry.get::<Sequencer>());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id(), b.id());
        assert_eq!(arbiter.metrics().snapshot().contexts_started, 1);

        // Both handles observe one sequence
        assert_eq!(a.send(Next).await.unwrap(), 1);
        assert_eq!(b.send(Next).await.unwrap(), 2);
        assert!(registry.contains::<Sequencer>().await);

        arbiter.stop();
        arbiter.stopped().await;
    }

    #[tokio::test]
    async fn test_failed_construction_is_retried() {
        let arbiter = Arbiter::new().unwrap();
        let registry = arbiter.registry();

        let err = registry.get::<Flaky>().await.unwrap_err();
        assert!(matches!(err, ActorError::RegistryConstructionFailed { .. }));
        assert!(!registry.contains::<Flaky>().await);

        let address = registry.get::<Flaky>().await.unwrap();
        assert!(address.connected());
        assert_eq!(FLAKY_ATTEMPTS.load(Ordering::SeqCst), 2);

        arbiter.stop();
        arbiter.stopped().await;
    }

    #[tokio::test]
    async fn test_disconnected_entry_is_rebuilt() {
        let arbiter = Arbiter::new().unwrap();
        let registry = arbiter.registry();

        let first = registry.get::<Sequencer>().await.unwrap();
        first.send(Next).await.unwrap();
        first.stop();
        while first.connected() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let second = registry.get::<Sequencer>().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.send(Next).await.unwrap(), 1);

        arbiter.stop();
        arbiter.stopped().await;
    }

    #[tokio::test]
    async fn test_set_installs_external_instance() {
        let arbiter = Arbiter::new().unwrap();
        let registry = arbiter.registry();
        assert!(!registry.contains::<Sequencer>().await);

        let external = arbiter.start(|_| Sequencer { next: 100 }).unwrap();
        registry.set(external.clone()).await;

        let found = registry.get::<Sequencer>().await.unwrap();
        assert_eq!(found, external);
        assert_eq!(found.send(Next).await.unwrap(), 101);

        arbiter.stop();
        arbiter.stopped().await;
    }

    #[tokio::test]
    async fn test_arbiter_service_starts_eagerly() {
        let arbiter = Arbiter::builder().service::<Sequencer>().build().unwrap();
        let registry = arbiter.registry();

        let mut attempts = 0;
        while !registry.contains::<Sequencer>().await && attempts < 100 {
            attempts += 1;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(registry.contains::<Sequencer>().await);

        arbiter.stop();
        arbiter.stopped().await;
    }
}
