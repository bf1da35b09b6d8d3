//! Singleton lookup through arbiter and system registries
//!
//! Covers:
//! - concurrent first lookups from many threads start exactly one instance
//! - process scope shares one instance across arbiters
//! - per-arbiter scope gives each arbiter its own instance

mod common;

use actor_runtime::prelude::*;
use actor_runtime::{ActorId, RegistryScope, RuntimeConfig};
use common::{Counter, Increment};
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_start_one_singleton() {
    let arbiter = Arbiter::new().unwrap();
    let registry = arbiter.registry();

    let mut lookups = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        lookups.push(tokio::spawn(async move {
            let counter = registry.get::<Counter>().await.unwrap();
            let total = counter.send(Increment(1)).await.unwrap();
            (counter.id(), total)
        }));
    }

    let mut ids = HashSet::new();
    let mut totals = HashSet::new();
    for lookup in lookups {
        let (id, total) = lookup.await.unwrap();
        ids.insert(id);
        totals.insert(total);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(totals, (1..=8).collect::<HashSet<u64>>());
    assert_eq!(arbiter.metrics().snapshot().contexts_started, 1);

    arbiter.stop();
    arbiter.stopped().await;
}

fn system_config(scope: RegistryScope) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.system.name = "registry-test".to_string();
    config.system.arbiters = 2;
    config.registry.scope = scope;
    config
}

/// Looks up the `Counter` service from inside an arbiter
#[derive(Default)]
struct Lookup;

impl Actor for Lookup {}

struct Resolve;

impl Message for Resolve {
    type Result = Option<ActorId>;
}

#[async_trait(?Send)]
impl Handler<Resolve> for Lookup {
    type Result = Option<ActorId>;

    async fn handle(&mut self, _msg: Resolve, _ctx: &mut Context<Self>) -> Option<ActorId> {
        let system = System::current()?;
        system.service::<Counter>().await.ok().map(|counter| counter.id())
    }
}

async fn resolve_from_each_arbiter(system: &System) -> Vec<ActorId> {
    let mut ids = Vec::new();
    for arbiter in system.arbiters() {
        let lookup = arbiter.start(|_| Lookup).unwrap();
        ids.push(lookup.send(Resolve).await.unwrap().unwrap());
        // Repeat lookups on the same arbiter hit the cached entry
        assert_eq!(lookup.send(Resolve).await.unwrap(), ids.last().copied());
    }
    ids
}

#[tokio::test]
async fn test_process_scope_shares_instance_across_arbiters() {
    let system = System::new(system_config(RegistryScope::Process)).unwrap();

    let ids = resolve_from_each_arbiter(&system).await;
    assert_eq!(ids[0], ids[1]);
    assert_eq!(system.registry().len(), 1);

    system.shutdown().await;
}

#[tokio::test]
async fn test_per_arbiter_scope_isolates_instances() {
    let system = System::new(system_config(RegistryScope::PerArbiter)).unwrap();

    let ids = resolve_from_each_arbiter(&system).await;
    assert_ne!(ids[0], ids[1]);
    assert!(system.registry().is_empty());
    for arbiter in system.arbiters() {
        assert!(arbiter.registry().contains::<Counter>().await);
    }

    system.shutdown().await;
}
