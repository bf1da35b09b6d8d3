//! Actor System
//!
//! A [`System`] owns a fixed pool of arbiters started from a [`RuntimeConfig`],
//! assigns new contexts to them by the configured policy and holds the
//! process-scoped [`SystemRegistry`].

use crate::actor::Actor;
use crate::address::Address;
use crate::arbiter::{Arbiter, ArbiterHandle};
use crate::context::Context;
use crate::error::{ActorError, Result};
use crate::registry::SystemRegistry;

use actor_config::{ArbiterAssignment, RegistryScope, RuntimeConfig};
use anyhow::Context as _;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, info};

thread_local! {
    static CURRENT_SYSTEM: RefCell<Option<Weak<SystemInner>>> = const { RefCell::new(None) };
}

/// Arbiter handles plus the assignment policy over them
pub(crate) struct ArbiterPool {
    name: String,
    arbiters: Vec<ArbiterHandle>,
    assignment: ArbiterAssignment,
    next: AtomicUsize,
}

impl ArbiterPool {
    /// Pick a running arbiter for a new context
    pub(crate) fn pick(&self) -> Result<ArbiterHandle> {
        if self.arbiters.is_empty() {
            return Err(ActorError::NoArbiter);
        }

        let picked = match self.assignment {
            ArbiterAssignment::RoundRobin => (0..self.arbiters.len())
                .map(|_| self.next.fetch_add(1, Ordering::Relaxed) % self.arbiters.len())
                .map(|index| &self.arbiters[index])
                .find(|arbiter| arbiter.is_running()),
            ArbiterAssignment::LeastLoaded => self
                .arbiters
                .iter()
                .filter(|arbiter| arbiter.is_running())
                .min_by_key(|arbiter| arbiter.metrics().active_contexts()),
        };

        picked
            .cloned()
            .ok_or_else(|| ActorError::arbiter_stopped(&self.name))
    }

    fn contains(&self, arbiter: &ArbiterHandle) -> bool {
        self.arbiters.iter().any(|candidate| candidate == arbiter)
    }
}

struct SystemInner {
    config: RuntimeConfig,
    pool: Arc<ArbiterPool>,
    registry: SystemRegistry,
    /// Owned arbiter threads, taken on shutdown
    threads: Mutex<Vec<Arbiter>>,
}

impl Drop for SystemInner {
    fn drop(&mut self) {
        for arbiter in &self.pool.arbiters {
            arbiter.stop();
        }
    }
}

/// Pool of arbiters with a process-wide registry
#[derive(Clone)]
pub struct System {
    inner: Arc<SystemInner>,
}

impl System {
    /// Start `config.system.arbiters` arbiters
    pub fn new(config: RuntimeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let start_time = Instant::now();

        let mut threads = Vec::with_capacity(config.system.arbiters);
        for index in 0..config.system.arbiters {
            let built = Arbiter::builder()
                .name(format!("{}-{}", config.system.name, index))
                .context_config(config.context)
                .mailbox_config(config.mailbox)
                .build()
                .with_context(|| format!("Failed to start arbiter {} of {}", index, config.system.name));

            match built {
                Ok(arbiter) => threads.push(arbiter),
                Err(err) => {
                    for arbiter in &threads {
                        arbiter.stop();
                    }
                    return Err(err);
                }
            }
        }

        let pool = Arc::new(ArbiterPool {
            name: config.system.name.clone(),
            arbiters: threads.iter().map(Arbiter::handle).collect(),
            assignment: config.system.assignment,
            next: AtomicUsize::new(0),
        });

        let inner = Arc::new(SystemInner {
            registry: SystemRegistry::new(Arc::clone(&pool)),
            pool,
            threads: Mutex::new(threads),
            config,
        });

        for arbiter in &inner.pool.arbiters {
            let system = Arc::downgrade(&inner);
            arbiter
                .exec_fn(move || CURRENT_SYSTEM.with(|current| *current.borrow_mut() = Some(system)))
                .with_context(|| format!("Failed to register system on {}", arbiter.id()))?;
        }

        info!(
            name = %inner.config.system.name,
            arbiters = inner.pool.arbiters.len(),
            assignment = ?inner.config.system.assignment,
            startup_ms = start_time.elapsed().as_millis() as u64,
            "Actor system started"
        );
        Ok(Self { inner })
    }

    /// System owning the arbiter that drives the calling thread
    pub fn current() -> Option<System> {
        CURRENT_SYSTEM.with(|current| {
            current
                .borrow()
                .as_ref()
                .and_then(Weak::upgrade)
                .map(|inner| System { inner })
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.config.system.name
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Arbiter for the next context, by the assignment policy
    pub fn arbiter(&self) -> Result<ArbiterHandle> {
        self.inner.pool.pick()
    }

    pub fn arbiters(&self) -> Vec<ArbiterHandle> {
        self.inner.pool.arbiters.clone()
    }

    /// Start an actor on the next assigned arbiter
    pub fn start<A, F>(&self, f: F) -> Result<Address<A>>
    where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        let arbiter = self.arbiter()?;
        debug!(
            actor_type = std::any::type_name::<A>(),
            arbiter_id = %arbiter.id(),
            "Assigning context"
        );
        arbiter.start(f)
    }

    /// Process-scoped registry
    pub fn registry(&self) -> &SystemRegistry {
        &self.inner.registry
    }

    /// Singleton lookup through the configured registry scope. Per-arbiter
    /// lookups use the calling thread's arbiter when it belongs to this
    /// system, otherwise the next assigned one.
    pub async fn service<A: Actor + Default>(&self) -> Result<Address<A>> {
        match self.inner.config.registry.scope {
            RegistryScope::Process => self.inner.registry.get::<A>().await,
            RegistryScope::PerArbiter => {
                let arbiter = match Arbiter::current().filter(|current| self.inner.pool.contains(current)) {
                    Some(current) => current,
                    None => self.arbiter()?,
                };
                arbiter.registry().get::<A>().await
            }
        }
    }

    /// Whether any arbiter still accepts contexts
    pub fn is_running(&self) -> bool {
        self.inner.pool.arbiters.iter().any(ArbiterHandle::is_running)
    }

    /// Stop every arbiter and wait for all of them to drain.
    ///
    /// Must be awaited from outside the system's own arbiters: an arbiter
    /// cannot wait for its own loop to finish.
    pub async fn shutdown(&self) {
        let start_time = Instant::now();
        info!(name = %self.name(), "Actor system shutting down");

        for arbiter in &self.inner.pool.arbiters {
            arbiter.stop();
        }
        futures::future::join_all(self.inner.pool.arbiters.iter().map(|arbiter| arbiter.stopped())).await;

        let threads = std::mem::take(&mut *self.inner.threads.lock());
        let joined = tokio::task::spawn_blocking(move || {
            for arbiter in threads {
                let id = arbiter.id();
                if arbiter.join().is_err() {
                    error!(arbiter_id = %id, "Arbiter thread panicked");
                }
            }
        })
        .await;
        if let Err(err) = joined {
            error!(error = %err, "Failed to join arbiter threads");
        }

        info!(
            name = %self.name(),
            shutdown_ms = start_time.elapsed().as_millis() as u64,
            "Actor system shutdown complete"
        );
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name())
            .field("arbiters", &self.inner.pool.arbiters.len())
            .field("assignment", &self.inner.config.system.assignment)
            .finish()
    }
}
