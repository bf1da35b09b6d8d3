//! Arbiters
//!
//! An [`Arbiter`] owns one OS thread running a single-threaded tokio runtime
//! and a `LocalSet`. Every context it drives is a local task on that set, so
//! actors never migrate between threads and need not be `Send`. Other threads
//! talk to an arbiter through its [`ArbiterHandle`], which forwards commands
//! over an unbounded channel.
//!
//! Fairness between contexts comes from the `LocalSet` scheduler plus each
//! context yielding after `max_batch` envelopes.

use crate::actor::{Actor, ActorId};
use crate::address::Address;
use crate::context::{self, Context};
use crate::error::{ActorError, Result};
use crate::mailbox::{ContextControl, Mailbox, MailboxReceiver};
use crate::registry::{ArbiterService, Registry, RegistryEntries};

use actor_config::{ContextConfig, MailboxConfig};
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet, LocalSet};
use tracing::{debug, error, info, warn};

static NEXT_ARBITER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<ArbiterHandle>> = const { RefCell::new(None) };
}

/// Process-unique arbiter identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArbiterId(u64);

impl ArbiterId {
    fn next() -> Self {
        Self(NEXT_ARBITER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArbiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arbiter-{}", self.0)
    }
}

/// Per-arbiter counters
#[derive(Debug, Default)]
pub struct ArbiterMetrics {
    pub contexts_started: AtomicU64,
    pub contexts_stopped: AtomicU64,
    pub context_panics: AtomicU64,
    pub messages_processed: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
    pub mailbox_full_events: AtomicU64,
}

impl ArbiterMetrics {
    pub fn record_context_started(&self) {
        self.contexts_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_context_stopped(&self, panicked: bool) {
        self.contexts_stopped.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.context_panics.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_message_handled(&self, duration: Duration) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a push rejected by a full bounded mailbox
    pub fn record_mailbox_full(&self) {
        self.mailbox_full_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Contexts started and not yet stopped
    pub fn active_contexts(&self) -> u64 {
        let started = self.contexts_started.load(Ordering::Relaxed);
        let stopped = self.contexts_stopped.load(Ordering::Relaxed);
        started.saturating_sub(stopped)
    }

    pub fn avg_processing_time_ns(&self) -> f64 {
        let count = self.messages_processed.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_processing_time_ns.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn snapshot(&self) -> ArbiterStats {
        ArbiterStats {
            contexts_started: self.contexts_started.load(Ordering::Relaxed),
            contexts_stopped: self.contexts_stopped.load(Ordering::Relaxed),
            active_contexts: self.active_contexts(),
            context_panics: self.context_panics.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            avg_processing_time_ns: self.avg_processing_time_ns(),
            mailbox_full_events: self.mailbox_full_events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ArbiterMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArbiterStats {
    pub contexts_started: u64,
    pub contexts_stopped: u64,
    pub active_contexts: u64,
    pub context_panics: u64,
    pub messages_processed: u64,
    pub avg_processing_time_ns: f64,
    pub mailbox_full_events: u64,
}

pub(crate) enum ArbiterCommand {
    /// Run a closure on the arbiter thread
    Execute(Box<dyn FnOnce() + Send>),
    /// Build and start a context
    Spawn(Box<dyn FnOnce(&mut ArbiterState) + Send>),
    Stop,
}

struct HandleInner {
    id: ArbiterId,
    name: String,
    tx: mpsc::UnboundedSender<ArbiterCommand>,
    accepting: AtomicBool,
    metrics: Arc<ArbiterMetrics>,
    registry: Arc<RegistryEntries>,
    stopped: watch::Receiver<bool>,
    context_config: ContextConfig,
    mailbox_config: MailboxConfig,
}

/// Cloneable, thread-safe handle to an arbiter
#[derive(Clone)]
pub struct ArbiterHandle {
    inner: Arc<HandleInner>,
}

impl ArbiterHandle {
    pub fn id(&self) -> ArbiterId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn metrics(&self) -> &Arc<ArbiterMetrics> {
        &self.inner.metrics
    }

    /// Mailbox settings used by [`ArbiterHandle::start`]
    pub fn mailbox_config(&self) -> MailboxConfig {
        self.inner.mailbox_config
    }

    /// Accepting new contexts and commands
    pub fn is_running(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire) && !*self.inner.stopped.borrow()
    }

    /// Run `f` on the arbiter thread
    pub fn exec_fn<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(ActorError::arbiter_stopped(self.id()));
        }
        self.inner
            .tx
            .send(ArbiterCommand::Execute(Box::new(f)))
            .map_err(|_| ActorError::arbiter_stopped(self.id()))
    }

    /// Start an actor built by `f` on this arbiter with the arbiter's default
    /// mailbox settings. The address is usable at once; messages sent before
    /// the context starts wait in its mailbox.
    pub fn start<A, F>(&self, f: F) -> Result<Address<A>>
    where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        self.spawn_context(self.inner.mailbox_config, f, None)
    }

    /// Start an actor with its own mailbox settings. Settings that fail
    /// validation are refused before anything reaches the arbiter.
    pub fn start_with_mailbox<A, F>(&self, mailbox: MailboxConfig, f: F) -> Result<Address<A>>
    where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        mailbox.validate().map_err(ActorError::invalid_config)?;
        self.spawn_context(mailbox, f, None)
    }

    /// Start an actor and wait for its `started` hook to finish
    pub async fn start_checked<A, F>(&self, f: F) -> Result<Address<A>>
    where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let address = self.spawn_context(self.inner.mailbox_config, f, Some(tx))?;
        match rx.await {
            Ok(Ok(())) => Ok(address),
            Ok(Err(err)) => Err(err),
            // The context went down before reporting: a panic in `started`
            // if the arbiter is still up, otherwise a dropped spawn command
            Err(_) if self.is_running() => Err(ActorError::startup(
                std::any::type_name::<A>(),
                "started hook panicked",
            )),
            Err(_) => Err(ActorError::arbiter_stopped(self.id())),
        }
    }

    fn spawn_context<A, F>(
        &self,
        mailbox: MailboxConfig,
        f: F,
        started_tx: Option<oneshot::Sender<Result<()>>>,
    ) -> Result<Address<A>>
    where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(ActorError::arbiter_stopped(self.id()));
        }

        let (mailbox, receiver) = Mailbox::channel(ActorId::new(), mailbox, Arc::clone(&self.inner.metrics));
        let command = ArbiterCommand::Spawn(Box::new(move |state: &mut ArbiterState| {
            state.spawn_context(receiver, f, started_tx)
        }));

        self.inner
            .tx
            .send(command)
            .map_err(|_| ActorError::arbiter_stopped(self.id()))?;
        Ok(Address::new(mailbox))
    }

    /// Singleton registry scoped to this arbiter
    pub fn registry(&self) -> Registry {
        Registry::new(self.clone(), Arc::clone(&self.inner.registry))
    }

    /// Begin shutdown: refuse new contexts, signal every owned context to
    /// stop, wait for them to drain, then end the loop. Returns false if
    /// already stopping.
    pub fn stop(&self) -> bool {
        if !self.inner.accepting.swap(false, Ordering::AcqRel) {
            return false;
        }
        info!(arbiter_id = %self.id(), name = %self.name(), "Arbiter stop requested");
        // A closed channel means the loop is already gone
        let _ = self.inner.tx.send(ArbiterCommand::Stop);
        true
    }

    /// Wait until the arbiter loop has finished
    pub async fn stopped(&self) {
        let mut stopped = self.inner.stopped.clone();
        // Sender dropped also means the thread is gone
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    /// Handle with no loop behind it, for driving contexts by hand in tests
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_stopped_tx, stopped) = watch::channel(true);
        Self::from_parts(
            ArbiterId::next(),
            "detached".to_string(),
            tx,
            stopped,
            ContextConfig::default(),
            MailboxConfig::default(),
        )
    }

    fn from_parts(
        id: ArbiterId,
        name: String,
        tx: mpsc::UnboundedSender<ArbiterCommand>,
        stopped: watch::Receiver<bool>,
        context_config: ContextConfig,
        mailbox_config: MailboxConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                name,
                tx,
                accepting: AtomicBool::new(true),
                metrics: Arc::new(ArbiterMetrics::default()),
                registry: Arc::new(RegistryEntries::default()),
                stopped,
                context_config,
                mailbox_config,
            }),
        }
    }
}

impl PartialEq for ArbiterHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ArbiterHandle {}

impl fmt::Debug for ArbiterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArbiterHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Loop-side state, owned by the arbiter thread
pub(crate) struct ArbiterState {
    handle: ArbiterHandle,
    contexts: JoinSet<ActorId>,
    controls: HashMap<ActorId, Arc<dyn ContextControl>>,
}

impl ArbiterState {
    fn new(handle: ArbiterHandle) -> Self {
        Self {
            handle,
            contexts: JoinSet::new(),
            controls: HashMap::new(),
        }
    }

    fn spawn_context<A, F>(
        &mut self,
        receiver: MailboxReceiver<A>,
        f: F,
        started_tx: Option<oneshot::Sender<Result<()>>>,
    ) where
        A: Actor,
        F: FnOnce(&mut Context<A>) -> A,
    {
        let mut ctx = Context::new(receiver.shared(), self.handle.clone(), self.handle.inner.context_config);
        let actor = f(&mut ctx);
        let id = ctx.id();

        self.controls.insert(id, receiver.control());
        self.handle.metrics().record_context_started();
        self.contexts.spawn_local(context::run(actor, ctx, receiver, started_tx));
        debug!(
            actor_id = %id,
            actor_type = std::any::type_name::<A>(),
            arbiter_id = %self.handle.id(),
            "Context spawned"
        );
    }

    fn reap(&mut self, result: std::result::Result<ActorId, JoinError>) {
        match result {
            Ok(id) => {
                self.controls.remove(&id);
                self.handle.metrics().record_context_stopped(false);
            }
            Err(err) => {
                self.handle.metrics().record_context_stopped(err.is_panic());
                if err.is_panic() {
                    error!(arbiter_id = %self.handle.id(), "Context panicked, mailbox closed");
                }
                // A dead context's receiver closed its mailbox on unwind
                let arbiter_id = self.handle.id();
                self.controls.retain(|_, control| {
                    let closed = control.is_closed();
                    if closed {
                        debug!(%arbiter_id, actor_id = %control.actor_id(), "Context control released");
                    }
                    !closed
                });
            }
        }
    }

    async fn shutdown(&mut self, rx: &mut mpsc::UnboundedReceiver<ArbiterCommand>) {
        self.handle.inner.accepting.store(false, Ordering::Release);

        // Contexts still queued for spawn never start: dropping the command
        // closes their mailboxes and fails `start_checked`
        rx.close();
        let mut rejected = 0;
        while let Ok(command) = rx.try_recv() {
            if matches!(command, ArbiterCommand::Spawn(_)) {
                rejected += 1;
            }
        }

        info!(
            arbiter_id = %self.handle.id(),
            contexts = self.controls.len(),
            rejected,
            "Arbiter draining contexts"
        );
        for control in self.controls.values() {
            control.request_shutdown();
        }
        while let Some(result) = self.contexts.join_next().await {
            self.reap(result);
        }
    }
}

async fn run_loop(mut state: ArbiterState, mut rx: mpsc::UnboundedReceiver<ArbiterCommand>) {
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(ArbiterCommand::Execute(f)) => f(),
                Some(ArbiterCommand::Spawn(spawn)) => spawn(&mut state),
                Some(ArbiterCommand::Stop) | None => break,
            },
            Some(result) = state.contexts.join_next(), if !state.contexts.is_empty() => {
                state.reap(result);
            }
        }
    }

    state.shutdown(&mut rx).await;
}

type ServiceStarter = Box<dyn FnOnce(Registry) -> LocalBoxFuture<'static, ()> + Send>;

/// Configures and starts an [`Arbiter`]
pub struct ArbiterBuilder {
    name: Option<String>,
    context_config: ContextConfig,
    mailbox_config: MailboxConfig,
    services: Vec<ServiceStarter>,
}

impl ArbiterBuilder {
    fn new() -> Self {
        Self {
            name: None,
            context_config: ContextConfig::default(),
            mailbox_config: MailboxConfig::default(),
            services: Vec::new(),
        }
    }

    /// Thread name; defaults to the arbiter id
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn context_config(mut self, config: ContextConfig) -> Self {
        self.context_config = config;
        self
    }

    /// Default mailbox settings for contexts started on this arbiter
    pub fn mailbox_config(mut self, config: MailboxConfig) -> Self {
        self.mailbox_config = config;
        self
    }

    /// Start `S` in the arbiter's registry as soon as the arbiter runs
    pub fn service<S: ArbiterService>(mut self) -> Self {
        self.services.push(Box::new(|registry: Registry| -> LocalBoxFuture<'static, ()> {
            Box::pin(async move {
                if let Err(err) = registry.get::<S>().await {
                    warn!(
                        actor_type = std::any::type_name::<S>(),
                        error = %err,
                        "Arbiter service failed to start"
                    );
                }
            })
        }));
        self
    }

    pub fn build(self) -> io::Result<Arbiter> {
        let invalid = |err: anyhow::Error| io::Error::new(io::ErrorKind::InvalidInput, err.to_string());
        self.mailbox_config.validate().map_err(invalid)?;
        self.context_config.validate().map_err(invalid)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (stopped_tx, stopped_rx) = watch::channel(false);

        let id = ArbiterId::next();
        let name = self.name.unwrap_or_else(|| id.to_string());
        let handle = ArbiterHandle::from_parts(
            id,
            name.clone(),
            tx,
            stopped_rx,
            self.context_config,
            self.mailbox_config,
        );

        let thread_handle = handle.clone();
        let services = self.services;
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            let arbiter_id = thread_handle.id();
            CURRENT.with(|current| *current.borrow_mut() = Some(thread_handle.clone()));

            let local = LocalSet::new();
            local.block_on(&runtime, async move {
                for service in services {
                    tokio::task::spawn_local(service(thread_handle.registry()));
                }
                run_loop(ArbiterState::new(thread_handle), rx).await;
            });

            CURRENT.with(|current| current.borrow_mut().take());
            drop(local);
            info!(arbiter_id = %arbiter_id, "Arbiter stopped");
            // Nobody waiting is fine
            let _ = stopped_tx.send(true);
        })?;

        info!(arbiter_id = %handle.id(), name = %name, "Arbiter started");
        Ok(Arbiter { handle, thread })
    }
}

/// Owning handle to an arbiter thread
pub struct Arbiter {
    handle: ArbiterHandle,
    thread: thread::JoinHandle<()>,
}

impl Arbiter {
    /// Start an arbiter with default settings
    pub fn new() -> io::Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ArbiterBuilder {
        ArbiterBuilder::new()
    }

    /// Handle of the arbiter driving the calling thread
    pub fn current() -> Option<ArbiterHandle> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub fn handle(&self) -> ArbiterHandle {
        self.handle.clone()
    }

    /// Block until the arbiter thread exits
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

impl Deref for Arbiter {
    type Target = ArbiterHandle;

    fn deref(&self) -> &ArbiterHandle {
        &self.handle
    }
}

impl fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Arbiter").field(&self.handle).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Handler, Message};
    use actor_config::FullPolicy;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Greeter;

    impl Actor for Greeter {}

    struct Greet(&'static str);

    impl Message for Greet {
        type Result = String;
    }

    #[async_trait(?Send)]
    impl Handler<Greet> for Greeter {
        type Result = String;

        async fn handle(&mut self, msg: Greet, ctx: &mut Context<Self>) -> String {
            format!("hello {} from {}", msg.0, ctx.arbiter().name())
        }
    }

    struct WhereAmI;

    impl Message for WhereAmI {
        type Result = Option<String>;
    }

    #[async_trait(?Send)]
    impl Handler<WhereAmI> for Greeter {
        type Result = Option<String>;

        async fn handle(&mut self, _msg: WhereAmI, _ctx: &mut Context<Self>) -> Option<String> {
            Arbiter::current().map(|handle| handle.name().to_string())
        }
    }

    #[test]
    fn test_arbiter_ids_are_unique() {
        let a = ArbiterId::next();
        let b = ArbiterId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("arbiter-"));
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = ArbiterMetrics::default();
        metrics.record_context_started();
        metrics.record_context_started();
        metrics.record_context_stopped(true);
        metrics.record_message_handled(Duration::from_nanos(300));
        metrics.record_message_handled(Duration::from_nanos(100));
        metrics.record_mailbox_full();

        let stats = metrics.snapshot();
        assert_eq!(stats.active_contexts, 1);
        assert_eq!(stats.context_panics, 1);
        assert_eq!(stats.messages_processed, 2);
        assert_eq!(stats.avg_processing_time_ns, 200.0);
        assert_eq!(stats.mailbox_full_events, 1);
    }

    #[tokio::test]
    async fn test_start_send_and_stop() {
        let arbiter = Arbiter::builder().name("greeter-arbiter").build().unwrap();
        assert!(arbiter.is_running());
        assert!(Arbiter::current().is_none());

        let address = arbiter.start(|_| Greeter).unwrap();
        let reply = address.send(Greet("test")).await.unwrap();
        assert_eq!(reply, "hello test from greeter-arbiter");

        let current = address.send(WhereAmI).await.unwrap();
        assert_eq!(current.as_deref(), Some("greeter-arbiter"));

        assert!(arbiter.stop());
        assert!(!arbiter.stop());
        arbiter.stopped().await;

        assert!(!arbiter.is_running());
        assert!(!address.connected());
        assert!(matches!(
            arbiter.start(|_| Greeter),
            Err(ActorError::ArbiterStopped { .. })
        ));
        assert_eq!(arbiter.metrics().snapshot().active_contexts, 0);
        arbiter.join().unwrap();
    }

    #[tokio::test]
    async fn test_exec_fn_runs_on_arbiter_thread() {
        let arbiter = Arbiter::builder().name("exec").build().unwrap();
        let (tx, rx) = oneshot::channel();
        arbiter
            .exec_fn(move || {
                let name = thread::current().name().map(str::to_string);
                let _ = tx.send(name);
            })
            .unwrap();

        assert_eq!(rx.await.unwrap().as_deref(), Some("exec"));
        arbiter.stop();
        arbiter.stopped().await;
    }

    #[test]
    fn test_builder_rejects_zero_capacity_mailbox() {
        let err = Arbiter::builder()
            .mailbox_config(MailboxConfig::bounded(0, FullPolicy::Suspend))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = Arbiter::builder()
            .context_config(ContextConfig {
                max_batch: 0,
                ..ContextConfig::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_start_with_zero_capacity_mailbox_fails() {
        let arbiter = Arbiter::new().unwrap();

        let result = arbiter.start_with_mailbox(MailboxConfig::bounded(0, FullPolicy::Suspend), |_| Greeter);
        assert!(matches!(result, Err(ActorError::InvalidConfig { .. })));
        assert_eq!(arbiter.metrics().snapshot().contexts_started, 0);

        let address = arbiter
            .start_with_mailbox(MailboxConfig::bounded(1, FullPolicy::Suspend), |_| Greeter)
            .unwrap();
        let reply = address.send(Greet("bounded")).await.unwrap();
        assert_eq!(reply, format!("hello bounded from {}", arbiter.name()));

        arbiter.stop();
        arbiter.stopped().await;
    }

    struct Fragile;

    #[async_trait(?Send)]
    impl Actor for Fragile {
        async fn started(&mut self, _ctx: &mut Context<Self>) -> anyhow::Result<()> {
            panic!("fragile actor refused to start");
        }
    }

    #[tokio::test]
    async fn test_start_checked_reports_panicking_started_hook() {
        let arbiter = Arbiter::new().unwrap();

        let err = arbiter.start_checked(|_| Fragile).await.unwrap_err();
        assert!(matches!(err, ActorError::StartupFailed { .. }), "{err:?}");
        assert!(arbiter.is_running());

        // The arbiter survives and keeps serving other contexts
        let greeter = arbiter.start(|_| Greeter).unwrap();
        assert!(greeter.send(Greet("after")).await.is_ok());

        arbiter.stop();
        arbiter.stopped().await;
        // Once stopped, a checked start reports the arbiter instead
        let err = arbiter.start_checked(|_| Greeter).await.unwrap_err();
        assert!(matches!(err, ActorError::ArbiterStopped { .. }));
    }
}
