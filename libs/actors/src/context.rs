//! Actor Context
//!
//! A [`Context<A>`] is the sole owner of one actor's lifecycle state and of the
//! continuations the actor spawns. The execution loop in [`run`] pairs it with
//! the actor value and the consumer half of the mailbox, and is the only code
//! that ever dispatches to that actor.
//!
//! ```text
//! Starting ──started() ok──▶ Running ──stop signal──▶ Stopping ──drain──▶ Stopped
//!    │                          ▲                        │
//!    └──started() err───────────┼────────────────────────┼──────────────▶ Stopped
//!                               └──stopping() Continue───┘
//! ```

use crate::actor::{Actor, ActorId, ActorState, Handler, Message, Running};
use crate::address::Address;
use crate::arbiter::ArbiterHandle;
use crate::error::{ActorError, Result};
use crate::mailbox::{Mailbox, MailboxReceiver, MailboxShared, Next};

use actor_config::{ClosePolicy, ContextConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, error, trace, warn};

/// Execution context of one actor
pub struct Context<A: Actor> {
    id: ActorId,
    state: ActorState,
    mailbox: Arc<MailboxShared<A>>,
    arbiter: ArbiterHandle,
    config: ContextConfig,
    /// Continuations spawned by handlers, awaited before `Stopped`
    tasks: JoinSet<()>,
    terminate: bool,
}

impl<A: Actor> Context<A> {
    pub(crate) fn new(mailbox: Arc<MailboxShared<A>>, arbiter: ArbiterHandle, config: ContextConfig) -> Self {
        Self {
            id: mailbox.actor_id(),
            state: ActorState::Starting,
            mailbox,
            arbiter,
            config,
            tasks: JoinSet::new(),
            terminate: false,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    /// Arbiter driving this context
    pub fn arbiter(&self) -> &ArbiterHandle {
        &self.arbiter
    }

    /// New address to this actor
    pub fn address(&self) -> Address<A> {
        Address::new(Mailbox::from_shared(Arc::clone(&self.mailbox)))
    }

    /// Leave `Running` once the current handler returns; the `stopping`
    /// hook still runs and may defer the stop.
    pub fn stop(&mut self) {
        if self.state.is_alive() {
            debug!(actor_id = %self.id, "Context stopping");
            self.state = ActorState::Stopping;
        }
    }

    /// Stop without consulting `stopping`, dropping queued envelopes and
    /// aborting spawned continuations
    pub fn terminate(&mut self) {
        self.terminate = true;
        self.stop();
    }

    /// Run a continuation on this context's arbiter. It runs concurrently with
    /// later handlers and is awaited before the context reaches `Stopped`.
    pub fn spawn<F>(&mut self, fut: F) -> AbortHandle
    where
        F: Future<Output = ()> + 'static,
    {
        trace!(actor_id = %self.id, pending = self.tasks.len() + 1, "Continuation spawned");
        self.tasks.spawn_local(fut)
    }

    /// Send a message to this actor, queued behind everything already pending
    pub fn notify<M>(&mut self, msg: M)
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        if let Err(err) = self.address().do_send(msg) {
            warn!(
                actor_id = %self.id,
                message_type = std::any::type_name::<M>(),
                error = %err,
                "Self notification dropped"
            );
        }
    }

    /// Send a message to this actor after `delay`. The timer does not keep
    /// the actor reachable; it fires into nothing if the actor has stopped.
    pub fn notify_later<M>(&mut self, msg: M, delay: Duration) -> JoinHandle<()>
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        let address = self.address().downgrade();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(address) = address.upgrade() {
                // A closed or full mailbox simply drops the notification
                let _ = address.do_send(msg);
            }
        })
    }

    /// Collect finished continuations without waiting
    fn reap_tasks(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.log_task_result(result);
        }
    }

    async fn join_tasks(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            self.log_task_result(result);
        }
    }

    fn log_task_result(&self, result: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(err) = result {
            if err.is_panic() {
                error!(actor_id = %self.id, "Spawned continuation panicked");
            }
        }
    }
}

impl<A: Actor> std::fmt::Debug for Context<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("arbiter", &self.arbiter.id())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

/// Drive one actor from `Starting` to `Stopped`.
///
/// `started_tx`, if given, receives the outcome of the `started` hook.
pub(crate) async fn run<A: Actor>(
    mut actor: A,
    mut ctx: Context<A>,
    mut receiver: MailboxReceiver<A>,
    started_tx: Option<oneshot::Sender<Result<()>>>,
) -> ActorId {
    let actor_type = std::any::type_name::<A>();
    let id = ctx.id;
    let metrics = Arc::clone(ctx.arbiter.metrics());

    debug!(actor_id = %id, actor_type, arbiter_id = %ctx.arbiter.id(), "Context starting");

    if let Err(err) = actor.started(&mut ctx).await {
        warn!(actor_id = %id, actor_type, error = %err, "Actor failed to start");
        ctx.state = ActorState::Stopped;
        receiver.close();
        receiver.discard_pending();
        ctx.tasks.shutdown().await;
        if let Some(tx) = started_tx {
            let _ = tx.send(Err(ActorError::startup(actor_type, format!("{:#}", err))));
        }
        return id;
    }

    // `started` may already have asked to stop
    if ctx.state == ActorState::Starting {
        ctx.state = ActorState::Running;
    }
    if let Some(tx) = started_tx {
        let _ = tx.send(Ok(()));
    }

    let mut deferrals = 0;
    loop {
        let mut batch = 0;
        while ctx.state == ActorState::Running {
            match receiver.next().await {
                Next::Envelope(envelope) => {
                    let started = Instant::now();
                    envelope.deliver(&mut actor, &mut ctx).await;
                    metrics.record_message_handled(started.elapsed());
                    ctx.reap_tasks();

                    batch += 1;
                    if batch >= ctx.config.max_batch {
                        // Let sibling contexts on this arbiter run
                        batch = 0;
                        tokio::task::yield_now().await;
                    }
                }
                Next::StopRequested => {
                    debug!(actor_id = %id, "Stop requested");
                    ctx.stop();
                }
                Next::Shutdown => ctx.stop(),
                Next::Disconnected => {
                    debug!(actor_id = %id, "No live address left");
                    ctx.stop();
                }
            }
        }

        if ctx.terminate {
            break;
        }

        match actor.stopping(&mut ctx).await {
            Running::Stop => break,
            Running::Continue if ctx.terminate => break,
            Running::Continue if deferrals < ctx.config.max_stop_deferrals => {
                deferrals += 1;
                debug!(actor_id = %id, deferrals, "Stop deferred");
                ctx.state = ActorState::Running;
            }
            Running::Continue => {
                warn!(
                    actor_id = %id,
                    actor_type,
                    deferrals,
                    "Stop deferral limit reached, forcing stop"
                );
                break;
            }
        }
    }

    ctx.state = ActorState::Stopping;
    receiver.close();

    if receiver.close_policy() == ClosePolicy::Drain {
        // A drained handler may still terminate, cutting the drain short
        while !ctx.terminate {
            let Some(envelope) = receiver.pop_next() else {
                break;
            };
            let started = Instant::now();
            envelope.deliver(&mut actor, &mut ctx).await;
            metrics.record_message_handled(started.elapsed());
        }
    }

    let dropped = receiver.discard_pending();
    if dropped > 0 {
        debug!(actor_id = %id, dropped, "Pending envelopes discarded");
    }
    if ctx.terminate {
        ctx.tasks.abort_all();
    }

    ctx.join_tasks().await;
    actor.stopped(&mut ctx).await;
    ctx.state = ActorState::Stopped;

    debug!(actor_id = %id, actor_type, "Context stopped");
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_config::MailboxConfig;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct Journal {
        entries: Rc<RefCell<Vec<String>>>,
        defer: u32,
        fail_start: bool,
    }

    impl Journal {
        fn log(&self, entry: impl Into<String>) {
            self.entries.borrow_mut().push(entry.into());
        }
    }

    #[async_trait(?Send)]
    impl Actor for Journal {
        async fn started(&mut self, _ctx: &mut Context<Self>) -> anyhow::Result<()> {
            if self.fail_start {
                anyhow::bail!("refusing to start");
            }
            self.log("started");
            Ok(())
        }

        async fn stopping(&mut self, _ctx: &mut Context<Self>) -> Running {
            self.log("stopping");
            if self.defer > 0 {
                self.defer -= 1;
                return Running::Continue;
            }
            Running::Stop
        }

        async fn stopped(&mut self, _ctx: &mut Context<Self>) {
            self.log("stopped");
        }
    }

    struct Write(&'static str);

    impl Message for Write {
        type Result = ();
    }

    #[async_trait(?Send)]
    impl Handler<Write> for Journal {
        type Result = ();

        async fn handle(&mut self, msg: Write, ctx: &mut Context<Self>) {
            self.log(msg.0);
            match msg.0 {
                "stop" => ctx.stop(),
                "terminate" => ctx.terminate(),
                "echo" => ctx.notify(Write("echoed")),
                _ => {}
            }
        }
    }

    fn spawn_journal(
        journal: Journal,
        config: MailboxConfig,
    ) -> (Address<Journal>, tokio::task::JoinHandle<ActorId>, oneshot::Receiver<Result<()>>) {
        let (mailbox, receiver) = Mailbox::channel(ActorId::new(), config, Default::default());
        let ctx = Context::new(receiver.shared(), ArbiterHandle::detached(), ContextConfig::default());
        let (tx, rx) = oneshot::channel();
        let task = tokio::task::spawn_local(run(journal, ctx, receiver, Some(tx)));
        (Address::new(mailbox), task, rx)
    }

    #[tokio::test]
    async fn test_lifecycle_order_with_drain() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal { entries: entries.clone(), ..Default::default() };
                let (address, task, started) = spawn_journal(journal, MailboxConfig::default());

                address.do_send(Write("a")).unwrap();
                address.do_send(Write("stop")).unwrap();
                address.do_send(Write("b")).unwrap();
                assert!(started.await.unwrap().is_ok());
                task.await.unwrap();

                // Queued envelopes drain after the stopping hook
                assert_eq!(
                    *entries.borrow(),
                    vec!["started", "a", "stop", "stopping", "b", "stopped"]
                );
                assert!(!address.connected());
            })
            .await;
    }

    #[tokio::test]
    async fn test_terminate_discards_pending() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal { entries: entries.clone(), ..Default::default() };
                let (address, task, _started) = spawn_journal(journal, MailboxConfig::default());

                address.do_send(Write("terminate")).unwrap();
                let late = address.send(Write("never"));
                task.await.unwrap();

                assert_eq!(*entries.borrow(), vec!["started", "terminate", "stopped"]);
                assert_eq!(late.await.unwrap_err(), ActorError::ActorGone);
            })
            .await;
    }

    #[tokio::test]
    async fn test_stop_deferral_is_bounded() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal {
                    entries: entries.clone(),
                    defer: u32::MAX,
                    ..Default::default()
                };
                let (address, task, _started) = spawn_journal(journal, MailboxConfig::default());

                // Each disconnect observation re-enters Stopping
                address.stop();
                drop(address);
                task.await.unwrap();

                let stopping = entries.borrow().iter().filter(|e| *e == "stopping").count();
                let limit = ContextConfig::default().max_stop_deferrals as usize;
                assert_eq!(stopping, limit + 1);
                assert_eq!(entries.borrow().last().map(String::as_str), Some("stopped"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_deferred_stop_keeps_serving() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal { entries: entries.clone(), defer: 1, ..Default::default() };
                let (address, task, _started) = spawn_journal(journal, MailboxConfig::default());

                address.stop();
                tokio::task::yield_now().await;
                address.send(Write("still here")).await.unwrap();
                assert!(address.connected());

                drop(address);
                task.await.unwrap();
                assert!(entries.borrow().contains(&"still here".to_string()));
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_start_reports_error() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal { entries: entries.clone(), fail_start: true, ..Default::default() };
                let (address, task, started) = spawn_journal(journal, MailboxConfig::default());

                let err = started.await.unwrap().unwrap_err();
                assert!(matches!(err, ActorError::StartupFailed { .. }));
                task.await.unwrap();

                // Neither stopping nor stopped run for an actor that never started
                assert!(entries.borrow().is_empty());
                assert!(!address.connected());
            })
            .await;
    }

    #[tokio::test]
    async fn test_notify_and_disconnect() {
        LocalSet::new()
            .run_until(async {
                let entries = Rc::new(RefCell::new(Vec::new()));
                let journal = Journal { entries: entries.clone(), ..Default::default() };
                let (address, task, _started) = spawn_journal(journal, MailboxConfig::default());

                address.do_send(Write("echo")).unwrap();
                drop(address);
                task.await.unwrap();

                assert_eq!(
                    *entries.borrow(),
                    vec!["started", "echo", "echoed", "stopping", "stopped"]
                );
            })
            .await;
    }
}
