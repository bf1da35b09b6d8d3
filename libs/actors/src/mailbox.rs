//! Actor Mailbox
//!
//! Ordered multi-producer single-consumer queue of envelopes for one context.
//!
//! - [`Mailbox`] is the producer half. Every live `Address`/`Recipient` owns one,
//!   and the number of live producers is tracked so the context can stop once
//!   nobody can reach it any more.
//! - [`MailboxReceiver`] is the consumer half, owned by the context's execution
//!   loop. It pops envelopes, observes stop signals and closes the mailbox.
//!
//! Pushes from one producer are popped in push order. A bounded mailbox that is
//! full either rejects the push or suspends the producer, per [`FullPolicy`].
//! Suspended producers wait in line inside the mailbox and are admitted oldest
//! first as the consumer frees slots; while anyone waits, no new push may jump
//! ahead. After `close()` every push fails, while envelopes already queued can
//! still be popped (drained) or discarded.

use crate::actor::{Actor, ActorId};
use crate::arbiter::ArbiterMetrics;
use crate::envelope::Envelope;
use crate::error::{ActorError, SendError};

use actor_config::{ClosePolicy, FullPolicy, MailboxCapacity, MailboxConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, Notify};
use tracing::debug;

/// State shared by both halves of a mailbox
pub(crate) struct MailboxShared<A: Actor> {
    actor_id: ActorId,
    config: MailboxConfig,
    queues: Mutex<Queues<A>>,
    /// Set under the queue lock, so no push can slip in after close
    closed: AtomicBool,
    /// Live producer handles
    senders: AtomicUsize,
    /// One-shot graceful stop request
    stop_requested: AtomicBool,
    /// Sticky stop request from a shutting-down arbiter
    shutdown: AtomicBool,
    /// Wakes the consumer
    recv_notify: Notify,
    metrics: Arc<ArbiterMetrics>,
}

/// Queued envelopes plus the producers waiting for space, both in arrival order
struct Queues<A: Actor> {
    ready: VecDeque<Envelope<A>>,
    parked: VecDeque<ParkedPush<A>>,
}

impl<A: Actor> Default for Queues<A> {
    fn default() -> Self {
        Self {
            ready: VecDeque::new(),
            parked: VecDeque::new(),
        }
    }
}

/// Envelope of a suspended producer, held until a slot frees up
struct ParkedPush<A: Actor> {
    envelope: Envelope<A>,
    admitted: oneshot::Sender<()>,
}

impl<A: Actor> Queues<A> {
    /// Move parked envelopes into free slots, oldest first
    fn admit_parked(&mut self, limit: Option<usize>) {
        let Some(limit) = limit else {
            return;
        };
        while self.ready.len() < limit {
            let Some(parked) = self.parked.pop_front() else {
                break;
            };
            self.ready.push_back(parked.envelope);
            // Queued even if the producer stopped waiting
            let _ = parked.admitted.send(());
        }
    }
}

impl<A: Actor> MailboxShared<A> {
    pub(crate) fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.recv_notify.notify_one();
    }

    fn close(&self) {
        let parked = {
            let mut queues = self.queues.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut queues.parked)
        };
        // Dropping the admission senders fails every suspended producer
        drop(parked);
    }

    fn take_pending(&self) -> VecDeque<Envelope<A>> {
        std::mem::take(&mut self.queues.lock().ready)
    }
}

/// Arbiter-side control over a context it drives
pub(crate) trait ContextControl: Send + Sync {
    fn actor_id(&self) -> ActorId;

    /// Ask the context to stop; repeated until it does
    fn request_shutdown(&self);

    fn is_closed(&self) -> bool;
}

impl<A: Actor> ContextControl for MailboxShared<A> {
    fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.recv_notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        MailboxShared::is_closed(self)
    }
}

/// Producer half of a mailbox
pub struct Mailbox<A: Actor> {
    shared: Arc<MailboxShared<A>>,
}

impl<A: Actor> Mailbox<A> {
    /// Create a connected producer/consumer pair
    pub fn channel(
        actor_id: ActorId,
        config: MailboxConfig,
        metrics: Arc<ArbiterMetrics>,
    ) -> (Self, MailboxReceiver<A>) {
        let shared = Arc::new(MailboxShared {
            actor_id,
            config,
            queues: Mutex::new(Queues::default()),
            closed: AtomicBool::new(false),
            senders: AtomicUsize::new(1),
            stop_requested: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            recv_notify: Notify::new(),
            metrics,
        });

        let mailbox = Mailbox {
            shared: Arc::clone(&shared),
        };
        (mailbox, MailboxReceiver { shared })
    }

    /// New producer handle over existing shared state
    pub(crate) fn from_shared(shared: Arc<MailboxShared<A>>) -> Self {
        shared.senders.fetch_add(1, Ordering::AcqRel);
        Mailbox { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<MailboxShared<A>> {
        Arc::downgrade(&self.shared)
    }

    pub fn actor_id(&self) -> ActorId {
        self.shared.actor_id
    }

    pub fn capacity(&self) -> MailboxCapacity {
        self.shared.config.capacity
    }

    pub fn full_policy(&self) -> FullPolicy {
        self.shared.config.full_policy
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of queued envelopes
    pub fn len(&self) -> usize {
        self.shared.queues.lock().ready.len()
    }

    /// Producers suspended on a full mailbox
    pub fn parked(&self) -> usize {
        self.shared.queues.lock().parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// Enqueue without ever suspending. A full bounded mailbox fails with
    /// [`SendError::Full`] whatever its policy.
    pub fn try_push(&self, envelope: Envelope<A>) -> Result<(), SendError<Envelope<A>>> {
        self.try_push_with(envelope, |envelope| envelope)
    }

    /// Enqueue honouring the configured full policy: `Reject` fails at once,
    /// `Suspend` waits until the consumer admits the envelope. A suspended
    /// envelope is dropped if the mailbox closes first.
    pub async fn push(&self, envelope: Envelope<A>) -> crate::error::Result<()> {
        match self.push_or_park(envelope) {
            Ok(None) => Ok(()),
            Ok(Some(admitted)) => admitted.await.map_err(|_| ActorError::MailboxClosed),
            Err(err) => Err(err.into()),
        }
    }

    /// Enqueue, or under the suspend policy take a place in line for the next
    /// free slot. The place is taken here, so later pushes never overtake a
    /// suspended one. The returned receiver resolves once the envelope is
    /// queued and fails if the mailbox closes first.
    pub(crate) fn push_or_park(
        &self,
        envelope: Envelope<A>,
    ) -> Result<Option<oneshot::Receiver<()>>, SendError<Envelope<A>>> {
        let mut queues = self.shared.queues.lock();

        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SendError::Closed(envelope));
        }

        let full = match self.shared.config.capacity.limit() {
            Some(limit) => queues.ready.len() >= limit || !queues.parked.is_empty(),
            None => false,
        };
        if !full {
            queues.ready.push_back(envelope);
            drop(queues);
            self.shared.recv_notify.notify_one();
            return Ok(None);
        }

        self.shared.metrics.record_mailbox_full();
        if self.full_policy() == FullPolicy::Reject {
            return Err(SendError::Full(envelope));
        }

        let (admitted, rx) = oneshot::channel();
        queues.parked.push_back(ParkedPush { envelope, admitted });
        Ok(Some(rx))
    }

    /// Capacity and close checks happen before `pack` runs, so a rejected
    /// value comes back to the caller unpacked. Suspended producers count as
    /// occupying the mailbox: nothing jumps the line.
    pub(crate) fn try_push_with<T>(
        &self,
        value: T,
        pack: impl FnOnce(T) -> Envelope<A>,
    ) -> Result<(), SendError<T>> {
        let mut queues = self.shared.queues.lock();

        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SendError::Closed(value));
        }

        if let Some(limit) = self.shared.config.capacity.limit() {
            if queues.ready.len() >= limit || !queues.parked.is_empty() {
                drop(queues);
                self.shared.metrics.record_mailbox_full();
                return Err(SendError::Full(value));
            }
        }

        queues.ready.push_back(pack(value));
        drop(queues);

        self.shared.recv_notify.notify_one();
        Ok(())
    }

    pub(crate) fn same_mailbox(&self, other: &Mailbox<A>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<A: Actor> Clone for Mailbox<A> {
    fn clone(&self) -> Self {
        Mailbox::from_shared(Arc::clone(&self.shared))
    }
}

impl<A: Actor> Drop for Mailbox<A> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last producer gone: let the consumer notice
            self.shared.recv_notify.notify_one();
        }
    }
}

impl<A: Actor> std::fmt::Debug for Mailbox<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("actor_id", &self.shared.actor_id)
            .field("capacity", &self.shared.config.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// What the consumer observed while waiting
pub enum Next<A: Actor> {
    /// Oldest queued envelope
    Envelope(Envelope<A>),
    /// A graceful stop was requested through an address
    StopRequested,
    /// The driving arbiter is shutting down
    Shutdown,
    /// Queue empty and no producer left
    Disconnected,
}

/// Consumer half of a mailbox, owned by the context's execution loop
pub struct MailboxReceiver<A: Actor> {
    shared: Arc<MailboxShared<A>>,
}

impl<A: Actor> MailboxReceiver<A> {
    pub(crate) fn shared(&self) -> Arc<MailboxShared<A>> {
        Arc::clone(&self.shared)
    }

    pub(crate) fn control(&self) -> Arc<dyn ContextControl> {
        self.shared.clone()
    }

    /// Dequeue the oldest envelope without waiting, admitting the oldest
    /// suspended producer into the freed slot
    pub fn pop_next(&mut self) -> Option<Envelope<A>> {
        let mut queues = self.shared.queues.lock();
        let envelope = queues.ready.pop_front();
        if envelope.is_some() {
            queues.admit_parked(self.shared.config.capacity.limit());
        }
        envelope
    }

    /// Wait for the next envelope or signal. Never spins: parks on the
    /// mailbox notifier until a producer or controller wakes it.
    ///
    /// Stop signals take precedence over queued envelopes.
    pub async fn next(&mut self) -> Next<A> {
        let shared = Arc::clone(&self.shared);
        loop {
            let notified = shared.recv_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.shutdown.load(Ordering::Acquire) {
                return Next::Shutdown;
            }
            if self.shared.stop_requested.swap(false, Ordering::AcqRel) {
                return Next::StopRequested;
            }
            if let Some(envelope) = self.pop_next() {
                return Next::Envelope(envelope);
            }
            if self.shared.is_closed() || self.shared.senders.load(Ordering::Acquire) == 0 {
                return Next::Disconnected;
            }

            notified.await;
        }
    }

    /// Refuse further pushes; queued envelopes stay poppable
    pub fn close(&mut self) {
        if !self.shared.is_closed() {
            debug!(actor_id = %self.shared.actor_id, pending = self.len(), "Mailbox closed");
        }
        self.shared.close();
    }

    /// Drop every queued envelope, returning how many were dropped. Callers
    /// awaiting their replies observe the actor as gone.
    pub fn discard_pending(&mut self) -> usize {
        let pending = self.shared.take_pending();
        let count = pending.len();
        drop(pending);
        count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn close_policy(&self) -> ClosePolicy {
        self.shared.config.close_policy
    }

    pub fn len(&self) -> usize {
        self.shared.queues.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live producer handles
    pub fn sender_count(&self) -> usize {
        self.shared.senders.load(Ordering::Acquire)
    }
}

impl<A: Actor> Drop for MailboxReceiver<A> {
    fn drop(&mut self) {
        self.shared.close();
        drop(self.shared.take_pending());
    }
}
