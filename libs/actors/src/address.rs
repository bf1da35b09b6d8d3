//! Actor Addresses
//!
//! [`Address<A>`] is the cloneable, thread-safe handle to a running context.
//! [`Recipient<M>`] erases the actor type and keeps only the ability to
//! deliver `M`. Request-style sends return a [`RecipientRequest`] that
//! resolves to the handler's reply.

use crate::actor::{Actor, ActorId, Handler, Message};
use crate::envelope::Envelope;
use crate::error::{ActorError, Result, SendError};
use crate::mailbox::{Mailbox, MailboxShared};

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{trace, warn};

/// Handle to a running actor
pub struct Address<A: Actor> {
    mailbox: Mailbox<A>,
}

impl<A: Actor> Address<A> {
    pub(crate) fn new(mailbox: Mailbox<A>) -> Self {
        Self { mailbox }
    }

    pub fn id(&self) -> ActorId {
        self.mailbox.actor_id()
    }

    /// Whether the mailbox still accepts messages
    pub fn connected(&self) -> bool {
        !self.mailbox.is_closed()
    }

    /// Envelopes waiting in the mailbox
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Enqueue without awaiting a reply. Never suspends, even under the
    /// suspend policy; a full mailbox hands the message back.
    pub fn do_send<M>(&self, msg: M) -> std::result::Result<(), SendError<M>>
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        self.mailbox
            .try_push_with(msg, |msg| Envelope::new(msg, None))
    }

    /// Enqueue and return a handle resolving to the handler's reply.
    ///
    /// Push failures are recorded in the handle. Under the suspend policy a
    /// full mailbox parks the envelope in the mailbox's line of waiting
    /// producers, so a later send from the same caller never overtakes it.
    pub fn send<M>(&self, msg: M) -> RecipientRequest<M>
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope::new(msg, Some(tx));

        match self.mailbox.push_or_park(envelope) {
            Ok(None) => RecipientRequest::waiting(rx),
            Ok(Some(admitted)) => {
                trace!(actor_id = %self.id(), "Mailbox full, send parked");
                RecipientRequest::queued(admitted, rx)
            }
            Err(err) => {
                let err = ActorError::from(err);
                warn!(
                    actor_id = %self.id(),
                    message_type = std::any::type_name::<M>(),
                    error = %err,
                    "Send rejected"
                );
                RecipientRequest::failed(err)
            }
        }
    }

    /// Ask the context to stop gracefully. It finishes the handler in
    /// flight, then runs its stopping hook.
    pub fn stop(&self) {
        self.mailbox.request_stop();
    }

    /// Erase the actor type, keeping only the ability to deliver `M`
    pub fn recipient<M>(self) -> Recipient<M>
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        Recipient::from(self)
    }

    /// Handle that does not keep the context reachable
    pub fn downgrade(&self) -> WeakAddress<A> {
        WeakAddress {
            id: self.id(),
            mailbox: self.mailbox.downgrade(),
        }
    }
}

impl<A: Actor> Clone for Address<A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Actor> PartialEq for Address<A> {
    fn eq(&self, other: &Self) -> bool {
        self.mailbox.same_mailbox(&other.mailbox)
    }
}

impl<A: Actor> Eq for Address<A> {}

impl<A: Actor> Hash for Address<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl<A: Actor> fmt::Debug for Address<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("actor_id", &self.id())
            .field("connected", &self.connected())
            .finish()
    }
}

/// Non-owning address
pub struct WeakAddress<A: Actor> {
    id: ActorId,
    mailbox: Weak<MailboxShared<A>>,
}

impl<A: Actor> WeakAddress<A> {
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Strong address, if the context is still accepting messages
    pub fn upgrade(&self) -> Option<Address<A>> {
        let shared = self.mailbox.upgrade()?;
        if shared.is_closed() {
            return None;
        }
        Some(Address::new(Mailbox::from_shared(shared)))
    }
}

impl<A: Actor> Clone for WeakAddress<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for WeakAddress<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakAddress").field(&self.id).finish()
    }
}

trait MessageSender<M: Message>: Send + Sync {
    fn do_send(&self, msg: M) -> std::result::Result<(), SendError<M>>;
    fn send(&self, msg: M) -> RecipientRequest<M>;
    fn connected(&self) -> bool;
    fn actor_id(&self) -> ActorId;
    fn boxed(&self) -> Box<dyn MessageSender<M>>;
}

impl<A, M> MessageSender<M> for Address<A>
where
    A: Handler<M>,
    M: Message + Send,
    M::Result: Send,
{
    fn do_send(&self, msg: M) -> std::result::Result<(), SendError<M>> {
        Address::do_send(self, msg)
    }

    fn send(&self, msg: M) -> RecipientRequest<M> {
        Address::send(self, msg)
    }

    fn connected(&self) -> bool {
        Address::connected(self)
    }

    fn actor_id(&self) -> ActorId {
        self.id()
    }

    fn boxed(&self) -> Box<dyn MessageSender<M>> {
        Box::new(self.clone())
    }
}

/// Type-erased address that can deliver exactly one message type
pub struct Recipient<M: Message> {
    sender: Box<dyn MessageSender<M>>,
}

impl<M: Message> Recipient<M> {
    pub fn actor_id(&self) -> ActorId {
        self.sender.actor_id()
    }

    pub fn connected(&self) -> bool {
        self.sender.connected()
    }

    pub fn do_send(&self, msg: M) -> std::result::Result<(), SendError<M>> {
        self.sender.do_send(msg)
    }

    pub fn send(&self, msg: M) -> RecipientRequest<M> {
        self.sender.send(msg)
    }
}

impl<A, M> From<Address<A>> for Recipient<M>
where
    A: Handler<M>,
    M: Message + Send,
    M::Result: Send,
{
    fn from(address: Address<A>) -> Self {
        Recipient {
            sender: Box::new(address),
        }
    }
}

impl<M: Message> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Recipient {
            sender: self.sender.boxed(),
        }
    }
}

impl<M: Message> PartialEq for Recipient<M> {
    fn eq(&self, other: &Self) -> bool {
        self.actor_id() == other.actor_id()
    }
}

impl<M: Message> Eq for Recipient<M> {}

impl<M: Message> fmt::Debug for Recipient<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient")
            .field("actor_id", &self.actor_id())
            .field("message_type", &std::any::type_name::<M>())
            .finish()
    }
}

enum RequestState<M: Message> {
    /// Envelope parked on a full mailbox
    Queued {
        admitted: oneshot::Receiver<()>,
        rx: oneshot::Receiver<M::Result>,
    },
    Waiting(oneshot::Receiver<M::Result>),
    /// The push itself failed
    Failed(ActorError),
    Resolved(Result<M::Result>),
    Consumed,
}

enum Step<T> {
    Pushed,
    Failed(ActorError),
    Done(Result<T>),
}

/// Pending reply of a request-style send
///
/// Awaiting the request moves the reply out. [`RecipientRequest::response`]
/// instead caches it so it can be read any number of times; the handler runs
/// once either way.
pub struct RecipientRequest<M: Message> {
    state: RequestState<M>,
}

// No field is ever pinned structurally
impl<M: Message> Unpin for RecipientRequest<M> {}

impl<M: Message> RecipientRequest<M> {
    fn waiting(rx: oneshot::Receiver<M::Result>) -> Self {
        Self {
            state: RequestState::Waiting(rx),
        }
    }

    fn queued(admitted: oneshot::Receiver<()>, rx: oneshot::Receiver<M::Result>) -> Self {
        Self {
            state: RequestState::Queued { admitted, rx },
        }
    }

    fn failed(err: ActorError) -> Self {
        Self {
            state: RequestState::Failed(err),
        }
    }

    /// The error recorded if the message never reached the mailbox
    pub fn send_error(&self) -> Option<&ActorError> {
        match &self.state {
            RequestState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Wait for the reply and keep it cached in the request
    pub async fn response(&mut self) -> Result<&M::Result> {
        futures::future::poll_fn(|cx| self.poll_resolve(cx)).await;
        match &self.state {
            RequestState::Resolved(Ok(value)) => Ok(value),
            RequestState::Resolved(Err(err)) | RequestState::Failed(err) => Err(err.clone()),
            _ => Err(ActorError::ResponseConsumed),
        }
    }

    /// Wait for the reply, failing with [`ActorError::Timeout`] past `timeout`
    pub async fn timeout(self, timeout: Duration) -> Result<M::Result> {
        tokio::time::timeout(timeout, self)
            .await
            .map_err(|_| ActorError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    /// Drive the request until it reaches a terminal state
    fn poll_resolve(&mut self, cx: &mut TaskContext<'_>) -> Poll<()> {
        loop {
            let step = match &mut self.state {
                RequestState::Queued { admitted, .. } => match Pin::new(admitted).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(())) => Step::Pushed,
                    // Mailbox closed while the envelope waited for space
                    Poll::Ready(Err(_)) => Step::Failed(ActorError::MailboxClosed),
                },
                RequestState::Waiting(rx) => match Pin::new(rx).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(value)) => Step::Done(Ok(value)),
                    // Reply channel dropped unfulfilled
                    Poll::Ready(Err(_)) => Step::Done(Err(ActorError::ActorGone)),
                },
                RequestState::Failed(_) | RequestState::Resolved(_) | RequestState::Consumed => {
                    return Poll::Ready(())
                }
            };

            self.state = match step {
                Step::Pushed => match std::mem::replace(&mut self.state, RequestState::Consumed) {
                    RequestState::Queued { rx, .. } => RequestState::Waiting(rx),
                    other => other,
                },
                Step::Failed(err) => RequestState::Failed(err),
                Step::Done(result) => RequestState::Resolved(result),
            };
        }
    }
}

/// Awaiting moves the reply out of the handle. Awaiting the same handle a
/// second time yields [`ActorError::ResponseConsumed`]; callers that need to
/// read the outcome more than once should use [`RecipientRequest::response`],
/// which caches it.
impl<M: Message> Future for RecipientRequest<M> {
    type Output = Result<M::Result>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.poll_resolve(cx).is_pending() {
            return Poll::Pending;
        }

        match std::mem::replace(&mut this.state, RequestState::Consumed) {
            RequestState::Resolved(result) => Poll::Ready(result),
            RequestState::Failed(err) => {
                this.state = RequestState::Failed(err.clone());
                Poll::Ready(Err(err))
            }
            _ => Poll::Ready(Err(ActorError::ResponseConsumed)),
        }
    }
}

impl<M: Message> fmt::Debug for RecipientRequest<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            RequestState::Queued { .. } => "queued",
            RequestState::Waiting(_) => "waiting",
            RequestState::Failed(_) => "failed",
            RequestState::Resolved(_) => "resolved",
            RequestState::Consumed => "consumed",
        };
        f.debug_struct("RecipientRequest").field("state", &state).finish()
    }
}
