//! Type-Erased Message Envelopes
//!
//! An [`Envelope<A>`] is the only thing a mailbox stores. It pairs one message
//! with its optional reply channel and the dispatch function for the target
//! actor, captured when the message is packed. Packing never runs the handler;
//! the handler runs only when the owning context delivers the envelope.

use crate::actor::{Actor, Handler, Message};
use crate::context::Context;
use crate::response::MessageResponse;

use futures::future::LocalBoxFuture;
use tokio::sync::oneshot;

/// Delivery operation for one packed message
pub trait EnvelopeProxy<A: Actor> {
    /// Run the handler against the actor and fulfil the reply channel
    fn handle<'a>(self: Box<Self>, act: &'a mut A, ctx: &'a mut Context<A>) -> LocalBoxFuture<'a, ()>;

    /// Type name of the carried message, used as the dispatch tag in logs
    fn message_type(&self) -> &'static str;

    /// Whether a caller is waiting for the reply
    fn expects_reply(&self) -> bool;
}

/// Uniform mailbox entry for actor `A`
pub struct Envelope<A: Actor>(Box<dyn EnvelopeProxy<A> + Send>);

impl<A: Actor> Envelope<A> {
    /// Pack a message, with a reply channel for request-style sends or `None`
    /// for fire-and-forget
    pub fn new<M>(msg: M, tx: Option<oneshot::Sender<M::Result>>) -> Self
    where
        A: Handler<M>,
        M: Message + Send,
        M::Result: Send,
    {
        Envelope(Box::new(MessageEnvelope { msg, tx }))
    }

    /// Wrap a custom delivery operation
    pub fn from_proxy(proxy: Box<dyn EnvelopeProxy<A> + Send>) -> Self {
        Envelope(proxy)
    }

    pub fn message_type(&self) -> &'static str {
        self.0.message_type()
    }

    pub fn expects_reply(&self) -> bool {
        self.0.expects_reply()
    }

    /// Consume the envelope by delivering it to the actor
    pub(crate) fn deliver<'a>(self, act: &'a mut A, ctx: &'a mut Context<A>) -> LocalBoxFuture<'a, ()> {
        self.0.handle(act, ctx)
    }
}

impl<A: Actor> std::fmt::Debug for Envelope<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("message_type", &self.message_type())
            .field("expects_reply", &self.expects_reply())
            .finish()
    }
}

struct MessageEnvelope<M: Message> {
    msg: M,
    tx: Option<oneshot::Sender<M::Result>>,
}

impl<A, M> EnvelopeProxy<A> for MessageEnvelope<M>
where
    A: Handler<M>,
    M: Message,
{
    fn handle<'a>(self: Box<Self>, act: &'a mut A, ctx: &'a mut Context<A>) -> LocalBoxFuture<'a, ()> {
        let MessageEnvelope { msg, tx } = *self;
        Box::pin(async move {
            let response = <A as Handler<M>>::handle(act, msg, ctx).await;
            MessageResponse::<A, M>::handle(response, ctx, tx);
        })
    }

    fn message_type(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn expects_reply(&self) -> bool {
        self.tx.is_some()
    }
}

/// Converter trait, packs a message into an envelope for actor `A`
pub trait ToEnvelope<A: Actor, M: Message> {
    fn pack(msg: M, tx: Option<oneshot::Sender<M::Result>>) -> Envelope<A>;
}

impl<A, M> ToEnvelope<A, M> for Context<A>
where
    A: Handler<M>,
    M: Message + Send,
    M::Result: Send,
{
    fn pack(msg: M, tx: Option<oneshot::Sender<M::Result>>) -> Envelope<A> {
        Envelope::new(msg, tx)
    }
}
