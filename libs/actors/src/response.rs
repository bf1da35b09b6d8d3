//! Handler Responses
//!
//! A handler's return value is turned into the caller's reply through
//! [`MessageResponse`]. Plain values reply immediately; [`ResponseFuture`] and
//! [`ActorResponse::Future`] reply once a future spawned on the actor's
//! context completes, without keeping the handler itself in flight.

use crate::actor::{Actor, Message};
use crate::context::Context;

use futures::future::LocalBoxFuture;
use std::future::Future;
use tokio::sync::oneshot;

/// Destination of a handler's reply
pub trait ResponseChannel<M: Message>: 'static {
    /// The caller stopped waiting
    fn is_canceled(&self) -> bool;

    fn send(self, response: M::Result);
}

impl<M: Message> ResponseChannel<M> for oneshot::Sender<M::Result> {
    fn is_canceled(&self) -> bool {
        self.is_closed()
    }

    fn send(self, response: M::Result) {
        // Caller already gave up; nothing to deliver to
        let _ = oneshot::Sender::send(self, response);
    }
}

/// Fire-and-forget sink
impl<M: Message> ResponseChannel<M> for () {
    fn is_canceled(&self) -> bool {
        true
    }

    fn send(self, _response: M::Result) {}
}

/// Packages a handler's return value into the reply for message `M`
pub trait MessageResponse<A: Actor, M: Message> {
    fn handle<R: ResponseChannel<M>>(self, ctx: &mut Context<A>, tx: Option<R>);
}

/// Reply with an already computed value
pub struct MessageResult<M: Message>(pub M::Result);

impl<A, M> MessageResponse<A, M> for MessageResult<M>
where
    A: Actor,
    M: Message,
{
    fn handle<R: ResponseChannel<M>>(self, _ctx: &mut Context<A>, tx: Option<R>) {
        if let Some(tx) = tx {
            tx.send(self.0);
        }
    }
}

/// Reply computed by a future that runs on the actor's context
pub struct ResponseFuture<I>(LocalBoxFuture<'static, I>);

impl<I> ResponseFuture<I> {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = I> + 'static,
    {
        ResponseFuture(Box::pin(fut))
    }
}

impl<A, M> MessageResponse<A, M> for ResponseFuture<M::Result>
where
    A: Actor,
    M: Message,
{
    fn handle<R: ResponseChannel<M>>(self, ctx: &mut Context<A>, tx: Option<R>) {
        let fut = self.0;
        ctx.spawn(async move {
            let response = fut.await;
            if let Some(tx) = tx {
                tx.send(response);
            }
        });
    }
}

/// Either an immediate reply or a deferred one
pub enum ActorResponse<I> {
    Reply(I),
    Future(ResponseFuture<I>),
}

impl<I> ActorResponse<I> {
    pub fn reply(value: I) -> Self {
        ActorResponse::Reply(value)
    }

    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = I> + 'static,
    {
        ActorResponse::Future(ResponseFuture::new(fut))
    }
}

impl<A, M> MessageResponse<A, M> for ActorResponse<M::Result>
where
    A: Actor,
    M: Message,
{
    fn handle<R: ResponseChannel<M>>(self, ctx: &mut Context<A>, tx: Option<R>) {
        match self {
            ActorResponse::Reply(value) => {
                if let Some(tx) = tx {
                    tx.send(value);
                }
            }
            ActorResponse::Future(fut) => MessageResponse::<A, M>::handle(fut, ctx, tx),
        }
    }
}

macro_rules! simple_result {
    ($($type:ty),* $(,)?) => {
        $(
            impl<A, M> MessageResponse<A, M> for $type
            where
                A: Actor,
                M: Message<Result = $type>,
            {
                fn handle<R: ResponseChannel<M>>(self, _ctx: &mut Context<A>, tx: Option<R>) {
                    if let Some(tx) = tx {
                        tx.send(self);
                    }
                }
            }
        )*
    };
}

simple_result!(
    (),
    bool,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    char,
    String,
);

impl<A, M, I: 'static, E: 'static> MessageResponse<A, M> for Result<I, E>
where
    A: Actor,
    M: Message<Result = Result<I, E>>,
{
    fn handle<R: ResponseChannel<M>>(self, _ctx: &mut Context<A>, tx: Option<R>) {
        if let Some(tx) = tx {
            tx.send(self);
        }
    }
}

impl<A, M, I: 'static> MessageResponse<A, M> for Option<I>
where
    A: Actor,
    M: Message<Result = Option<I>>,
{
    fn handle<R: ResponseChannel<M>>(self, _ctx: &mut Context<A>, tx: Option<R>) {
        if let Some(tx) = tx {
            tx.send(self);
        }
    }
}

impl<A, M, I: 'static> MessageResponse<A, M> for Vec<I>
where
    A: Actor,
    M: Message<Result = Vec<I>>,
{
    fn handle<R: ResponseChannel<M>>(self, _ctx: &mut Context<A>, tx: Option<R>) {
        if let Some(tx) = tx {
            tx.send(self);
        }
    }
}
