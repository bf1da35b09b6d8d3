//! Actor, Message and Handler Contracts
//!
//! An actor is a value whose state is touched only by its own execution loop.
//! It declares one [`Handler`] implementation per [`Message`] type it accepts.
//! Lifecycle hooks run on the same loop as the handlers.

use crate::address::Address;
use crate::arbiter::{Arbiter, ArbiterHandle};
use crate::context::Context;
use crate::error::{ActorError, Result};
use crate::response::MessageResponse;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// Unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId {
    id: Uuid,
}

impl ActorId {
    /// Create new actor ID
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Get UUID
    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.id.simple())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// `started` hook not finished yet
    Starting,
    /// Dispatching envelopes
    Running,
    /// Draining: no new work accepted
    Stopping,
    /// Terminal
    Stopped,
}

impl ActorState {
    pub fn is_alive(&self) -> bool {
        matches!(self, ActorState::Starting | ActorState::Running)
    }
}

/// Answer of the `stopping` hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Running {
    /// Proceed to termination
    Stop,
    /// Not yet: return to `Running`
    Continue,
}

/// Message type
pub trait Message: 'static {
    /// The type of value the handler replies with
    type Result: 'static;
}

/// Trait for actor behavior
///
/// Hooks are async and run on the actor's own arbiter thread, so neither the
/// actor nor the futures it awaits need to be `Send`.
#[async_trait(?Send)]
pub trait Actor: Sized + Unpin + 'static {
    /// Called once when the context leaves `Starting`. An error stops the
    /// context without ever entering `Running`.
    async fn started(&mut self, _ctx: &mut Context<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the context enters `Stopping`. Returning
    /// [`Running::Continue`] defers termination a bounded number of times.
    async fn stopping(&mut self, _ctx: &mut Context<Self>) -> Running {
        Running::Stop
    }

    /// Called once right before the context reaches `Stopped`
    async fn stopped(&mut self, _ctx: &mut Context<Self>) {}

    /// Start this actor on the arbiter driving the current thread
    fn start(self) -> Result<Address<Self>>
    where
        Self: Send,
    {
        let arbiter = Arbiter::current().ok_or(ActorError::NoArbiter)?;
        arbiter.start(|_| self)
    }

    /// Start an actor built by `f` on the given arbiter
    fn start_in<F>(arbiter: &ArbiterHandle, f: F) -> Result<Address<Self>>
    where
        F: FnOnce(&mut Context<Self>) -> Self + Send + 'static,
    {
        arbiter.start(f)
    }
}

/// Handler for one message type
///
/// The handler holds `&mut self` across its awaits, so an actor never has more
/// than one handler in flight.
#[async_trait(?Send)]
pub trait Handler<M: Message>: Actor {
    /// How the handler's return value is packaged into the reply
    type Result: MessageResponse<Self, M>;

    async fn handle(&mut self, msg: M, ctx: &mut Context<Self>) -> Self::Result;
}
