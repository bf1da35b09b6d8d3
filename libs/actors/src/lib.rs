//! Actor Runtime
//!
//! Message-delivery and scheduling substrate for actors: arbiters drive
//! per-actor contexts, contexts pop type-erased envelopes from their mailbox
//! and dispatch them to typed handlers, and callers on any thread talk to an
//! actor only through its [`Address`] or a [`Recipient`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐          ┌──────────────────────────────────┐
//! │ caller (any thread)    │          │ Arbiter thread (LocalSet)        │
//! │                        │  push    │                                  │
//! │  Address<A>::send(M) ──┼─────────▶│  Mailbox<A> ──pop──▶ Context<A>  │
//! │        │               │ Envelope │                        │         │
//! │        ▼               │          │              Handler<M>::handle  │
//! │  RecipientRequest<M> ◀─┼──────────┼──── oneshot ◀── MessageResponse  │
//! └────────────────────────┘  reply   └──────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **Per-sender FIFO**: envelopes pushed by one sender are handled in push order
//! - **Mutual exclusion**: at most one handler runs per actor at any instant
//! - **No silent hangs**: a reply channel is either fulfilled or dropped, so an
//!   awaiting caller always observes a value or [`ActorError::ActorGone`]
//! - **Bounded starvation**: contexts yield to siblings after `max_batch` envelopes
//!
//! # Examples
//!
//! ```rust,no_run
//! use actor_runtime::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter {
//!     n: u64,
//! }
//!
//! impl Actor for Counter {}
//!
//! struct Increment(u64);
//!
//! impl Message for Increment {
//!     type Result = u64;
//! }
//!
//! #[async_trait(?Send)]
//! impl Handler<Increment> for Counter {
//!     type Result = u64;
//!
//!     async fn handle(&mut self, msg: Increment, _ctx: &mut Context<Self>) -> u64 {
//!         self.n += msg.0;
//!         self.n
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let arbiter = Arbiter::new()?;
//! let counter = arbiter.start(|_| Counter::default())?;
//! assert_eq!(counter.send(Increment(5)).await?, 5);
//! assert_eq!(counter.send(Increment(3)).await?, 8);
//! arbiter.stop();
//! arbiter.stopped().await;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod address;
pub mod arbiter;
pub mod context;
pub mod envelope;
pub mod error;
pub mod mailbox;
pub mod registry;
pub mod response;
pub mod system;

pub use actor::{Actor, ActorId, ActorState, Handler, Message, Running};
pub use address::{Address, Recipient, RecipientRequest, WeakAddress};
pub use arbiter::{Arbiter, ArbiterBuilder, ArbiterHandle, ArbiterId, ArbiterMetrics, ArbiterStats};
pub use context::Context;
pub use envelope::{Envelope, EnvelopeProxy, ToEnvelope};
pub use error::{ActorError, Result, SendError};
pub use mailbox::{Mailbox, MailboxReceiver, Next};
pub use registry::{ArbiterService, Registry, SystemRegistry};
pub use response::{ActorResponse, MessageResponse, MessageResult, ResponseChannel, ResponseFuture};
pub use system::System;

pub use actor_config::{
    ArbiterAssignment, ClosePolicy, ContextConfig, FullPolicy, MailboxCapacity, MailboxConfig,
    RegistryScope, RuntimeConfig,
};

/// Everything needed to define and run actors
pub mod prelude {
    pub use crate::{
        Actor, ActorError, ActorResponse, Address, Arbiter, ArbiterHandle, ArbiterService, Context,
        Handler, Message, MessageResult, Recipient, Registry, ResponseFuture, Running, System,
    };
    pub use async_trait::async_trait;
}
