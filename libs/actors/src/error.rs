//! Runtime Error Types
//!
//! Errors surfaced by message delivery, reply awaiting, arbiter control and
//! registry construction.

use std::fmt;
use thiserror::Error;

/// Main runtime error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// Push after close, or the target context has been torn down
    #[error("mailbox closed")]
    MailboxClosed,

    /// Reply channel dropped without fulfillment
    #[error("actor gone before replying")]
    ActorGone,

    /// Bounded mailbox full under the reject policy
    #[error("mailbox full: backpressure applied")]
    SendBackpressure,

    /// A registry singleton failed its startup hook
    #[error("registry construction failed for {actor_type}: {message}")]
    RegistryConstructionFailed { actor_type: String, message: String },

    /// The startup hook of a freshly started actor failed
    #[error("actor {actor_type} failed to start: {message}")]
    StartupFailed { actor_type: String, message: String },

    /// The arbiter no longer accepts contexts or commands
    #[error("arbiter {arbiter} stopped")]
    ArbiterStopped { arbiter: String },

    /// Called outside of any arbiter thread
    #[error("no arbiter running on this thread")]
    NoArbiter,

    /// Reply not received in time
    #[error("timed out after {timeout_ms}ms waiting for reply")]
    Timeout { timeout_ms: u64 },

    /// The reply was already moved out of its request
    #[error("response already consumed")]
    ResponseConsumed,

    /// Mailbox or context settings rejected before use
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    pub fn registry_construction(actor_type: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RegistryConstructionFailed {
            actor_type: actor_type.into(),
            message: message.to_string(),
        }
    }

    pub fn startup(actor_type: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::StartupFailed {
            actor_type: actor_type.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_config(message: impl fmt::Display) -> Self {
        Self::InvalidConfig {
            message: message.to_string(),
        }
    }

    pub fn arbiter_stopped(arbiter: impl fmt::Display) -> Self {
        Self::ArbiterStopped {
            arbiter: arbiter.to_string(),
        }
    }

    /// Short category label for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            ActorError::MailboxClosed => "mailbox_closed",
            ActorError::ActorGone => "actor_gone",
            ActorError::SendBackpressure => "backpressure",
            ActorError::RegistryConstructionFailed { .. } => "registry",
            ActorError::StartupFailed { .. } => "startup",
            ActorError::ArbiterStopped { .. } => "arbiter_stopped",
            ActorError::NoArbiter => "no_arbiter",
            ActorError::Timeout { .. } => "timeout",
            ActorError::ResponseConsumed => "response_consumed",
            ActorError::InvalidConfig { .. } => "config",
        }
    }

    /// Whether retrying the same operation later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActorError::SendBackpressure
                | ActorError::Timeout { .. }
                | ActorError::RegistryConstructionFailed { .. }
        )
    }
}

/// Push-time failure that hands the undelivered message back
pub enum SendError<M> {
    /// The mailbox is closed
    Closed(M),
    /// The mailbox is bounded, full, and rejects instead of suspending
    Full(M),
}

impl<M> SendError<M> {
    /// Recover the undelivered message
    pub fn into_inner(self) -> M {
        match self {
            SendError::Closed(msg) | SendError::Full(msg) => msg,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SendError::Full(_))
    }
}

impl<M> From<SendError<M>> for ActorError {
    fn from(err: SendError<M>) -> Self {
        match err {
            SendError::Closed(_) => ActorError::MailboxClosed,
            SendError::Full(_) => ActorError::SendBackpressure,
        }
    }
}

impl<M> fmt::Debug for SendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => f.write_str("SendError::Closed(..)"),
            SendError::Full(_) => f.write_str("SendError::Full(..)"),
        }
    }
}

impl<M> fmt::Display for SendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => f.write_str("mailbox closed"),
            SendError::Full(_) => f.write_str("mailbox full"),
        }
    }
}

impl<M> std::error::Error for SendError<M> {}
