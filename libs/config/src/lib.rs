//! # Actor Runtime Configuration
//!
//! Configuration types and loading for the actor runtime.
//!
//! ## Features
//!
//! - **Mailbox policy**: capacity, reject-or-suspend on full, drain-or-discard on close
//! - **Execution loop tuning**: dispatch batch size and stop deferral bound
//! - **Arbiter pool**: arbiter count and assignment policy
//! - **Registry scope**: per-arbiter or process-wide singletons
//!
//! ## Usage
//!
//! ```rust
//! use actor_config::{FullPolicy, MailboxConfig, RuntimeConfig};
//!
//! let mut config = RuntimeConfig::default();
//! config.mailbox = MailboxConfig::bounded(64, FullPolicy::Suspend);
//! assert!(config.validate().is_ok());
//! ```

pub mod defaults;
pub mod runtime_config;

// Re-export commonly used types
pub use runtime_config::{
    load_config, ArbiterAssignment, ClosePolicy, ContextConfig, FullPolicy, MailboxCapacity,
    MailboxConfig, RegistryConfig, RegistryScope, RuntimeConfig, SystemConfig,
};
