//! Runtime defaults
//!
//! Default values and constants shared by the runtime configuration and the
//! actor runtime itself.

/// Default location of the runtime configuration file
pub const CONFIG_PATH: &str = "config/runtime.toml";

/// Prefix for environment variable overrides (`ACTOR__MAILBOX__FULL_POLICY=suspend`)
pub const ENV_PREFIX: &str = "ACTOR";

/// Execution loop defaults
pub mod context {
    /// Envelopes dispatched before a context yields to its siblings
    pub const MAX_BATCH: usize = 16;

    /// Deferrals granted to a `stopping` hook before the stop is forced
    pub const MAX_STOP_DEFERRALS: u32 = 3;
}

/// Arbiter pool defaults
pub mod system {
    pub const NAME: &str = "actor-system";

    /// Used when available parallelism cannot be determined
    pub const FALLBACK_ARBITERS: usize = 1;
}
