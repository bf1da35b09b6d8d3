//! Runtime Configuration Module
//!
//! Provides configuration loading for the actor runtime: mailbox capacity and
//! backpressure policy, execution-loop tuning, arbiter count and assignment,
//! and registry scope. Supports loading from TOML files with
//! environment-specific overrides and `ACTOR__`-prefixed environment variables.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::defaults;

/// Complete runtime configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Arbiter pool settings
    pub system: SystemConfig,

    /// Mailbox settings applied to every context unless overridden
    pub mailbox: MailboxConfig,

    /// Execution loop settings
    pub context: ContextConfig,

    /// Registry settings
    pub registry: RegistryConfig,
}

/// Mailbox capacity
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MailboxCapacity {
    /// Bounded by memory only
    #[default]
    Unbounded,
    /// At most `n` queued envelopes
    Bounded(usize),
}

impl MailboxCapacity {
    /// Maximum number of queued envelopes, if bounded
    pub fn limit(&self) -> Option<usize> {
        match self {
            MailboxCapacity::Unbounded => None,
            MailboxCapacity::Bounded(n) => Some(*n),
        }
    }
}

/// What a push does when a bounded mailbox is full
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FullPolicy {
    /// Fail the push immediately with a backpressure error
    #[default]
    Reject,
    /// Suspend the producer until space frees up
    Suspend,
}

/// What happens to queued envelopes when a context stops
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Deliver everything already queued before the context stops
    #[default]
    Drain,
    /// Drop queued envelopes; their awaiting callers observe the actor as gone
    Discard,
}

/// Mailbox settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MailboxConfig {
    pub capacity: MailboxCapacity,
    pub full_policy: FullPolicy,
    pub close_policy: ClosePolicy,
}

impl MailboxConfig {
    /// Bounded mailbox with the given policy on full
    pub fn bounded(capacity: usize, full_policy: FullPolicy) -> Self {
        Self {
            capacity: MailboxCapacity::Bounded(capacity),
            full_policy,
            close_policy: ClosePolicy::default(),
        }
    }

    /// Replace the close policy
    pub fn with_close_policy(mut self, close_policy: ClosePolicy) -> Self {
        self.close_policy = close_policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == MailboxCapacity::Bounded(0) {
            bail!("mailbox capacity must be at least 1 when bounded");
        }
        Ok(())
    }
}

/// Execution loop settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Envelopes dispatched before the loop yields to sibling contexts
    pub max_batch: usize,

    /// How many times a `stopping` hook may defer termination
    pub max_stop_deferrals: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_batch: defaults::context::MAX_BATCH,
            max_stop_deferrals: defaults::context::MAX_STOP_DEFERRALS,
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch == 0 {
            bail!("context max_batch must be at least 1");
        }
        Ok(())
    }
}

/// How new contexts are assigned to arbiters
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterAssignment {
    #[default]
    RoundRobin,
    /// Pick the arbiter with the fewest live contexts
    LeastLoaded,
}

/// Arbiter pool settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SystemConfig {
    pub name: String,
    pub arbiters: usize,
    pub assignment: ArbiterAssignment,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let arbiters = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(defaults::system::FALLBACK_ARBITERS);

        Self {
            name: defaults::system::NAME.to_string(),
            arbiters,
            assignment: ArbiterAssignment::default(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.arbiters == 0 {
            bail!("system must run at least one arbiter");
        }
        Ok(())
    }
}

/// Where singleton services are scoped
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistryScope {
    /// One instance per arbiter
    PerArbiter,
    /// One instance per process
    #[default]
    Process,
}

/// Registry settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RegistryConfig {
    pub scope: RegistryScope,
}

impl RuntimeConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (ACTOR__ prefix)
        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: RuntimeConfig = builder
            .build()
            .context("Failed to build runtime configuration")?
            .try_deserialize()
            .context("Failed to deserialize runtime configuration")?;

        config.validate()?;
        debug!(?config, "Runtime configuration loaded");
        Ok(config)
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: RuntimeConfig =
            toml::from_str(source).context("Failed to parse runtime configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for values the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        self.system.validate().context("invalid [system] section")?;
        self.mailbox.validate().context("invalid [mailbox] section")?;
        self.context.validate().context("invalid [context] section")?;
        Ok(())
    }
}

/// Convenience function to load configuration from the default location
pub fn load_config(environment: Option<&str>) -> Result<RuntimeConfig> {
    let path = PathBuf::from(defaults::CONFIG_PATH);
    if !path.exists() {
        info!("No runtime config at {:?}, using defaults", path);
        return Ok(RuntimeConfig::default());
    }
    RuntimeConfig::load(&path, environment)
}
