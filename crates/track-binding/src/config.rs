//! Track binding configuration.
//!
//! Configuration is loaded from environment variables. Every field has a
//! default; a value that is present but cannot be parsed is an error rather
//! than silently falling back.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::binding::RetryPolicy;

/// Default delay between track readiness probes, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default binding actor mailbox capacity.
pub const DEFAULT_MAILBOX_BUFFER: usize = 64;

/// Default membership broadcast capacity.
pub const DEFAULT_MEMBERSHIP_BUS_CAPACITY: usize = 256;

/// Default screen-share target offered when no surface is registered.
pub const DEFAULT_SHARE_TARGET: &str = "screenshare";

/// Track binding configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Delay between readiness probes (default: 500ms).
    pub retry_delay: Duration,

    /// Maximum not-ready probes before giving up. `None` retries forever.
    pub max_retry_attempts: Option<u32>,

    /// Binding actor mailbox capacity (default: 64).
    pub mailbox_buffer: usize,

    /// Membership broadcast channel capacity (default: 256).
    pub membership_bus_capacity: usize,

    /// Fallback screen-share candidate when the registry is empty.
    pub default_share_target: String,

    /// Emit JSON-formatted logs from the binary.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_retry_attempts: None,
            mailbox_buffer: DEFAULT_MAILBOX_BUFFER,
            membership_bus_capacity: DEFAULT_MEMBERSHIP_BUS_CAPACITY,
            default_share_target: DEFAULT_SHARE_TARGET.to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let retry_delay_ms: u64 =
            parse_var(vars, "TB_RETRY_DELAY_MS")?.unwrap_or(DEFAULT_RETRY_DELAY_MS);
        if retry_delay_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "TB_RETRY_DELAY_MS must be greater than zero".to_string(),
            ));
        }

        // 0 keeps the unbounded behavior
        let max_retry_attempts = parse_var::<u32>(vars, "TB_MAX_RETRY_ATTEMPTS")?.filter(|n| *n > 0);

        let mailbox_buffer = parse_var(vars, "TB_MAILBOX_BUFFER")?.unwrap_or(DEFAULT_MAILBOX_BUFFER);
        let membership_bus_capacity = parse_var(vars, "TB_MEMBERSHIP_BUS_CAPACITY")?
            .unwrap_or(DEFAULT_MEMBERSHIP_BUS_CAPACITY);
        if mailbox_buffer == 0 || membership_bus_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "channel capacities must be greater than zero".to_string(),
            ));
        }

        let default_share_target = vars
            .get("TB_DEFAULT_SHARE_TARGET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SHARE_TARGET.to_string());

        let log_json = parse_var(vars, "TB_LOG_JSON")?.unwrap_or(false);

        Ok(Config {
            retry_delay: Duration::from_millis(retry_delay_ms),
            max_retry_attempts,
            mailbox_buffer,
            membership_bus_capacity,
            default_share_target,
            log_json,
        })
    }

    /// Retry policy for binding machines built from this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: self.retry_delay,
            max_attempts: self.max_retry_attempts,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
    }
}
