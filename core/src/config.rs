//! Client-level configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout used when none (or zero) is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const LOGGING_ENV: &str = "RESTCLIENT_LOGGING";
pub const TIMEOUT_ENV: &str = "RESTCLIENT_TIMEOUT_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Emit one log event per exchange.
    pub logging_enabled: bool,
    /// Client-level timeout; zero means `DEFAULT_TIMEOUT`.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            logging_enabled: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(logging_enabled: bool, timeout: Duration) -> Self {
        Self {
            logging_enabled,
            timeout,
        }
    }

    /// Read `RESTCLIENT_LOGGING` and `RESTCLIENT_TIMEOUT_MS`, falling back to
    /// the defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let logging_enabled = lookup(LOGGING_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.logging_enabled);
        let timeout = lookup(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);
        Self {
            logging_enabled,
            timeout,
        }
    }

    /// The timeout actually in force for the client.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}
