//! Signal configuration

use crate::signal::Signal;
use std::env;

/// Environment variable enabling the per-sender receiver cache
pub const CACHING_ENV: &str = "UNIFIED_SIGNALS_CACHING";

/// Environment variable enabling dispatch logging
pub const LOGGING_ENV: &str = "UNIFIED_SIGNALS_LOGGING";

/// Signal configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalConfig {
    /// Cache matching receivers per sender
    pub use_caching: bool,

    /// Enable dispatch logging
    pub enable_logging: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            use_caching: false,
            enable_logging: true,
        }
    }
}

impl SignalConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unrecognized values keep the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_caching: parse_flag(env::var(CACHING_ENV).ok().as_deref())
                .unwrap_or(defaults.use_caching),
            enable_logging: parse_flag(env::var(LOGGING_ENV).ok().as_deref())
                .unwrap_or(defaults.enable_logging),
        }
    }
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Signal builder
pub struct SignalBuilder {
    name: String,
    config: SignalConfig,
}

impl SignalBuilder {
    /// Create new signal builder
    pub fn new() -> Self {
        Self {
            name: "signal".to_string(),
            config: SignalConfig::default(),
        }
    }

    /// Set the signal name used in logs and errors
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable/disable the per-sender receiver cache
    pub fn use_caching(mut self, enabled: bool) -> Self {
        self.config.use_caching = enabled;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SignalConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the signal
    pub fn build(self) -> Signal {
        Signal::with_config(self.name, self.config)
    }
}

impl Default for SignalBuilder {
    fn default() -> Self {
        Self::new()
    }
}
