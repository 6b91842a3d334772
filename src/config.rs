//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] holds everything fixed for the lifetime of a
//! [`Search`](crate::Search): the adapter set and the load-shaping knobs.
//! The timeout is not part of it; every call passes its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters;
use crate::{AdapterConfig, Result, SearchError};

fn default_pacing_delay_ms() -> u64 {
    10
}

fn default_shutdown_grace_ms() -> u64 {
    250
}

fn default_channel_capacity() -> usize {
    16
}

fn millis_ceil(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Configuration for a search engine instance.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Pause between two results emitted by the same source.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
    /// How long a finished search waits for cancelled workers before
    /// aborting them.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Buffer size of the shared result channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// User agent for the HTTP fetcher. `None` uses the fetcher default.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Sources to query, in fan-out order.
    #[serde(default = "adapters::builtin_configs")]
    pub adapters: Vec<AdapterConfig>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            channel_capacity: default_channel_capacity(),
            user_agent: None,
            adapters: adapters::builtin_configs(),
        }
    }
}

impl SearchConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `channel_capacity` must be greater than 0
    /// - adapter names must be unique
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(SearchError::Config(
                "channel_capacity must be greater than 0".into(),
            ));
        }
        for (i, adapter) in self.adapters.iter().enumerate() {
            if self.adapters[..i].iter().any(|a| a.name == adapter.name) {
                return Err(SearchError::Config(format!(
                    "duplicate adapter name '{}'",
                    adapter.name
                )));
            }
        }
        Ok(())
    }

    /// Sets the pacing delay.
    ///
    /// Stored in whole milliseconds, rounded up, so a non-zero delay never
    /// becomes zero.
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay_ms = millis_ceil(delay);
        self
    }

    /// Sets the shutdown grace period, rounded up to whole milliseconds.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = millis_ceil(grace);
        self
    }

    /// Replaces the adapter set.
    pub fn with_adapters(mut self, adapters: Vec<AdapterConfig>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Pacing delay as a `Duration`.
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Shutdown grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
