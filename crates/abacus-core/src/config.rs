//! Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::agent::AgentConfig;
use crate::eval::LatencyProfile;

/// Process-level settings: how many agents to run and how each behaves.
///
/// All durations are milliseconds in the file format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agents: u32,
    pub workers_per_agent: usize,
    pub poll_interval_ms: u64,
    /// Lock staleness bound; 0 disables the TTL entirely.
    pub lock_ttl_ms: u64,
    /// Simulated evaluator latency per operator.
    pub delay_add_ms: u64,
    pub delay_sub_ms: u64,
    pub delay_mul_ms: u64,
    pub delay_div_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agents: 3,
            workers_per_agent: 5,
            poll_interval_ms: 5_000,
            lock_ttl_ms: 60_000,
            delay_add_ms: 10_000,
            delay_sub_ms: 10_000,
            delay_mul_ms: 10_000,
            delay_div_ms: 10_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AppConfig {
    /// Read a JSON config file; missing fields fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn latency(&self) -> LatencyProfile {
        LatencyProfile {
            add: Duration::from_millis(self.delay_add_ms),
            sub: Duration::from_millis(self.delay_sub_ms),
            mul: Duration::from_millis(self.delay_mul_ms),
            div: Duration::from_millis(self.delay_div_ms),
        }
    }

    pub fn lock_ttl(&self) -> Option<Duration> {
        (self.lock_ttl_ms > 0).then(|| Duration::from_millis(self.lock_ttl_ms))
    }

    /// The per-agent slice of this config.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            workers: self.workers_per_agent,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            lock_ttl: self.lock_ttl(),
            latency: self.latency(),
        }
    }
}
