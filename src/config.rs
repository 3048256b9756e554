use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::models::Environment;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    pub environment: Environment,
    /// Seconds to wait after a cycle finishes before the next one starts.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_check_interval() -> u64 { 50 * 60 }
fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_slow_threshold_ms() -> u64 { 2_000 }
fn default_max_concurrency() -> usize { 64 }
fn default_api_port() -> u16 { 3000 }

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: MonitorConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            bail!("check_interval must be greater than zero");
        }
        if self.max_concurrency == 0 {
            bail!("max_concurrency must be greater than zero");
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            bail!("max_concurrency must not exceed {}", Semaphore::MAX_PERMITS);
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        if self.request_timeout_ms <= self.slow_threshold_ms {
            warn!(
                timeout_ms = self.request_timeout_ms,
                slow_threshold_ms = self.slow_threshold_ms,
                "Request timeout does not exceed the slow threshold; endpoints will time out before they can be classified slow"
            );
        }
        Ok(())
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            slow_threshold: Duration::from_millis(self.slow_threshold_ms),
            max_concurrency: self.max_concurrency,
            check_interval: Duration::from_secs(self.check_interval),
        }
    }
}

/// Engine tuning, decoupled from the on-disk config shape.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub request_timeout: Duration,
    pub slow_threshold: Duration,
    pub max_concurrency: usize,
    pub check_interval: Duration,
}
