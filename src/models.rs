use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_expected_status() -> u16 { 200 }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Slow,
    Down,
}

/// Outcome of a single probe. `error` is only ever set on `Down` checks that
/// never produced a response (transport failure, timeout, task fault).
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub endpoint: Endpoint,
    #[serde(serialize_with = "environment_name")]
    pub environment: Arc<Environment>,
    pub status: HealthStatus,
    pub error: Option<String>,
    pub latency_ms: Option<f64>,
    pub status_code: Option<u16>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheck {
    pub fn responded(
        environment: Arc<Environment>,
        endpoint: Endpoint,
        status: HealthStatus,
        latency_ms: f64,
        status_code: u16,
    ) -> Self {
        Self {
            endpoint,
            environment,
            status,
            error: None,
            latency_ms: Some(latency_ms),
            status_code: Some(status_code),
            checked_at: Utc::now(),
        }
    }

    pub fn failed(environment: Arc<Environment>, endpoint: Endpoint, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            environment,
            status: HealthStatus::Down,
            error: Some(error.into()),
            latency_ms: None,
            status_code: None,
            checked_at: Utc::now(),
        }
    }
}

fn environment_name<S: Serializer>(env: &Arc<Environment>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&env.name)
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub total_count: usize,
    pub healthy_count: usize,
    pub slow_count: usize,
    pub down_count: usize,
    pub last_updated: DateTime<Utc>,
    pub checks: Vec<HealthCheck>,
}

impl HealthCheckResult {
    /// Folds an ordered batch of checks into a report. Order is preserved.
    pub fn aggregate(checks: Vec<HealthCheck>) -> Self {
        let (mut healthy_count, mut slow_count, mut down_count) = (0, 0, 0);
        for check in &checks {
            match check.status {
                HealthStatus::Healthy => healthy_count += 1,
                HealthStatus::Slow => slow_count += 1,
                HealthStatus::Down => down_count += 1,
            }
        }

        Self {
            total_count: checks.len(),
            healthy_count,
            slow_count,
            down_count,
            last_updated: Utc::now(),
            checks,
        }
    }

    /// Rounded percentage of healthy checks, `None` for an empty report.
    pub fn health_score(&self) -> Option<u8> {
        if self.total_count == 0 {
            return None;
        }
        let pct = self.healthy_count as f64 * 100.0 / self.total_count as f64;
        Some(pct.round() as u8)
    }
}
