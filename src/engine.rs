use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ProbeSettings;
use crate::models::{Endpoint, Environment, HealthCheck, HealthCheckResult, HealthStatus};
use crate::presenter::Presenter;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct Monitor {
    settings: ProbeSettings,
    http_client: reqwest::Client,
    concurrency_limiter: Arc<Semaphore>,
}

/// Status-code mismatch always wins over latency.
pub fn classify(latency: Duration, status_code: u16, expected_status: u16, slow_threshold: Duration) -> HealthStatus {
    let mut status = HealthStatus::Healthy;
    if latency > slow_threshold {
        status = HealthStatus::Slow;
    }
    if status_code != expected_status {
        status = HealthStatus::Down;
    }
    status
}

impl Monitor {
    pub fn new(settings: ProbeSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            settings,
            http_client,
            concurrency_limiter: Arc::new(Semaphore::new(settings.max_concurrency)),
        })
    }

    /// Runs one cycle immediately, then one cycle per `check_interval` after
    /// the previous cycle finished, until `shutdown` is cancelled.
    pub async fn run(
        self: Arc<Self>,
        environment: Arc<Environment>,
        presenter: Arc<dyn Presenter>,
        shutdown: CancellationToken,
    ) {
        info!(
            environment = %environment.name,
            owner = %environment.owner,
            endpoints = environment.endpoints.len(),
            interval_secs = self.settings.check_interval.as_secs(),
            "Health monitor started"
        );
        info!("--- Max Concurrency: {} requests ---", self.settings.max_concurrency);

        while !shutdown.is_cancelled() {
            let start_time = Utc::now();
            info!("Starting health check...");

            let monitor = Arc::clone(&self);
            let env = Arc::clone(&environment);
            let sink = Arc::clone(&presenter);
            let cycle = tokio::spawn(async move {
                let report = monitor.check_environment(&env).await;
                sink.present(&report);
                report
            });

            match cycle.await {
                Ok(report) => {
                    let duration = Utc::now() - start_time;
                    info!(
                        healthy = report.healthy_count,
                        slow = report.slow_count,
                        down = report.down_count,
                        "Cycle completed {} checks in {:.2}s.",
                        report.total_count,
                        duration.num_milliseconds() as f64 / 1000.0
                    );
                }
                Err(e) => error!("Health check cycle failed: {}", e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.check_interval) => {}
            }
        }

        info!("Health monitor stopped");
    }

    /// Probes every endpoint concurrently and folds the results, in endpoint order.
    pub async fn check_environment(self: &Arc<Self>, environment: &Arc<Environment>) -> HealthCheckResult {
        let handles: Vec<_> = environment
            .endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let monitor = Arc::clone(self);
                let env = Arc::clone(environment);
                tokio::spawn(async move {
                    let _permit = monitor.concurrency_limiter.acquire().await.ok();
                    monitor.probe(&env, &endpoint).await
                })
            })
            .collect();

        let checks = gather(environment, handles).await;
        HealthCheckResult::aggregate(checks)
    }

    pub async fn probe(&self, environment: &Arc<Environment>, endpoint: &Endpoint) -> HealthCheck {
        let timeout = self.settings.request_timeout;
        let start = Instant::now();

        match tokio::time::timeout(timeout, self.http_client.get(&endpoint.url).send()).await {
            Ok(Ok(response)) => {
                let latency = start.elapsed();
                let code = response.status().as_u16();
                let status = classify(latency, code, endpoint.expected_status, self.settings.slow_threshold);
                debug!(
                    endpoint = %endpoint.name,
                    status_code = code,
                    latency_ms = latency.as_millis() as u64,
                    ?status,
                    "Probe completed"
                );
                HealthCheck::responded(
                    Arc::clone(environment),
                    endpoint.clone(),
                    status,
                    latency.as_secs_f64() * 1000.0,
                    code,
                )
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", anyhow::Error::new(e));
                debug!(endpoint = %endpoint.name, error = %message, "Probe failed");
                HealthCheck::failed(Arc::clone(environment), endpoint.clone(), message)
            }
            Err(_) => {
                debug!(endpoint = %endpoint.name, "Probe timed out after {:?}", timeout);
                HealthCheck::failed(
                    Arc::clone(environment),
                    endpoint.clone(),
                    format!("Request timed out after {}ms", timeout.as_millis()),
                )
            }
        }
    }
}

/// Fan-in in spawn order. A probe task that died is reported as a `Down`
/// check for its endpoint instead of failing the batch.
async fn gather(environment: &Arc<Environment>, handles: Vec<JoinHandle<HealthCheck>>) -> Vec<HealthCheck> {
    join_all(handles)
        .await
        .into_iter()
        .zip(&environment.endpoints)
        .map(|(joined, endpoint)| match joined {
            Ok(check) => check,
            Err(e) => {
                warn!(endpoint = %endpoint.name, "Probe task failed: {}", e);
                HealthCheck::failed(Arc::clone(environment), endpoint.clone(), format!("Probe task failed: {}", e))
            }
        })
        .collect()
}
