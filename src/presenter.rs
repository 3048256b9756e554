use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{HealthCheckResult, HealthStatus};

/// Receives every report the monitor produces, once per cycle.
pub trait Presenter: Send + Sync {
    fn present(&self, report: &HealthCheckResult);
}

impl Presenter for Vec<Arc<dyn Presenter>> {
    fn present(&self, report: &HealthCheckResult) {
        for presenter in self {
            presenter.present(report);
        }
    }
}

pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn render(report: &HealthCheckResult) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n📊 API HEALTH REPORT");
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(out, "📅 Last Updated: {}", report.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "📈 Total APIs: {}", report.total_count);
        let _ = writeln!(out, "✅ Healthy: {}", report.healthy_count);
        let _ = writeln!(out, "⚠️  Slow: {}", report.slow_count);
        let _ = writeln!(out, "❌ Down: {}", report.down_count);
        match report.health_score() {
            Some(score) => { let _ = writeln!(out, "🏥 Health Score: {}%", score); }
            None => { let _ = writeln!(out, "🏥 Health Score: N/A"); }
        }

        let _ = writeln!(out, "\n📋 DETAILED RESULTS:");
        let _ = writeln!(out, "------------------------------------------");
        for (index, check) in report.checks.iter().enumerate() {
            let (emoji, label) = match check.status {
                HealthStatus::Healthy => ("✅", "healthy"),
                HealthStatus::Slow => ("⚠️", "slow"),
                HealthStatus::Down => ("❌", "down"),
            };
            let _ = writeln!(out, "{}. {} {}", index + 1, emoji, check.endpoint.name);
            let _ = writeln!(out, "   URL: {}", check.endpoint.url);
            let _ = writeln!(out, "   Status: {}", label);
            if let Some(latency) = check.latency_ms {
                let _ = writeln!(out, "   Latency: {:.0}ms", latency);
            }
            if let Some(error) = &check.error {
                let _ = writeln!(out, "   Error: {}", error);
            }
            out.push('\n');
        }
        out
    }
}

impl Presenter for ConsolePresenter {
    fn present(&self, report: &HealthCheckResult) {
        print!("{}", Self::render(report));
    }
}

pub type LatestReport = watch::Receiver<Option<Arc<HealthCheckResult>>>;

/// Publishes the latest report for the dashboard API.
pub struct ReportPublisher {
    tx: watch::Sender<Option<Arc<HealthCheckResult>>>,
}

impl ReportPublisher {
    pub fn channel() -> (Self, LatestReport) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl Presenter for ReportPublisher {
    fn present(&self, report: &HealthCheckResult) {
        self.tx.send_replace(Some(Arc::new(report.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Environment, HealthCheck};

    fn report() -> HealthCheckResult {
        let env = Arc::new(Environment { name: "Github".into(), owner: "ops".into(), endpoints: vec![] });
        let ep = |name: &str| Endpoint { name: name.into(), url: format!("https://{}.test", name), expected_status: 200 };
        HealthCheckResult::aggregate(vec![
            HealthCheck::responded(env.clone(), ep("posts"), HealthStatus::Healthy, 40.0, 200),
            HealthCheck::failed(env, ep("status"), "Request timed out after 10000ms"),
        ])
    }

    #[test]
    fn render_lists_checks_in_order_with_errors() {
        let text = ConsolePresenter::render(&report());
        assert!(text.contains("🏥 Health Score: 50%"));
        let posts = text.find("1. ✅ posts").unwrap();
        let status = text.find("2. ❌ status").unwrap();
        assert!(posts < status);
        assert!(text.contains("Error: Request timed out after 10000ms"));
    }

    #[test]
    fn render_empty_report_has_no_score() {
        let text = ConsolePresenter::render(&HealthCheckResult::aggregate(Vec::new()));
        assert!(text.contains("Total APIs: 0"));
        assert!(text.contains("Health Score: N/A"));
    }

    #[test]
    fn publisher_replaces_latest_report() {
        let (publisher, rx) = ReportPublisher::channel();
        assert!(rx.borrow().is_none());
        publisher.present(&report());
        assert_eq!(rx.borrow().as_ref().map(|r| r.total_count), Some(2));
    }
}
