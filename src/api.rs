use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::presenter::LatestReport;
use crate::registry::{ApiRegistry, ApiState, NewApi, RegistryError};

#[derive(Clone)]
pub struct DashboardState {
    pub report: LatestReport,
    pub registry: Arc<RwLock<ApiRegistry>>,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match self {
            RegistryError::Empty | RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::Invalid(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub name: String,
    pub url: String,
    pub status: String,
}

pub async fn get_report(State(state): State<DashboardState>) -> Response {
    let latest = state.report.borrow().clone();
    match latest {
        Some(report) => Json(report.as_ref()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "pending" }))).into_response(),
    }
}

pub async fn list_apis(State(state): State<DashboardState>) -> Response {
    let registry = state.registry.read().await;
    Json(registry.list()).into_response()
}

pub async fn register_api(
    State(state): State<DashboardState>,
    Json(api): Json<NewApi>,
) -> Result<Response, RegistryError> {
    let mut registry = state.registry.write().await;
    let added = registry.register(api)?;
    info!(name = %added.name, url = %added.url, "API registered");
    Ok((StatusCode::CREATED, Json(added)).into_response())
}

pub async fn update_status(
    State(state): State<DashboardState>,
    Json(update): Json<StatusUpdate>,
) -> Result<Response, RegistryError> {
    let new_state: ApiState = update.status.parse()?;
    let mut registry = state.registry.write().await;
    let api = registry.set_state(&update.name, &update.url, new_state)?;
    info!(name = %api.name, state = ?new_state, "API status updated");
    Ok(Json(api).into_response())
}

pub async fn get_dashboard(State(state): State<DashboardState>) -> Response {
    let summary = state.registry.read().await.summary();
    Json(summary).into_response()
}

pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/report", get(get_report))
        .route("/api/apis", get(list_apis).post(register_api))
        .route("/api/apis/status", patch(update_status))
        .route("/api/dashboard", get(get_dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: DashboardState, shutdown: CancellationToken) -> Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {}", port))?;
    info!("Dashboard: http://localhost:{}", addr.port());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Dashboard server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Environment, HealthCheck, HealthCheckResult, HealthStatus};
    use crate::presenter::{Presenter, ReportPublisher};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> (ReportPublisher, DashboardState) {
        let (publisher, report) = ReportPublisher::channel();
        let state = DashboardState { report, registry: Arc::new(RwLock::new(ApiRegistry::new())) };
        (publisher, state)
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn report_is_pending_until_first_cycle() {
        let (publisher, state) = state();
        let app = create_router(state);

        let (status, body) = call(app.clone(), "GET", "/api/report", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "pending");

        let env = Arc::new(Environment { name: "Github".into(), owner: "ops".into(), endpoints: vec![] });
        let ep = Endpoint { name: "GitHub API".into(), url: "https://api.github.com".into(), expected_status: 200 };
        publisher.present(&HealthCheckResult::aggregate(vec![HealthCheck::responded(
            env,
            ep,
            HealthStatus::Healthy,
            80.0,
            200,
        )]));

        let (status, body) = call(app, "GET", "/api/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["checks"][0]["status"], "healthy");
        assert_eq!(body["checks"][0]["environment"], "Github");
    }

    #[tokio::test]
    async fn register_then_toggle_status() {
        let (_publisher, state) = state();
        let app = create_router(state);

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/apis",
            Some(json!({ "name": "maps", "url": "https://maps.example", "entity": { "kind": "external", "provider": "Google" } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entity"]["provider"], "Google");

        let (status, body) = call(
            app.clone(),
            "PATCH",
            "/api/apis/status",
            Some(json!({ "name": "maps", "url": "https://maps.example", "status": "Active" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "active");

        let (_, body) = call(app, "GET", "/api/dashboard", None).await;
        assert_eq!(body, json!({ "apis": 1, "internal": 0, "external": 1, "active": 1, "inactive": 0 }));
    }

    #[tokio::test]
    async fn unknown_api_status_update_is_not_found() {
        let (_publisher, state) = state();
        let app = create_router(state);

        let (status, _) = call(
            app.clone(),
            "PATCH",
            "/api/apis/status",
            Some(json!({ "name": "x", "url": "y", "status": "active" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            app,
            "POST",
            "/api/apis",
            Some(json!({ "name": "", "url": "https://x", "entity": { "kind": "internal" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }
}
