use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod api;
mod config;
mod engine;
mod models;
mod presenter;
mod registry;
mod utils;

use crate::api::DashboardState;
use crate::config::MonitorConfig;
use crate::engine::Monitor;
use crate::presenter::{ConsolePresenter, Presenter, ReportPublisher};
use crate::registry::ApiRegistry;

#[derive(Parser, Debug)]
#[command(name = "api-health-monitor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "HEALTH_MONITOR_CONFIG", default_value = "config.json")]
    config: PathBuf,
    /// Run a single check cycle, print the report and exit
    #[arg(long)]
    once: bool,
    /// Do not start the dashboard HTTP API
    #[arg(long)]
    no_dashboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::setup_console();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let cli = Cli::parse();
    let config = MonitorConfig::load(&cli.config)?;

    let monitor = Arc::new(Monitor::new(config.probe_settings())?);
    let environment = Arc::new(config.environment.clone());

    info!(
        environment = %environment.name,
        owner = %environment.owner,
        "Monitoring {} APIs",
        environment.endpoints.len()
    );

    if cli.once {
        let report = monitor.check_environment(&environment).await;
        ConsolePresenter.present(&report);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(utils::cancel_on_ctrl_c(shutdown.clone()));

    let mut presenters: Vec<Arc<dyn Presenter>> = vec![Arc::new(ConsolePresenter)];
    let mut server = None;

    if !cli.no_dashboard {
        let (publisher, report) = ReportPublisher::channel();
        presenters.push(Arc::new(publisher));

        let state = DashboardState { report, registry: Arc::new(RwLock::new(ApiRegistry::new())) };
        let api_port = config.api_port;
        let server_shutdown = shutdown.clone();
        server = Some(tokio::spawn(async move {
            if let Err(e) = api::start_server(api_port, state, server_shutdown).await {
                error!("Dashboard stopped: {:#}", e);
            }
        }));
    }

    monitor.run(environment, Arc::new(presenters), shutdown).await;

    if let Some(server) = server {
        let _ = server.await;
    }
    info!("Health monitor shut down");

    Ok(())
}
