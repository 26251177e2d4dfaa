// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use crate::application::catalog_service::{CatalogService, DashboardResource};
use crate::application::query_service::QueryService;
use crate::application::variable_resolver::VariableResolver;
use crate::infrastructure::config::{load_config, Transport};
use crate::infrastructure::dashboard_loader::load_dashboard;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::prometheus_client::PrometheusClient;
use crate::infrastructure::retry::RetryPolicy;
use crate::presentation::app_state::AppState;
use crate::presentation::mcp::DashboardServer;
use crate::presentation::{handlers, stdio};

/// Serve Grafana dashboard metadata and Prometheus queries over MCP.
#[derive(Debug, Parser)]
#[command(name = "dash2insight", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "DASH2INSIGHT_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured transport
    #[arg(long, value_enum)]
    transport: Option<Transport>,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(&cli.config)?;
    init_logging(&config.logging)?;

    // Create backend (infrastructure layer)
    let settings = &config.prometheus;
    let backend = Arc::new(
        PrometheusClient::new(
            &settings.url,
            settings.username.clone(),
            settings.password.clone(),
            Duration::from_secs(settings.timeout),
        )?
        .with_retry(RetryPolicy::new(
            settings.retries,
            Duration::from_millis(settings.retry_backoff_ms),
        )),
    );
    tracing::info!("Using Prometheus at {}", backend.base_url());

    // Dashboards are parsed once; a broken file stops startup
    let mut dashboards = Vec::with_capacity(config.dashboards.len());
    for dashboard in &config.dashboards {
        let definition = load_dashboard(&dashboard.path)
            .with_context(|| format!("failed to load dashboard '{}'", dashboard.name))?;
        dashboards.push(DashboardResource::new(&dashboard.name, definition));
    }

    // Create services (application layer)
    let catalog = CatalogService::new(dashboards, VariableResolver::new(backend.clone()));
    let queries = QueryService::new(backend);
    tracing::info!("Loaded {} dashboards", catalog.dashboards().len());

    let server = DashboardServer::new(Arc::new(AppState { catalog, queries }));

    match cli.transport.unwrap_or(config.server.transport) {
        Transport::Stdio => stdio::serve_stdio(server).await,
        Transport::Http => {
            let addr = cli.bind.unwrap_or(config.server.bind_addr);
            let router = handlers::router(server);
            tracing::info!("Starting dash2insight on {}", addr);
            axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
            Ok(())
        }
    }
}
