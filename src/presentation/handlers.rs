// HTTP routes - health check plus the streamable HTTP MCP endpoint
use crate::presentation::mcp::DashboardServer;
use axum::{routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use tower_http::trace::TraceLayer;

pub fn router(server: DashboardServer) -> Router {
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .route("/healthz", get(health_check))
        .nest_service("/mcp", mcp)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}
