// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod dashboard_loader;
pub mod logging;
pub mod prometheus_client;
pub mod retry;
