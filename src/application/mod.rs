// Application layer - Use cases over dashboards and the metrics backend
pub mod catalog_service;
pub mod metrics_backend;
pub mod query_service;
pub mod variable_resolver;
