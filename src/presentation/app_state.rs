// Shared state for the MCP transports
use crate::application::catalog_service::CatalogService;
use crate::application::query_service::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub queries: QueryService,
}
