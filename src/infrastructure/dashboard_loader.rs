// Loads Grafana dashboard JSON files from disk
use crate::domain::dashboard::DashboardDefinition;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read dashboard file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dashboard file {} is not valid dashboard JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_dashboard(path: &Path) -> Result<DashboardDefinition, DashboardError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let definition: DashboardDefinition =
        serde_json::from_str(&raw).map_err(|source| DashboardError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        "Loaded dashboard {} from {} ({} top-level panels)",
        definition.title(),
        path.display(),
        definition.panels.len()
    );
    Ok(definition)
}
