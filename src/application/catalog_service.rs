// Catalog service - Builds the per-dashboard variables and metrics documents
use crate::application::variable_resolver::VariableResolver;
use crate::domain::catalog::{MetricEntry, MetricsCatalog, VariableEntry, VariablesCatalog};
use crate::domain::dashboard::DashboardDefinition;
use serde::Serialize;
use thiserror::Error;

pub const URI_SCHEME: &str = "prometheus";
pub const CATALOG_MIME_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("failed to render catalog: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Variables,
    Metrics,
}

impl CatalogKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Variables => "variables",
            Self::Metrics => "metrics",
        }
    }
}

/// Listing entry for one readable catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: &'static str,
}

/// One configured dashboard, parsed once at startup.
#[derive(Debug, Clone)]
pub struct DashboardResource {
    name: String,
    definition: DashboardDefinition,
}

impl DashboardResource {
    pub fn new(name: impl Into<String>, definition: DashboardDefinition) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self, kind: CatalogKind) -> String {
        format!("{}://dashboard/{}/{}", URI_SCHEME, self.name, kind.as_str())
    }

    pub async fn variables_catalog(&self, resolver: &VariableResolver) -> VariablesCatalog {
        let mut variables = Vec::new();
        for variable in self.definition.parse_variables() {
            let values = resolver.resolve(&variable).await;
            variables.push(VariableEntry::new(&variable, values));
        }

        VariablesCatalog {
            dashboard: self.name.clone(),
            dashboard_title: self.definition.title().to_string(),
            variables,
        }
    }

    pub fn metrics_catalog(&self) -> MetricsCatalog {
        let metrics: Vec<MetricEntry> = self
            .definition
            .parse_metrics()
            .into_iter()
            .map(MetricEntry::from)
            .collect();

        MetricsCatalog {
            dashboard: self.name.clone(),
            dashboard_title: self.definition.title().to_string(),
            dashboard_description: self.definition.description().map(str::to_string),
            total_metrics: metrics.len(),
            metrics,
        }
    }

    fn descriptor(&self, kind: CatalogKind) -> ResourceDescriptor {
        let (name, description) = match kind {
            CatalogKind::Variables => (
                format!("{} - Variables", self.name),
                format!(
                    "Template variables of dashboard '{}' with their candidate label values. \
                     Read this before writing PromQL so label filters use real values.",
                    self.name
                ),
            ),
            CatalogKind::Metrics => (
                format!("{} - Metrics", self.name),
                format!(
                    "Every panel query of dashboard '{}' with its title and PromQL expression. \
                     Use these expressions instead of guessing metric names.",
                    self.name
                ),
            ),
        };

        ResourceDescriptor {
            uri: self.uri(kind),
            name,
            description,
            mime_type: CATALOG_MIME_TYPE,
        }
    }
}

/// All configured dashboards, in configuration order.
#[derive(Clone)]
pub struct CatalogService {
    dashboards: Vec<DashboardResource>,
    resolver: VariableResolver,
}

impl CatalogService {
    pub fn new(dashboards: Vec<DashboardResource>, resolver: VariableResolver) -> Self {
        for (index, dashboard) in dashboards.iter().enumerate() {
            if dashboards[..index].iter().any(|d| d.name() == dashboard.name()) {
                tracing::warn!(
                    "Dashboard name '{}' is configured more than once; the first one is served",
                    dashboard.name()
                );
            }
        }

        Self {
            dashboards,
            resolver,
        }
    }

    pub fn dashboards(&self) -> &[DashboardResource] {
        &self.dashboards
    }

    /// Variables resources first, then metrics resources.
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        [CatalogKind::Variables, CatalogKind::Metrics]
            .into_iter()
            .flat_map(|kind| self.dashboards.iter().map(move |d| d.descriptor(kind)))
            .collect()
    }

    /// Renders the catalog addressed by `uri` as pretty-printed JSON.
    pub async fn read_resource(&self, uri: &str) -> Result<String, CatalogError> {
        let (dashboard, kind) = self
            .locate(uri)
            .ok_or_else(|| CatalogError::UnknownResource(uri.to_string()))?;

        let content = match kind {
            CatalogKind::Variables => {
                serde_json::to_string_pretty(&dashboard.variables_catalog(&self.resolver).await)?
            }
            CatalogKind::Metrics => serde_json::to_string_pretty(&dashboard.metrics_catalog())?,
        };

        tracing::debug!("Rendered resource {} ({} bytes)", uri, content.len());
        Ok(content)
    }

    fn locate(&self, uri: &str) -> Option<(&DashboardResource, CatalogKind)> {
        self.dashboards.iter().find_map(|dashboard| {
            [CatalogKind::Variables, CatalogKind::Metrics]
                .into_iter()
                .find(|kind| dashboard.uri(*kind) == uri)
                .map(|kind| (dashboard, kind))
        })
    }
}
