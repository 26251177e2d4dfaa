// Catalog documents served as read-only resources
use super::dashboard::{Metric, Variable};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VariablesCatalog {
    pub dashboard: String,
    pub dashboard_title: String,
    pub variables: Vec<VariableEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableEntry {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub query: Option<String>,
    pub current_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl VariableEntry {
    pub fn new(variable: &Variable, values: Option<Vec<String>>) -> Self {
        Self {
            name: variable.name.clone(),
            label: variable
                .label
                .clone()
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| variable.name.clone()),
            kind: variable.kind.to_string(),
            query: variable.query.clone(),
            current_value: variable.current_value.clone(),
            values,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsCatalog {
    pub dashboard: String,
    pub dashboard_title: String,
    pub dashboard_description: Option<String>,
    pub total_metrics: usize,
    pub metrics: Vec<MetricEntry>,
}

/// `description` is omitted when empty.
#[derive(Debug, Clone, Serialize)]
pub struct MetricEntry {
    pub title: String,
    pub expr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<Metric> for MetricEntry {
    fn from(metric: Metric) -> Self {
        Self {
            title: metric.title,
            expr: metric.expr,
            description: metric.description.filter(|d| !d.is_empty()),
        }
    }
}
