// Dashboard domain model - Grafana dashboard definitions, variables and metrics
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_DASHBOARD_TITLE: &str = "Unknown Dashboard";
const DEFAULT_PANEL_TITLE: &str = "Untitled";

/// Subset of the Grafana dashboard JSON schema. A malformed entry drops only
/// that entry, never the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardDefinition {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub templating: Option<Templating>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Templating {
    #[serde(default, deserialize_with = "lenient_list")]
    pub list: Vec<VariableDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableDefinition {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub query: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub current: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Panel {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub collapsed: Option<bool>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub panels: Vec<Panel>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub targets: Vec<Target>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
}

impl Panel {
    fn is_collapsed_row(&self) -> bool {
        self.kind.as_deref() == Some("row") && self.collapsed.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default, deserialize_with = "lenient")]
    pub expr: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ref_id: Option<String>,
}

/// A field of the wrong type reads as its default instead of failing the
/// whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// Keeps the well-formed entries of a list and drops the rest.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Array(entries) = raw else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    Query,
    Custom,
    Interval,
    Datasource,
    Textbox,
    Constant,
    Adhoc,
    Other(String),
}

impl VariableKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "query" => Self::Query,
            "custom" => Self::Custom,
            "interval" => Self::Interval,
            "datasource" => Self::Datasource,
            "textbox" => Self::Textbox,
            "constant" => Self::Constant,
            "adhoc" => Self::Adhoc,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Query => "query",
            Self::Custom => "custom",
            Self::Interval => "interval",
            Self::Datasource => "datasource",
            Self::Textbox => "textbox",
            Self::Constant => "constant",
            Self::Adhoc => "adhoc",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dashboard template variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub label: Option<String>,
    pub kind: VariableKind,
    pub query: Option<String>,
    pub current_value: Option<String>,
}

impl Variable {
    /// The template query, if this variable's values come from the backend.
    pub fn resolvable_query(&self) -> Option<&str> {
        match (&self.kind, self.query.as_deref()) {
            (VariableKind::Query, Some(query)) if !query.is_empty() => Some(query),
            _ => None,
        }
    }
}

/// One query target of one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub title: String,
    pub description: Option<String>,
    pub expr: String,
}

impl DashboardDefinition {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_DASHBOARD_TITLE)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parse_variables(&self) -> Vec<Variable> {
        let Some(templating) = &self.templating else {
            return Vec::new();
        };

        templating
            .list
            .iter()
            .filter_map(|definition| {
                let name = definition.name.as_deref().filter(|n| !n.is_empty())?;
                Some(Variable {
                    name: name.to_string(),
                    label: definition.label.clone(),
                    kind: VariableKind::parse(definition.kind.as_deref().unwrap_or_default()),
                    query: definition.query.as_ref().and_then(query_text),
                    current_value: definition.current.as_ref().and_then(current_value),
                })
            })
            .collect()
    }

    pub fn parse_metrics(&self) -> Vec<Metric> {
        flatten_panels(&self.panels)
            .into_iter()
            .flat_map(metrics_from_panel)
            .collect()
    }
}

/// Expands collapsed rows in place. Rows that are not collapsed already have
/// their children as siblings, so they are kept as-is.
pub fn flatten_panels(panels: &[Panel]) -> Vec<&Panel> {
    let mut flat = Vec::with_capacity(panels.len());
    for panel in panels {
        if panel.is_collapsed_row() {
            flat.extend(flatten_panels(&panel.panels));
        } else {
            flat.push(panel);
        }
    }
    flat
}

fn metrics_from_panel(panel: &Panel) -> Vec<Metric> {
    let title = panel.title.as_deref().unwrap_or(DEFAULT_PANEL_TITLE);
    let multi_target = panel.targets.len() > 1;

    panel
        .targets
        .iter()
        .enumerate()
        .filter_map(|(index, target)| {
            let expr = target.expr.as_deref().filter(|e| !e.is_empty())?;
            let title = if multi_target {
                let suffix = target.ref_id.clone().unwrap_or_else(|| index.to_string());
                format!("{} [{}]", title, suffix)
            } else {
                title.to_string()
            };

            Some(Metric {
                title,
                description: panel.description.clone(),
                expr: expr.to_string(),
            })
        })
        .collect()
}

// Older dashboards store the query as a string; newer ones as
// {"query": "...", "refId": "..."}.
fn query_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(query) => Some(query.clone()),
        Value::Object(object) => object
            .get("query")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn current_value(current: &Value) -> Option<String> {
    let current = current.as_object()?;
    current
        .get("value")
        .and_then(selection_text)
        .or_else(|| current.get("text").and_then(selection_text))
}

fn selection_text(raw: &Value) -> Option<String> {
    let text = match raw {
        Value::String(value) => value.clone(),
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
