// Template variable resolution - turns a variable's query into dropdown values
use crate::application::metrics_backend::{BackendError, MetricsBackend};
use crate::domain::dashboard::Variable;
use crate::domain::prometheus::Series;
use regex::Regex;
use std::sync::{Arc, LazyLock};

// The selector may contain commas inside matchers, so the greedy first group
// leaves the label name as the last top-level argument.
static LABEL_VALUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"label_values\s*\(\s*(?:(.+),\s*)?([^,)]+)\s*\)").expect("label_values pattern")
});

static QUERY_RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^query_result\s*\(").expect("query_result pattern"));

// Known dashboard quirk: `maxmount` is populated from the `mountpoint` label.
const MOUNT_ALIAS_VARIABLE: &str = "maxmount";
const MOUNT_ALIAS_LABEL: &str = "mountpoint";

/// Syntactic shape of a template query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateQuery<'a> {
    /// `label_values(label)` or `label_values(selector, label)`
    LabelValues {
        selector: Option<&'a str>,
        label: &'a str,
    },
    /// PromQL to run as an instant query, `query_result(...)` already stripped
    Promql(&'a str),
}

impl<'a> TemplateQuery<'a> {
    pub fn classify(query: &'a str) -> Self {
        if let Some(captures) = LABEL_VALUES.captures(query) {
            let selector = captures
                .get(1)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty());
            let label = captures.get(2).map_or("", |m| m.as_str().trim());
            return Self::LabelValues { selector, label };
        }

        Self::Promql(unwrap_query_result(query))
    }
}

/// Strips a VictoriaMetrics/Grafana `query_result(...)` wrapper, which plain
/// Prometheus does not understand. Anything else is returned unchanged.
pub fn unwrap_query_result(query: &str) -> &str {
    let trimmed = query.trim();
    if !QUERY_RESULT.is_match(trimmed) {
        return query;
    }
    let Some(open) = trimmed.find('(') else {
        return query;
    };

    let inner_start = open + 1;
    let mut inner_end = trimmed.len();
    let mut depth = 1usize;
    for (offset, ch) in trimmed[inner_start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    inner_end = inner_start + offset;
                    break;
                }
            }
            _ => {}
        }
    }

    let inner = trimmed[inner_start..inner_end].trim();
    tracing::debug!("Stripped query_result wrapper, inner PromQL: {}", inner);
    inner
}

/// Picks candidate values out of instant-query series, deduplicated across
/// all series in first-seen order.
pub fn extract_values(variable_name: &str, series: &[Series]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();

    for item in series {
        let Some(candidate) = series_candidate(variable_name, item, values.is_empty()) else {
            continue;
        };
        if !values.iter().any(|v| v == candidate) {
            values.push(candidate.to_string());
        }
    }

    values
}

fn series_candidate<'s>(variable_name: &str, series: &'s Series, nothing_yet: bool) -> Option<&'s str> {
    let labels = &series.metric;
    let label = if !labels.contains(variable_name) && variable_name == MOUNT_ALIAS_VARIABLE {
        MOUNT_ALIAS_LABEL
    } else {
        variable_name
    };

    if let Some(value) = labels.get(label).filter(|v| !v.is_empty()) {
        return Some(value);
    }

    // Fallbacks only apply until something has been collected.
    if !nothing_yet {
        return None;
    }

    labels.first_user_value().or_else(|| {
        series
            .value
            .as_ref()
            .map(|sample| sample.value.as_str())
            .filter(|v| !v.is_empty())
    })
}

#[derive(Clone)]
pub struct VariableResolver {
    backend: Arc<dyn MetricsBackend>,
}

impl VariableResolver {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Candidate values for a query variable, or `None` when the variable is
    /// not backed by a query. Backend failures degrade to an empty list.
    pub async fn resolve(&self, variable: &Variable) -> Option<Vec<String>> {
        let query = variable.resolvable_query()?;

        match self.resolve_query(&variable.name, query).await {
            Ok(values) => {
                tracing::debug!(
                    "Resolved {} values for variable {}",
                    values.len(),
                    variable.name
                );
                Some(values)
            }
            Err(e) => {
                tracing::error!(
                    variable = %variable.name,
                    query = %query,
                    "Failed to resolve variable values: {}",
                    e
                );
                Some(Vec::new())
            }
        }
    }

    async fn resolve_query(&self, name: &str, query: &str) -> Result<Vec<String>, BackendError> {
        match TemplateQuery::classify(query) {
            TemplateQuery::LabelValues { selector, label } => {
                self.backend.label_values(label, selector).await
            }
            TemplateQuery::Promql(promql) => {
                let response = self.backend.instant_query(promql, None).await?;
                let series = response.data.map(|data| data.series()).unwrap_or_default();
                Ok(extract_values(name, &series))
            }
        }
    }
}
