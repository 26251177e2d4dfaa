// Query service - Foreground PromQL tools exposed to agents
use crate::application::metrics_backend::MetricsBackend;
use std::sync::Arc;

pub const DEFAULT_STEP: &str = "1m";

/// Text handed back to the agent. Backend failures are reported in-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn success(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn failure(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

#[derive(Clone)]
pub struct QueryService {
    backend: Arc<dyn MetricsBackend>,
}

impl QueryService {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    pub async fn instant_query(&self, query: &str, time: Option<&str>) -> ToolOutput {
        tracing::info!("Executing Prometheus query: {}", truncate(query, 100));

        match self.backend.instant_query(query, time).await {
            Ok(response) => {
                let count = response.data.as_ref().map_or(0, |data| data.len());
                tracing::info!("Query succeeded with {} results", count);
                render(&response)
            }
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                ToolOutput::failure(format!("Query failed: {}", e))
            }
        }
    }

    pub async fn range_query(
        &self,
        query: &str,
        start: &str,
        end: &str,
        step: Option<&str>,
    ) -> ToolOutput {
        let step = step.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_STEP);
        tracing::info!(
            "Executing Prometheus range query: {} (start={}, end={}, step={})",
            truncate(query, 100),
            start,
            end,
            step
        );

        match self.backend.range_query(query, start, end, step).await {
            Ok(response) => {
                let count = response.data.as_ref().map_or(0, |data| data.len());
                tracing::info!("Range query succeeded with {} series", count);
                render(&response)
            }
            Err(e) => {
                tracing::error!("Range query failed: {}", e);
                ToolOutput::failure(format!("Range query failed: {}", e))
            }
        }
    }

    /// Label sets of the series matching `selector`, as a JSON array.
    pub async fn series(&self, selector: &str, start: Option<&str>, end: Option<&str>) -> ToolOutput {
        tracing::info!("Looking up series: {}", truncate(selector, 100));

        match self.backend.series(selector, start, end).await {
            Ok(label_sets) => {
                tracing::info!("Series lookup matched {} series", label_sets.len());
                render(&label_sets)
            }
            Err(e) => {
                tracing::error!("Series lookup failed: {}", e);
                ToolOutput::failure(format!("Series lookup failed: {}", e))
            }
        }
    }
}

fn render<T: serde::Serialize>(response: &T) -> ToolOutput {
    match serde_json::to_string_pretty(response) {
        Ok(text) => ToolOutput::success(text),
        Err(e) => ToolOutput::failure(format!("Failed to render response: {}", e)),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::variable_resolver::tests::FakeBackend;
    use serde_json::Value;

    #[tokio::test]
    async fn test_instant_query_renders_full_response() {
        let backend = Arc::new(FakeBackend {
            instant_body: Some(
                r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"job":"node"},"value":[1,"1"]}]}}"#,
            ),
            ..Default::default()
        });
        let service = QueryService::new(backend.clone());

        let output = service.instant_query("up", Some("1")).await;
        assert!(!output.is_error);
        let json: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["result"][0]["metric"]["job"], "node");
        assert_eq!(backend.calls(), vec!["query:up"]);
    }

    #[tokio::test]
    async fn test_failures_are_reported_as_text() {
        let backend = Arc::new(FakeBackend {
            fail: true,
            ..Default::default()
        });
        let service = QueryService::new(backend);

        let output = service.instant_query("up", None).await;
        assert!(output.is_error);
        assert!(output.text.starts_with("Query failed: "));

        let output = service.range_query("up", "1", "2", None).await;
        assert!(output.is_error);
        assert!(output.text.starts_with("Range query failed: "));
    }

    #[tokio::test]
    async fn test_range_query_defaults_step() {
        let backend = Arc::new(FakeBackend::default());
        let service = QueryService::new(backend.clone());

        let output = service.range_query("up", "100", "200", None).await;
        assert!(!output.is_error);
        service.range_query("up", "100", "200", Some("5m")).await;
        assert_eq!(
            backend.calls(),
            vec!["range:up:100:200:1m", "range:up:100:200:5m"]
        );
    }

    #[tokio::test]
    async fn test_series_renders_label_sets() {
        let backend = Arc::new(FakeBackend {
            label_sets: vec![[("__name__", "up"), ("job", "node")].into_iter().collect()],
            ..Default::default()
        });
        let service = QueryService::new(backend.clone());

        let output = service.series("up{job=\"node\"}", None, None).await;
        assert!(!output.is_error);
        let json: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(json, serde_json::json!([{"__name__": "up", "job": "node"}]));
        assert_eq!(backend.calls(), vec!["series:up{job=\"node\"}"]);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 100), "abc");
        assert_eq!(truncate("héllo", 2), "hé");
    }
}
