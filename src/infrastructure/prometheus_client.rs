// Prometheus HTTP API client implementation
use crate::application::metrics_backend::{
    BackendError, BackendOperation, FailurePolicy, MetricsBackend,
};
use crate::domain::prometheus::{ApiResponse, LabelSet, QueryResponse};
use crate::infrastructure::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    credentials: Option<Credentials>,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl PrometheusClient {
    pub fn new(
        base_url: &str,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::Config("prometheus url is empty".to_string()));
        }

        // Basic auth only applies when both halves are configured.
        let credentials = match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credentials { username, password })
            }
            _ => None,
        };

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            credentials,
            http,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }

    /// A single round trip: transport, HTTP status, then the API `status` field.
    async fn attempt<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, BackendError> {
        let response = self
            .authorize(request)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let envelope = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        if !envelope.is_success() {
            return Err(BackendError::Api(envelope.error_message()));
        }

        Ok(envelope)
    }

    /// Retries the request per the client's policy, then applies the
    /// operation's failure policy to the final outcome.
    async fn execute<T, F>(
        &self,
        operation: BackendOperation,
        build: F,
    ) -> Result<ApiResponse<T>, BackendError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let outcome = self
            .retry
            .run(operation.as_str(), move || self.attempt::<T>(build()))
            .await;

        match (outcome, operation.failure_policy()) {
            (Ok(envelope), _) => Ok(envelope),
            (Err(e), FailurePolicy::FailClosed) => Err(e),
            (Err(e), FailurePolicy::FailOpen) => {
                tracing::error!(
                    operation = operation.as_str(),
                    "Backend lookup failed, returning empty result: {}",
                    e
                );
                Ok(ApiResponse {
                    status: "success".to_string(),
                    data: None,
                    error_type: None,
                    error: None,
                    warnings: Vec::new(),
                })
            }
        }
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn instant_query(
        &self,
        query: &str,
        time: Option<&str>,
    ) -> Result<QueryResponse, BackendError> {
        let url = self.endpoint("query");
        let mut form = vec![("query", query)];
        if let Some(time) = time {
            form.push(("time", time));
        }

        tracing::debug!("Executing instant query: {}", query);
        self.execute(BackendOperation::InstantQuery, || {
            self.http.post(&url).form(&form)
        })
        .await
    }

    async fn range_query(
        &self,
        query: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<QueryResponse, BackendError> {
        let url = self.endpoint("query_range");
        let form = vec![("query", query), ("start", start), ("end", end), ("step", step)];

        tracing::debug!(
            "Executing range query: {} (start={}, end={}, step={})",
            query,
            start,
            end,
            step
        );
        self.execute(BackendOperation::RangeQuery, || {
            self.http.post(&url).form(&form)
        })
        .await
    }

    async fn label_values(
        &self,
        label: &str,
        selector: Option<&str>,
    ) -> Result<Vec<String>, BackendError> {
        let url = self.endpoint(&format!("label/{}/values", urlencoding::encode(label)));
        let params: Vec<(&str, &str)> = selector.map(|s| ("match[]", s)).into_iter().collect();

        tracing::debug!("Looking up values of label {} (match={:?})", label, selector);
        let envelope: ApiResponse<Vec<String>> = self
            .execute(BackendOperation::LabelValues, || {
                self.http.get(&url).query(&params)
            })
            .await?;

        Ok(envelope.data.unwrap_or_default())
    }

    async fn series(
        &self,
        selector: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<LabelSet>, BackendError> {
        let url = self.endpoint("series");
        let mut params = vec![("match[]", selector)];
        if let Some(start) = start {
            params.push(("start", start));
        }
        if let Some(end) = end {
            params.push(("end", end));
        }

        tracing::debug!("Looking up series matching {}", selector);
        let envelope: ApiResponse<Vec<LabelSet>> = self
            .execute(BackendOperation::Series, || {
                self.http.get(&url).query(&params)
            })
            .await?;

        Ok(envelope.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use std::time::Instant;

    const BACKOFF: Duration = Duration::from_millis(20);

    fn client(server: &MockServer) -> PrometheusClient {
        PrometheusClient::new(&server.base_url(), None, None, Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryPolicy::new(3, BACKOFF))
    }

    #[test]
    fn test_new_rejects_empty_url_and_trims_slash() {
        assert!(PrometheusClient::new(" ", None, None, Duration::from_secs(1)).is_err());

        let client =
            PrometheusClient::new("http://prom:9090/", None, None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://prom:9090");
        assert_eq!(client.endpoint("query"), "http://prom:9090/api/v1/query");
    }

    #[tokio::test]
    async fn test_instant_query_posts_form() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/query")
                    .body_contains("query=up")
                    .body_contains("time=1700000000");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"job":"node"},"value":[1700000000,"1"]}]}}"#);
            })
            .await;

        let response = client(&server)
            .instant_query("up", Some("1700000000"))
            .await
            .unwrap();

        mock.assert_async().await;
        let data = response.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.series()[0].metric.get("job"), Some("node"));
    }

    #[tokio::test]
    async fn test_range_query_sends_window() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/query_range")
                    .body_contains("start=100")
                    .body_contains("end=200")
                    .body_contains("step=1m");
                then.status(200)
                    .body(r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#);
            })
            .await;

        let response = client(&server)
            .range_query("up", "100", "200", "1m")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.data.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_basic_auth_when_both_credentials_set() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/label/job/values")
                    .header("authorization", "Basic dXNlcjpwYXNz");
                then.status(200)
                    .body(r#"{"status":"success","data":["node","api"]}"#);
            })
            .await;

        let client = PrometheusClient::new(
            &server.base_url(),
            Some("user".to_string()),
            Some("pass".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let values = client.label_values("job", None).await.unwrap();
        mock.assert_async().await;
        assert_eq!(values, vec!["node", "api"]);
    }

    #[tokio::test]
    async fn test_label_values_passes_match_selector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/label/instance/values")
                    .query_param("match[]", r#"up{job="x"}"#);
                then.status(200)
                    .body(r#"{"status":"success","data":["a:9100"]}"#);
            })
            .await;

        let values = client(&server)
            .label_values("instance", Some(r#"up{job="x"}"#))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(values, vec!["a:9100"]);
    }

    #[tokio::test]
    async fn test_instant_query_fails_closed_after_three_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/query");
                then.status(503).body("unavailable");
            })
            .await;

        let started = Instant::now();
        let result = client(&server).instant_query("up", None).await;

        mock.assert_hits_async(3).await;
        assert!(started.elapsed() >= BACKOFF * 2);
        match result {
            Err(BackendError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_status_is_retried_and_reported() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/query");
                then.status(200)
                    .body(r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#);
            })
            .await;

        let result = client(&server).instant_query("up{", None).await;

        mock.assert_hits_async(3).await;
        match result {
            Err(BackendError::Api(message)) => assert_eq!(message, "parse error"),
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_label_values_fails_open_after_three_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/label/pod/values");
                then.status(500);
            })
            .await;

        let values = client(&server).label_values("pod", None).await.unwrap();

        mock.assert_hits_async(3).await;
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_series_fails_open_on_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/series");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .body(r#"{"status":"success","data":[]}"#);
            })
            .await;

        let client = PrometheusClient::new(&server.base_url(), None, None, Duration::from_millis(50))
            .unwrap()
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));

        let series = client.series("up", None, None).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_series_returns_label_sets() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/series")
                    .query_param("match[]", "up")
                    .query_param("start", "10");
                then.status(200).body(
                    r#"{"status":"success","data":[{"__name__":"up","job":"node","instance":"a"}]}"#,
                );
            })
            .await;

        let series = client(&server).series("up", Some("10"), None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].first_user_value(), Some("node"));
    }
}
