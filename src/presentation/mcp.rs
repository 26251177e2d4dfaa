// MCP server - dashboard resources, the query guide prompt and PromQL tools
use crate::application::catalog_service::{CatalogError, ResourceDescriptor};
use crate::application::query_service::{ToolOutput, DEFAULT_STEP};
use crate::presentation::app_state::AppState;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    Annotated, CallToolResult, Content, GetPromptRequestParams, GetPromptResult, Implementation,
    JsonObject, ListPromptsResult, ListResourcesResult, PaginatedRequestParams, Prompt,
    PromptArgument, PromptMessage, PromptMessageRole, RawResource, ReadResourceRequestParams,
    ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub const SERVER_NAME: &str = "dash2insight";
pub const PROMPT_QUERY_GUIDE: &str = "metrics_query_guide";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InstantQueryParams {
    /// PromQL expression, e.g. up{job="prometheus"} or rate(http_requests_total[5m])
    pub query: String,
    /// Optional evaluation time, RFC3339 (2023-01-01T00:00:00Z) or Unix timestamp. Defaults to now.
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RangeQueryParams {
    /// PromQL expression taken from the metrics resource
    pub query: String,
    /// Start time, RFC3339 or Unix timestamp
    pub start: String,
    /// End time, RFC3339 or Unix timestamp
    pub end: String,
    /// Resolution step such as '1m', '5m' or '1h'. Defaults to 1m.
    #[serde(default)]
    pub step: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SeriesParams {
    /// Series selector, e.g. node_load1{job="node"}
    pub selector: String,
    /// Optional start of the lookup window, RFC3339 or Unix timestamp
    #[serde(default)]
    pub start: Option<String>,
    /// Optional end of the lookup window, RFC3339 or Unix timestamp
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Clone)]
pub struct DashboardServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DashboardServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Run a Prometheus instant query and return the result at one point in time.\n\nBefore using this tool, read the dashboard resources: 'prometheus://dashboard/{dashboard}/metrics' lists every available metric and 'prometheus://dashboard/{dashboard}/variables' lists variables and label values. Do not guess metric names."
    )]
    async fn prometheus_query(
        &self,
        Parameters(params): Parameters<InstantQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        require(&[("query", params.query.as_str())])?;
        let output = self
            .state
            .queries
            .instant_query(&params.query, params.time.as_deref())
            .await;
        Ok(tool_result(output))
    }

    #[tool(
        description = "Run a Prometheus range query over [start, end] at a fixed step, suited to time-series charts.\n\nBefore using this tool, read the dashboard resources: 'prometheus://dashboard/{dashboard}/metrics' lists every available metric and 'prometheus://dashboard/{dashboard}/variables' lists variables and label values. Do not guess metric names."
    )]
    async fn prometheus_range_query(
        &self,
        Parameters(params): Parameters<RangeQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        require(&[
            ("query", params.query.as_str()),
            ("start", params.start.as_str()),
            ("end", params.end.as_str()),
        ])?;
        let output = self
            .state
            .queries
            .range_query(&params.query, &params.start, &params.end, params.step.as_deref())
            .await;
        Ok(tool_result(output))
    }

    #[tool(
        description = "List the label sets of the series matching a selector. Use it to check which label values exist before filtering a query."
    )]
    async fn prometheus_series(
        &self,
        Parameters(params): Parameters<SeriesParams>,
    ) -> Result<CallToolResult, McpError> {
        require(&[("selector", params.selector.as_str())])?;
        let output = self
            .state
            .queries
            .series(&params.selector, params.start.as_deref(), params.end.as_deref())
            .await;
        Ok(tool_result(output))
    }
}

impl DashboardServer {
    fn resources(&self) -> Vec<Resource> {
        self.state
            .catalog
            .list_resources()
            .into_iter()
            .map(resource)
            .collect()
    }

    async fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        tracing::info!("Reading resource {}", uri);
        let text = self
            .state
            .catalog
            .read_resource(uri)
            .await
            .map_err(|err| match err {
                CatalogError::UnknownResource(_) => McpError::resource_not_found(err.to_string(), None),
                CatalogError::Render(_) => McpError::internal_error(err.to_string(), None),
            })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for DashboardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Read the dashboard metrics and variables resources before querying Prometheus. \
                 The metrics_query_guide prompt walks through the workflow."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            meta: None,
            next_cursor: None,
            resources: self.resources(),
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read(&request.uri).await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            meta: None,
            next_cursor: None,
            prompts: prompts(),
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        prompt(&request.name, &request.arguments.unwrap_or_default())
    }
}

/// Rejects empty required arguments; missing ones never reach the tool.
fn require(arguments: &[(&str, &str)]) -> Result<(), McpError> {
    match arguments.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(McpError::invalid_params(format!("{} is required", name), None)),
        None => Ok(()),
    }
}

fn tool_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.text)];
    if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn resource(descriptor: ResourceDescriptor) -> Resource {
    let mut raw = RawResource::new(descriptor.uri, descriptor.name);
    raw.description = Some(descriptor.description);
    raw.mime_type = Some(descriptor.mime_type.to_string());
    Annotated::new(raw, None)
}

fn prompts() -> Vec<Prompt> {
    vec![Prompt::new(
        PROMPT_QUERY_GUIDE,
        Some("Step-by-step guide: read the dashboard resources first, then query."),
        Some(vec![
            PromptArgument {
                name: "query_goal".into(),
                title: None,
                description: Some("What metric or system state do you want to look at?".into()),
                required: Some(true),
            },
            PromptArgument {
                name: "dashboard".into(),
                title: None,
                description: Some("Dashboard to use (optional)".into()),
                required: Some(false),
            },
        ]),
    )]
}

fn prompt(name: &str, arguments: &JsonObject) -> Result<GetPromptResult, McpError> {
    if name != PROMPT_QUERY_GUIDE {
        return Err(McpError::invalid_params(format!("Unknown prompt: {}", name), None));
    }

    let argument = |key: &str| {
        arguments
            .get(key)
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
    };
    let goal = argument("query_goal").unwrap_or("query monitoring metrics");

    Ok(GetPromptResult {
        description: Some("Standard workflow for querying dashboard metrics".into()),
        messages: vec![PromptMessage::new_text(
            PromptMessageRole::User,
            query_guide(goal, argument("dashboard")),
        )],
    })
}

fn query_guide(goal: &str, dashboard: Option<&str>) -> String {
    let mut text = format!(
        "# Metrics query workflow\n\nYour goal: **{}**\n\n## Steps\n\n### 1. Read the resources\n",
        goal
    );

    match dashboard {
        Some(name) => text.push_str(&format!(
            "- Read `prometheus://dashboard/{0}/metrics` for every metric of **{0}**\n\
             - Read `prometheus://dashboard/{0}/variables` for variables and label values\n\n",
            name
        )),
        None => text.push_str(
            "- List the resources and pick the relevant dashboard\n\
             - Read that dashboard's metrics and variables resources\n\n",
        ),
    }

    text.push_str(&format!(
        "### 2. Pick the metric\n\
         - Match your goal against the metric titles and descriptions\n\
         - Note the expression (expr) and the variables it uses\n\n\
         ### 3. Build the PromQL\n\
         - Start from the metric's expr\n\
         - Filter labels with values taken from the variables resource\n\
         - `prometheus_series` shows which label values a selector matches\n\n\
         ### 4. Run it\n\
         - `prometheus_query` for the current value\n\
         - `prometheus_range_query` for a time series (step defaults to {})\n\n\
         ## Avoid\n\
         - Guessing metric names instead of reading the resources\n\
         - Exploring with generic queries such as `up`\n",
        DEFAULT_STEP
    ));
    text
}
