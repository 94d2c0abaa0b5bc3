use rmcp::{
    handler::server::router::tool::ToolRouter as RmcpToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use websift_core::{Error, WebSearch};

mod envelope;
use envelope::*;

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct SearchWebArgs {
    /// Query to be searched.
    #[serde(default)]
    query: Option<String>,
    /// Search language (e.g. en, cs).
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct ExtractWebpageArgs {
    /// URL to be extracted.
    #[serde(default)]
    url: Option<String>,
    /// The user's query that prompted the extraction.
    #[serde(default)]
    query: Option<String>,
}

fn required(v: Option<String>, name: &str) -> websift_core::Result<String> {
    match v {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(Error::InvalidParams(format!(
            "{name} must be a non-empty string"
        ))),
    }
}

fn failed(e: Error) -> CallToolResult {
    tool_error(ErrorCode::from(&e), e)
}

#[derive(Clone)]
pub(crate) struct WebsiftMcp {
    tool_router: RmcpToolRouter<Self>,
    search: Arc<WebSearch>,
}

#[tool_router]
impl WebsiftMcp {
    pub(crate) fn new(search: Arc<WebSearch>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            search,
        }
    }

    #[tool(description = "Performs a web search.")]
    async fn search_web(
        &self,
        params: Parameters<Option<SearchWebArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0.unwrap_or_default();
        let query = match required(args.query, "query") {
            Ok(q) => q,
            Err(e) => return Ok(failed(e)),
        };
        let lang = match required(args.lang, "lang") {
            Ok(l) => l,
            Err(e) => return Ok(failed(e)),
        };

        tracing::info!(query = %query, "search_web called");
        let r = match self.search.perform_simple_search(&query, &lang).await {
            Ok(text) => tool_text(text),
            Err(e) => failed(e),
        };
        tracing::info!(query = %query, is_error = r.is_error.unwrap_or(false), "search_web answered");
        Ok(r)
    }

    #[tool(description = "Extracts webpage for given URL.")]
    async fn extract_webpage(
        &self,
        params: Parameters<Option<ExtractWebpageArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0.unwrap_or_default();
        let url = match required(args.url, "url") {
            Ok(u) => u,
            Err(e) => return Ok(failed(e)),
        };
        // An empty query still yields a usable (if unfocused) extraction.
        let query = args.query.unwrap_or_default();

        tracing::info!(url = %url, "extract_webpage called");
        let text = self.search.extract_url(&url, &query).await;
        tracing::info!(url = %url, chars = text.len(), "extract_webpage answered");
        Ok(tool_text(text))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for WebsiftMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Web search (search_web) and query-focused webpage extraction (extract_webpage). Both tools return plain text."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "websift".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

pub(crate) async fn serve_stdio(search: Arc<WebSearch>) -> Result<(), McpError> {
    let svc = WebsiftMcp::new(search);
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Keep the stdio server alive until the client closes.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}

pub(crate) async fn serve_http(
    search: Arc<WebSearch>,
    bind: SocketAddr,
    path: &str,
) -> anyhow::Result<()> {
    let handler = WebsiftMcp::new(search);
    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let app = axum::Router::new().nest_service(path, service);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, path, "serving MCP over streamable HTTP");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
