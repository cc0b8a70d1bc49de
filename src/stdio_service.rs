use clap::Parser;
use rmcp::{model::*, ServiceExt};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Settings;
use crate::tools::{self, ToolError};
use crate::AppState;

#[derive(Clone)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl rmcp::ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "search-api".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Metasearch tools: web pages, images, videos, news and books through a SearXNG backend.".to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _page: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let schema = Arc::new(tools::input_schema());
        let tools = tools::enabled_tools(&self.state)
            .into_iter()
            .map(|tool| Tool::new(tool.name, tool.description, schema.clone()))
            .collect();

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

        let arguments = serde_json::Value::Object(request.arguments.unwrap_or_default());
        match tools::call_tool(&self.state, &request.name, arguments).await {
            Ok(items) => {
                let text = serde_json::to_string(&items)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e @ ToolError::UnknownTool(_)) => {
                error!("{}", e);
                Err(ErrorData::new(ErrorCode::METHOD_NOT_FOUND, e.to_string(), None))
            }
            Err(e @ ToolError::InvalidArguments(_)) => {
                Err(ErrorData::new(ErrorCode::INVALID_PARAMS, e.to_string(), None))
            }
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::parse();
    info!("Starting MCP stdio service");

    let state = Arc::new(AppState::initialize(&settings).await?);
    let service = McpService::new(state.clone());

    // Use the stdio transport from rmcp
    let server = service.serve(rmcp::transport::stdio()).await?;
    info!("MCP stdio server running");
    let quit_reason = server.waiting().await?;
    info!("MCP stdio server stopped: {:?}", quit_reason);

    AppState::close(state).await
}
