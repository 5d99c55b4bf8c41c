//! MCP service implementation using rmcp.
//!
//! [`NlsqlService`] publishes the tool registry as the `tools/list` catalog and
//! hands every `tools/call` to the shared [`ToolDispatcher`] with its raw
//! arguments. Unknown tools and bad arguments come back as a text block with
//! `is_error` set, never as a protocol error.

use crate::tools::{InvocationResult, ToolDispatcher, registry};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool,
    },
    service::RequestContext,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Clone)]
pub struct NlsqlService {
    /// Shared dispatcher (and through it, the single database connection)
    dispatcher: Arc<ToolDispatcher>,
}

impl NlsqlService {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The registry in `tools/list` form.
    pub fn tools() -> Vec<Tool> {
        registry::tools()
            .iter()
            .map(|t| Tool::new(t.name, t.description, t.input_schema()))
            .collect()
    }

    /// Run one tool call. A missing argument object counts as empty.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let args = arguments.map(JsonValue::Object).unwrap_or(JsonValue::Null);
        to_call_tool_result(self.dispatcher.invoke(name, &args).await)
    }
}

fn to_call_tool_result(result: InvocationResult) -> CallToolResult {
    let content = result.blocks.into_iter().map(Content::text).collect();
    if result.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for NlsqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nlsql-mcp-server".to_owned(),
                title: Some("Natural Language to SQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Ask questions about a SQL database in plain language.\n\
                \n\
                ## Workflow\n\
                1. Call `get_connection_status`. If nothing is connected, call \
                `connect_sample_database`\n\
                2. Call `get_database_info` to see the tables\n\
                3. Call `analyze_schema` once per connection\n\
                4. Call `natural_language_to_sql` with `skip_schema: true` to reuse that \
                analysis,\n\
                   and `execute: true` to run the generated SQL\n\
                5. Use `execute_sql_query` to run or refine SQL directly\n\
                \n\
                Only one database is connected at a time."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(Self::tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { Ok(self.call(&request.name, request.arguments).await) }
    }
}
