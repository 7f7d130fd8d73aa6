use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::value::{RawValue, to_raw_value};
use serde_json::{Value, json};

use crate::args::Arguments;
use crate::types::*;

/// A tool implementation.
///
/// `Ok` results are forwarded verbatim, including results flagged with
/// `is_error`. An `Err` becomes a `-32603` JSON-RPC error.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> Result<ToolResult, McpError>;
}

/// Adapts an async closure taking [`Arguments`] to [`ToolHandler`].
pub struct FnToolHandler<F> {
    f: F,
}

impl<F, Fut> FnToolHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> Result<ToolResult, McpError> {
        (self.f)(args).await
    }
}

/// The methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method<'a> {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
    Initialized,
    Cancelled,
    Unknown(&'a str),
}

impl<'a> Method<'a> {
    fn parse(name: &'a str) -> Self {
        match name {
            "initialize" => Method::Initialize,
            "ping" => Method::Ping,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "notifications/initialized" => Method::Initialized,
            "notifications/cancelled" => Method::Cancelled,
            other => Method::Unknown(other),
        }
    }
}

/// The MCP server. Create with [`ServerBuilder`]; the tool registry is
/// frozen once built.
pub struct Server {
    pub(crate) server_name: String,
    pub(crate) server_version: String,
    pub(crate) tool_list: Vec<Tool>,
    pub(crate) tool_handlers: HashMap<String, Arc<dyn ToolHandler>>,
    initialize_result: Arc<RawValue>,
    tools_list_result: Arc<RawValue>,
}

impl Server {
    /// Start registering tools.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Registered tool descriptors, in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.tool_list
    }

    /// Decode one raw message and route it.
    ///
    /// Bytes that are not JSON produce a `-32700` error, JSON that is not a
    /// request envelope produces `-32600`. Both are answered with a null id.
    pub async fn handle_message(&self, raw: &[u8]) -> McpResponse {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse JSON-RPC message");
                return McpResponse::error(
                    RequestId::Null,
                    ERR_CODE_PARSE,
                    "Parse error",
                    Some(Value::String(e.to_string())),
                );
            }
        };

        let id_hint = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok())
            .unwrap_or(RequestId::Null);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) => self.handle(req).await,
            Err(e) => {
                tracing::warn!(error = %e, "invalid JSON-RPC request");
                McpResponse::error(
                    id_hint,
                    ERR_CODE_INVALID_REQ,
                    "Invalid Request",
                    Some(Value::String(e.to_string())),
                )
            }
        }
    }

    /// Dispatch one decoded request by method name.
    pub async fn handle(&self, req: JsonRpcRequest) -> McpResponse {
        let method = Method::parse(&req.method);

        let Some(id) = req.id.clone() else {
            match method {
                Method::Initialized => tracing::info!("Client initialized"),
                _ => tracing::debug!(method = %req.method, "notification ignored"),
            }
            return McpResponse::notification();
        };

        tracing::debug!(method = %req.method, id = ?id, "received request");

        if req.jsonrpc != JSONRPC_VERSION {
            return McpResponse::error(
                id,
                ERR_CODE_INVALID_REQ,
                "Invalid Request",
                Some(json!("jsonrpc must be '2.0'")),
            );
        }

        match method {
            Method::Initialize => self.handle_initialize(id, req.params.as_ref()),
            Method::Ping => McpResponse::ok(id, json!({})),
            Method::ToolsList => McpResponse::cached(id, &self.tools_list_result),
            Method::ToolsCall => self.handle_tools_call(id, req.params).await,
            Method::Initialized | Method::Cancelled => McpResponse::ok(id, json!({})),
            Method::Unknown(name) => McpResponse::error(
                id,
                ERR_CODE_NO_METHOD,
                "Method not found",
                Some(Value::String(format!("Unknown method: {}", name))),
            ),
        }
    }

    fn handle_initialize(&self, id: RequestId, params: Option<&Value>) -> McpResponse {
        if let Some(p) = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok())
        {
            let client_name = p.client_info.as_ref().map_or("", |c| c.name.as_str());
            let client_version = p.client_info.as_ref().map_or("", |c| c.version.as_str());
            tracing::info!(
                client_name,
                client_version,
                protocol_version = ?p.protocol_version,
                "initialize"
            );
        }

        McpResponse::cached(id, &self.initialize_result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> McpResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return McpResponse::error(
                        id,
                        ERR_CODE_BAD_PARAMS,
                        "Invalid params",
                        Some(Value::String(e.to_string())),
                    );
                }
            },
            None => {
                return McpResponse::error(
                    id,
                    ERR_CODE_BAD_PARAMS,
                    "Invalid params",
                    Some(json!("params required")),
                );
            }
        };

        let Some(handler) = self.tool_handlers.get(&params.name) else {
            return McpResponse::error(
                id,
                ERR_CODE_BAD_PARAMS,
                "Tool not found",
                Some(Value::String(format!("Tool '{}' not found", params.name))),
            );
        };

        let args = match Arguments::from_value(params.arguments) {
            Ok(args) => args,
            Err(e) => {
                return McpResponse::error(
                    id,
                    ERR_CODE_BAD_PARAMS,
                    "Invalid params",
                    Some(Value::String(e.to_string())),
                );
            }
        };

        tracing::debug!(tool = %params.name, "calling tool");

        let result = match handler.call(args).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(tool = %params.name, error = %e, "tool execution failed");
                return McpResponse::error(
                    id,
                    ERR_CODE_INTERNAL,
                    "Tool execution error",
                    Some(Value::String(e.to_string())),
                );
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => McpResponse::ok(id, value),
            Err(e) => McpResponse::error(
                id,
                ERR_CODE_INTERNAL,
                "Tool execution error",
                Some(Value::String(e.to_string())),
            ),
        }
    }
}

/// Collects tools and server info, then freezes them into a [`Server`].
///
/// Tools can only be registered here, before the server exists, so the
/// registry used for listing and the one used for dispatch never diverge.
#[derive(Default)]
pub struct ServerBuilder {
    tools: Vec<(Tool, Arc<dyn ToolHandler>)>,
    server_name: Option<String>,
    server_version: Option<String>,
}

impl ServerBuilder {
    /// Register a tool. A second registration under the same name replaces
    /// the first in place.
    pub fn tool(mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> Self {
        match self.tools.iter_mut().find(|(t, _)| t.name == tool.name) {
            Some(slot) => {
                tracing::warn!(tool = %tool.name, "replacing previously registered tool");
                *slot = (tool, handler);
            }
            None => self.tools.push((tool, handler)),
        }
        self
    }

    /// Name and version reported by `initialize`.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self.server_version = Some(version.into());
        self
    }

    /// Build the server, pre-serializing the static `initialize` and
    /// `tools/list` results.
    pub fn build(self) -> Result<Server, McpError> {
        let server_name = self.server_name.unwrap_or_else(|| "mcplite".into());
        let server_version = self.server_version.unwrap_or_else(|| "1.0.0".into());

        let mut tool_list = Vec::with_capacity(self.tools.len());
        let mut tool_handlers = HashMap::with_capacity(self.tools.len());
        for (tool, handler) in self.tools {
            tool_handlers.insert(tool.name.clone(), handler);
            tool_list.push(tool);
        }

        let initialize_result = to_raw_value(&InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: Implementation {
                name: server_name.clone(),
                version: server_version.clone(),
            },
        })?;

        let tools_list_result = to_raw_value(&ListToolsResult {
            tools: tool_list.clone(),
        })?;

        Ok(Server {
            server_name,
            server_version,
            tool_list,
            tool_handlers,
            initialize_result: Arc::from(initialize_result),
            tools_list_result: Arc::from(tools_list_result),
        })
    }
}
