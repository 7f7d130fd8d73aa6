use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// Reserved JSON-RPC error codes used by the dispatcher.
pub const ERR_CODE_PARSE: i32 = -32700;
pub const ERR_CODE_INVALID_REQ: i32 = -32600;
pub const ERR_CODE_NO_METHOD: i32 = -32601;
pub const ERR_CODE_BAD_PARAMS: i32 = -32602;
pub const ERR_CODE_INTERNAL: i32 = -32603;

/// MCP protocol version announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC protocol tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// ── Request ids ──

/// Correlation id of a JSON-RPC request.
///
/// An omitted `id` is modelled as `Option::None` on the envelope (a
/// notification). An explicit `"id": null` is a request whose id is
/// [`RequestId::Null`] and gets a response echoing `null`.
///
/// Numeric ids must fit in an `i64`. Larger integers and fractional ids do
/// not decode, so such requests are answered with `-32600` and a null id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// Keeps an explicit `null` distinct from a missing member: serde only calls
/// this when the key is present, the `default` attribute covers absence.
fn present_id<'de, D>(deserializer: D) -> Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    RequestId::deserialize(deserializer).map(Some)
}

// ── Request ──

/// Inbound JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request carrying an id.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no id, never answered).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

// ── Response ──

/// Response from [`Server::handle()`](crate::Server::handle).
///
/// For `initialize` and `tools/list` the result is pre-serialized JSON shared
/// via `Arc`, so answering those costs a ref-count increment.
///
/// Implements [`Serialize`]; the transport writes it directly. For
/// structured inspection (e.g. in tests) call
/// [`into_json_rpc()`](McpResponse::into_json_rpc).
#[derive(Debug)]
pub struct McpResponse {
    id: RequestId,
    kind: ResponseKind,
}

#[derive(Debug)]
enum ResponseKind {
    /// Pre-serialized result.
    Cached(Arc<RawValue>),
    /// Result built per request.
    Result(Value),
    Error(RpcError),
    /// Notification sentinel. Nothing is written.
    Notification,
}

impl McpResponse {
    /// True for the sentinel returned for notifications; nothing is written.
    pub fn is_notification(&self) -> bool {
        matches!(self.kind, ResponseKind::Notification)
    }

    /// The error code, if this response carries an error.
    pub fn error_code(&self) -> Option<i32> {
        match &self.kind {
            ResponseKind::Error(err) => Some(err.code),
            _ => None,
        }
    }

    /// Owned envelope view, mainly for assertions.
    ///
    /// Cached results are re-parsed from their raw JSON.
    pub fn into_json_rpc(self) -> JsonRpcResponse {
        let (id, result, error) = match self.kind {
            ResponseKind::Cached(raw) => {
                (Some(self.id), serde_json::from_str(raw.get()).ok(), None)
            }
            ResponseKind::Result(value) => (Some(self.id), Some(value), None),
            ResponseKind::Error(err) => (Some(self.id), None, Some(err)),
            ResponseKind::Notification => (None, None, None),
        };
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result,
            error,
        }
    }

    // ── Constructors used by the dispatcher ──

    pub(crate) fn cached(id: RequestId, raw: &Arc<RawValue>) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Cached(Arc::clone(raw)),
        }
    }

    pub(crate) fn ok(id: RequestId, result: Value) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Result(result),
        }
    }

    pub(crate) fn error(
        id: RequestId,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Error(RpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    pub(crate) fn notification() -> Self {
        McpResponse {
            id: RequestId::Null,
            kind: ResponseKind::Notification,
        }
    }
}

impl Serialize for McpResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_notification() {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
            return map.end();
        }

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("id", &self.id)?;

        match &self.kind {
            ResponseKind::Cached(raw) => map.serialize_entry("result", raw.as_ref())?,
            ResponseKind::Result(value) => map.serialize_entry("result", value)?,
            ResponseKind::Error(err) => map.serialize_entry("error", err)?,
            ResponseKind::Notification => {}
        }

        map.end()
    }
}

/// Structured JSON-RPC 2.0 response.
///
/// Use [`McpResponse::into_json_rpc()`] to convert from the wire response
/// type, or deserialize one from a line written by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// True when no id, result or error is present.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.result.is_none() && self.error.is_none()
    }
}

/// The `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ── Tools and results ──

/// Tool descriptor as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: InputSchema,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Declared parameter shape of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl InputSchema {
    /// An `object` schema with no properties.
    pub fn object() -> Self {
        InputSchema {
            schema_type: "object".into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        property_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertySchema {
                property_type: property_type.into(),
                description: Some(description.into()),
            },
        );
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        InputSchema::object()
    }
}

/// Schema of a single named property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of one `tools/call`, forwarded verbatim as the RPC result.
///
/// `is_error` marks a tool-level failure; it is still delivered as a normal
/// JSON-RPC result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Text of the first content block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| block.text.as_str())
    }
}

/// One content item. Always `"text"` for the built-in tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
}

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

/// Capabilities announced by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub list_changed: bool,
}

/// Name/version pair used for both client and server info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

// ── Result helpers ──

/// Single text item, failure flag clear.
pub fn text_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock {
            block_type: "text".into(),
            text: text.into(),
        }],
        is_error: false,
    }
}

/// Create a tool-level failure result (`isError: true`).
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock {
            block_type: "text".into(),
            text: text.into(),
        }],
        is_error: true,
    }
}

/// Errors a tool handler reports as transport-level failures.
///
/// Returning one of these from [`ToolHandler::call`](crate::ToolHandler::call)
/// produces a `-32603` JSON-RPC error; tool-level failures belong in
/// [`error_result`] instead.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("tool error: {0}")]
    ToolError(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

// Request params, decoded only inside the dispatcher.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<Implementation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}
