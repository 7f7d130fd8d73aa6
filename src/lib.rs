//! `mcplite` is a small MCP (Model Context Protocol) server over stdio, plus
//! HTTP clients for hosted chat-completion APIs.
//!
//! The server reads newline-delimited JSON-RPC 2.0 requests, answers
//! `initialize`, `tools/list` and `tools/call`, and writes one response line
//! per request. Tools are registered on the builder before serving.
//!
//! # Quick start
//!
//! ```rust
//! use mcplite::{Arguments, FnToolHandler, InputSchema, Server, Tool, text_result};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::builder()
//!     .tool(
//!         Tool::new(
//!             "shout",
//!             "Upper-cases its input",
//!             InputSchema::object()
//!                 .property("text", "string", "Text to shout")
//!                 .required("text"),
//!         ),
//!         FnToolHandler::new(|args: Arguments| async move {
//!             let text = args.require_str("text").unwrap_or_default();
//!             Ok(text_result(text.to_uppercase()))
//!         }),
//!     )
//!     .server_info("my-server", "0.1.0")
//!     .build()?;
//!
//! let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
//! let mut output = Vec::new();
//! server.serve(input, &mut output).await?;
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod chat;
pub mod server;
pub mod tools;
pub mod transport_stdio;
pub mod types;

// Re-export the most commonly used items at the crate root.
pub use args::{ArgumentError, Arguments};
pub use chat::{ChatError, CompletionsClient, DeploymentClient};
pub use server::{FnToolHandler, Server, ServerBuilder, ToolHandler};
pub use transport_stdio::{LineTransport, TransportError};
pub use types::{
    ContentBlock, InputSchema, JsonRpcRequest, JsonRpcResponse, McpError, McpResponse,
    PROTOCOL_VERSION, RequestId, RpcError, Tool, ToolResult, error_result, text_result,
};
