//! Built-in tools: `echo`, `get_time` and `read_file`.

pub mod echo;
pub mod read_file;
pub mod time;

use std::sync::Arc;

use crate::server::ServerBuilder;

pub use echo::EchoTool;
pub use read_file::ReadFileTool;
pub use time::GetTimeTool;

/// Register every built-in tool on the given builder.
pub fn register_all(builder: ServerBuilder) -> ServerBuilder {
    builder
        .tool(EchoTool::descriptor(), Arc::new(EchoTool))
        .tool(GetTimeTool::descriptor(), Arc::new(GetTimeTool))
        .tool(ReadFileTool::descriptor(), Arc::new(ReadFileTool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Server;
    use crate::types::ToolResult;
    use crate::JsonRpcRequest;
    use serde_json::{json, Value};

    fn setup_server() -> Server {
        register_all(Server::builder())
            .server_info("test-app", "0.0.1")
            .build()
            .unwrap()
    }

    async fn call_tool(srv: &Server, name: &str, args: Value) -> ToolResult {
        let req = JsonRpcRequest::new(
            1i64,
            "tools/call",
            Some(json!({"name": name, "arguments": args})),
        );
        let resp = srv.handle(req).await.into_json_rpc();
        serde_json::from_value(resp.result.expect("tool result")).unwrap()
    }

    #[test]
    fn test_all_tools_listed() {
        let srv = setup_server();
        let names: Vec<&str> = srv.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "get_time", "read_file"]);
    }

    #[tokio::test]
    async fn test_echo_through_server() {
        let srv = setup_server();
        let result = call_tool(&srv, "echo", json!({"message": "hi"})).await;
        assert_eq!(result.first_text(), Some("Echo: hi"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_read_file_missing_path_through_server() {
        let srv = setup_server();
        let result = call_tool(&srv, "read_file", json!({})).await;
        assert!(result.is_error);
    }
}
