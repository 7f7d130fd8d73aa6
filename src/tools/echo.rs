use async_trait::async_trait;

use crate::args::Arguments;
use crate::server::ToolHandler;
use crate::types::{InputSchema, McpError, Tool, ToolResult, error_result, text_result};

pub const NAME: &str = "echo";
pub const BAD_MESSAGE: &str = "Error: 'message' argument must be a string";

/// Echoes the `message` argument back, prefixed with `Echo: `.
pub struct EchoTool;

impl EchoTool {
    pub fn descriptor() -> Tool {
        Tool::new(
            NAME,
            "Echoes back the input text",
            InputSchema::object()
                .property("message", "string", "The message to echo back")
                .required("message"),
        )
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, args: Arguments) -> Result<ToolResult, McpError> {
        match args.require_str("message") {
            Ok(message) => Ok(text_result(format!("Echo: {}", message))),
            Err(_) => Ok(error_result(BAD_MESSAGE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(v: serde_json::Value) -> ToolResult {
        EchoTool
            .call(Arguments::from_value(v).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_echo() {
        let result = run(json!({"message": "hi"})).await;
        assert_eq!(result.first_text(), Some("Echo: hi"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_echo_empty_message() {
        let result = run(json!({"message": ""})).await;
        assert_eq!(result.first_text(), Some("Echo: "));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_echo_missing_message() {
        let result = run(json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some(BAD_MESSAGE));
    }

    #[tokio::test]
    async fn test_echo_wrong_type() {
        let result = run(json!({"message": 12})).await;
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some(BAD_MESSAGE));
    }
}
