use async_trait::async_trait;

use crate::args::Arguments;
use crate::server::ToolHandler;
use crate::types::{InputSchema, McpError, Tool, ToolResult, error_result, text_result};

pub const NAME: &str = "read_file";
pub const BAD_PATH: &str = "Error: 'path' argument must be a string";
pub const READ_ERROR_PREFIX: &str = "Error reading file: ";

/// Returns the whole content of the file at `path`.
///
/// No size limit is applied. Bytes that are not valid UTF-8 are replaced.
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn descriptor() -> Tool {
        Tool::new(
            NAME,
            "Reads the content of a file",
            InputSchema::object()
                .property("path", "string", "The path to the file to read")
                .required("path"),
        )
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    async fn call(&self, args: Arguments) -> Result<ToolResult, McpError> {
        let Ok(path) = args.require_str("path") else {
            return Ok(error_result(BAD_PATH));
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(text_result(String::from_utf8_lossy(&bytes))),
            Err(e) => {
                tracing::debug!(path, error = %e, "read_file failed");
                Ok(error_result(format!("{}{}", READ_ERROR_PREFIX, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    async fn run(v: serde_json::Value) -> ToolResult {
        ReadFileTool
            .call(Arguments::from_value(v).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ABC").unwrap();
        let path = file.path().to_str().unwrap();

        let result = run(json!({"path": path})).await;
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("ABC"));
    }

    #[tokio::test]
    async fn test_read_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = run(json!({"path": file.path()})).await;
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some(""));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        let result = run(json!({"path": path})).await;
        assert!(result.is_error);
        assert!(result.first_text().unwrap().starts_with(READ_ERROR_PREFIX));
    }

    #[tokio::test]
    async fn test_read_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(json!({"path": dir.path()})).await;
        assert!(result.is_error);
        assert!(result.first_text().unwrap().starts_with(READ_ERROR_PREFIX));
    }

    #[tokio::test]
    async fn test_read_bad_path_argument() {
        for args in [json!({}), json!({"path": 1}), json!({"path": null})] {
            let result = run(args).await;
            assert!(result.is_error);
            assert_eq!(result.first_text(), Some(BAD_PATH));
        }
    }
}
