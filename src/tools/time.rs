use async_trait::async_trait;
use chrono::{Local, SecondsFormat};

use crate::args::Arguments;
use crate::server::ToolHandler;
use crate::types::{InputSchema, McpError, Tool, ToolResult, text_result};

pub const NAME: &str = "get_time";
pub const PREFIX: &str = "Current server time: ";

/// Reports the server's wall-clock time as RFC 3339 with a UTC offset.
pub struct GetTimeTool;

impl GetTimeTool {
    pub fn descriptor() -> Tool {
        Tool::new(NAME, "Returns the current server time", InputSchema::object())
    }
}

#[async_trait]
impl ToolHandler for GetTimeTool {
    async fn call(&self, _args: Arguments) -> Result<ToolResult, McpError> {
        let now = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(text_result(format!("{}{}", PREFIX, now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[tokio::test]
    async fn test_time_is_current() {
        let before = Utc::now();
        let result = GetTimeTool.call(Arguments::new()).await.unwrap();
        assert!(!result.is_error);

        let text = result.first_text().unwrap();
        let stamp = text.strip_prefix(PREFIX).expect("prefix");
        let parsed = DateTime::parse_from_rfc3339(stamp).expect("rfc3339");

        // Seconds precision truncates, so allow one extra second.
        let delta = (parsed.with_timezone(&Utc) - before).num_milliseconds().abs();
        assert!(delta <= 2000, "timestamp off by {delta}ms");
    }

    #[tokio::test]
    async fn test_time_ignores_arguments() {
        let args = Arguments::from_value(serde_json::json!({"junk": [1, 2]})).unwrap();
        let result = GetTimeTool.call(args).await.unwrap();
        assert!(result.first_text().unwrap().starts_with(PREFIX));
    }
}
