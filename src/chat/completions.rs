//! OpenAI-style chat completions client.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    Auth, ChatError, ENV_API_KEY, ENV_BASE_URL, HttpApi, ReqwestApi, env_timeout, env_var,
    null_as_default, resolve_base_url, resolve_timeout, send_json,
};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Author of a chat message. Roles this client does not know are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        ChatCompletionRequest {
            model: Some(model.into()),
            messages,
            ..Default::default()
        }
    }

    /// Apply modifiers in order; later ones win on the same field.
    pub fn with_options(mut self, options: impl IntoIterator<Item = CompletionOption>) -> Self {
        for option in options {
            option.apply(&mut self);
        }
        self
    }
}

/// Optional modifier applied to a [`ChatCompletionRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOption {
    Model(String),
    Temperature(f64),
    MaxTokens(u32),
    TopP(f64),
    Stop(Vec<String>),
    /// Leading system message. Replaces the content of an existing leading
    /// system message instead of adding a second one.
    SystemPreamble(String),
}

impl CompletionOption {
    pub fn apply(self, req: &mut ChatCompletionRequest) {
        match self {
            CompletionOption::Model(model) => req.model = Some(model),
            CompletionOption::Temperature(t) => req.temperature = Some(t),
            CompletionOption::MaxTokens(n) => req.max_tokens = Some(n),
            CompletionOption::TopP(p) => req.top_p = Some(p),
            CompletionOption::Stop(stop) => req.stop = Some(stop),
            CompletionOption::SystemPreamble(text) => match req.messages.first_mut() {
                Some(first) if first.role == Role::System => first.content = text,
                _ => req.messages.insert(0, Message::system(text)),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Usage,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_tokens: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_tokens: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tokens: u32,
}

// Streaming shapes. Not consumed by this client.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Settings for [`CompletionsClient`].
#[derive(Debug, Clone, Default)]
pub struct CompletionsConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl CompletionsConfig {
    /// Read `ABACUS_API_KEY`, `ABACUS_BASE_URL` and `ABACUS_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        CompletionsConfig {
            api_key: env_var(ENV_API_KEY).unwrap_or_default(),
            base_url: env_var(ENV_BASE_URL),
            timeout: env_timeout(),
        }
    }
}

/// Client for `POST /v1/chat/completions` with bearer-token auth.
#[derive(Clone)]
pub struct CompletionsClient {
    api: Arc<dyn HttpApi>,
    auth: Auth,
    base_url: String,
}

impl CompletionsClient {
    pub fn new(config: CompletionsConfig) -> Result<Self, ChatError> {
        if config.api_key.is_empty() {
            return Err(ChatError::MissingCredential("API key"));
        }
        let api = ReqwestApi::new(resolve_timeout(config.timeout))?;
        Self::with_http(config, Arc::new(api))
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, ChatError> {
        Self::new(CompletionsConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    /// Build a client over a caller-supplied HTTP implementation.
    pub fn with_http(config: CompletionsConfig, api: Arc<dyn HttpApi>) -> Result<Self, ChatError> {
        if config.api_key.is_empty() {
            return Err(ChatError::MissingCredential("API key"));
        }
        Ok(Self {
            api,
            auth: Auth::Bearer(config.api_key),
            base_url: resolve_base_url(config.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatError> {
        if request.messages.is_empty() {
            return Err(ChatError::EmptyMessages);
        }

        let url = format!("{}{}", self.base_url, COMPLETIONS_PATH);
        send_json(self.api.as_ref(), url, &self.auth, request).await
    }

    /// Build a request from `messages` and `options`, then send it.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        options: impl IntoIterator<Item = CompletionOption>,
    ) -> Result<ChatCompletionResponse, ChatError> {
        let request = ChatCompletionRequest {
            messages,
            ..Default::default()
        }
        .with_options(options);
        self.create_chat_completion(&request).await
    }
}
