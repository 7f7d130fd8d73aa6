//! Deployment-scoped chat client (`getChatResponse`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    Auth, ChatError, ENV_API_KEY, ENV_BASE_URL, ENV_DEPLOYMENT_ID, ENV_DEPLOYMENT_TOKEN,
    HttpApi, ReqwestApi, env_timeout, env_var, null_as_default, resolve_base_url, resolve_timeout,
    send_json,
};

pub const CHAT_PATH: &str = "/api/v0/getChatResponse";

/// Outgoing message. `is_user` is false for assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub is_user: bool,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            is_user: true,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        ChatMessage {
            is_user: false,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub deployment_token: String,
    pub deployment_id: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_config: Option<Map<String, Value>>,
}

/// Optional modifier applied to a [`ChatRequest`] after the mandatory fields
/// are set. Applied in the order given; later ones win.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOption {
    LlmName(String),
    Temperature(f64),
    SystemMessage(String),
    NumCompletionTokens(u32),
    ChatConfig(Map<String, Value>),
}

impl ChatOption {
    pub fn apply(self, req: &mut ChatRequest) {
        match self {
            ChatOption::LlmName(name) => req.llm_name = Some(name),
            ChatOption::Temperature(t) => req.temperature = Some(t),
            ChatOption::SystemMessage(msg) => req.system_message = Some(msg),
            ChatOption::NumCompletionTokens(n) => req.num_completion_tokens = Some(n),
            ChatOption::ChatConfig(config) => req.chat_config = Some(config),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub deployment_conversation_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ResponseMessage>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub doc_ids: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub keyword_arguments: BTreeMap<String, String>,
}

impl ChatResponse {
    /// Normalized text of every non-user message, in order.
    pub fn assistant_texts(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| !m.is_user)
            .map(ResponseMessage::text_content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_user: bool,
    #[serde(default)]
    pub text: MessageText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_useful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub doc_ids: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub keyword_arguments: BTreeMap<String, String>,
}

impl ResponseMessage {
    pub fn text_content(&self) -> &str {
        self.text.as_str()
    }
}

/// The `text` member of a response message: a string, a list of strings,
/// or anything else (treated as empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    Text(String),
    Parts(Vec<Value>),
    Other(Value),
}

impl MessageText {
    /// The string, the first element of a list when it is a string, or `""`.
    pub fn as_str(&self) -> &str {
        match self {
            MessageText::Text(s) => s,
            MessageText::Parts(parts) => parts.first().and_then(Value::as_str).unwrap_or(""),
            MessageText::Other(_) => "",
        }
    }
}

impl Default for MessageText {
    fn default() -> Self {
        MessageText::Other(Value::Null)
    }
}

/// Settings for [`DeploymentClient`].
#[derive(Debug, Clone, Default)]
pub struct DeploymentConfig {
    pub api_key: String,
    pub deployment_token: String,
    pub deployment_id: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl DeploymentConfig {
    /// Read the `ABACUS_*` credential variables plus optional base URL and
    /// timeout.
    pub fn from_env() -> Self {
        DeploymentConfig {
            api_key: env_var(ENV_API_KEY).unwrap_or_default(),
            deployment_token: env_var(ENV_DEPLOYMENT_TOKEN).unwrap_or_default(),
            deployment_id: env_var(ENV_DEPLOYMENT_ID).unwrap_or_default(),
            base_url: env_var(ENV_BASE_URL),
            timeout: env_timeout(),
        }
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.api_key.is_empty() {
            return Err(ChatError::MissingCredential("API key"));
        }
        if self.deployment_token.is_empty() {
            return Err(ChatError::MissingCredential("deployment token"));
        }
        if self.deployment_id.is_empty() {
            return Err(ChatError::MissingCredential("deployment id"));
        }
        Ok(())
    }
}

/// Client for `POST /api/v0/getChatResponse`.
#[derive(Clone)]
pub struct DeploymentClient {
    api: Arc<dyn HttpApi>,
    auth: Auth,
    deployment_token: String,
    deployment_id: String,
    base_url: String,
}

impl DeploymentClient {
    pub fn new(config: DeploymentConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let api = ReqwestApi::new(resolve_timeout(config.timeout))?;
        Self::with_http(config, Arc::new(api))
    }

    /// Build a client over a caller-supplied HTTP implementation.
    pub fn with_http(config: DeploymentConfig, api: Arc<dyn HttpApi>) -> Result<Self, ChatError> {
        config.validate()?;
        Ok(Self {
            api,
            auth: Auth::ApiKey(config.api_key),
            deployment_token: config.deployment_token,
            deployment_id: config.deployment_id,
            base_url: resolve_base_url(config.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    /// Build the request body without sending it.
    pub fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        options: impl IntoIterator<Item = ChatOption>,
    ) -> ChatRequest {
        let mut req = ChatRequest {
            deployment_token: self.deployment_token.clone(),
            deployment_id: self.deployment_id.clone(),
            messages,
            ..Default::default()
        };
        for option in options {
            option.apply(&mut req);
        }
        req
    }

    pub async fn get_chat_response(
        &self,
        messages: Vec<ChatMessage>,
        options: impl IntoIterator<Item = ChatOption>,
    ) -> Result<ChatResponse, ChatError> {
        if messages.is_empty() {
            return Err(ChatError::EmptyMessages);
        }

        let req = self.build_request(messages, options);
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        send_json(self.api.as_ref(), url, &self.auth, &req).await
    }
}
