//! HTTP clients for hosted chat-completion APIs.
//!
//! Two independent clients share only the "POST JSON, decode JSON" helper
//! in this module:
//!
//! - [`CompletionsClient`]: OpenAI-style `/v1/chat/completions`, bearer auth.
//! - [`DeploymentClient`]: deployment-scoped `/api/v0/getChatResponse`,
//!   authenticated with an `apiKey` header plus a deployment token and id.
//!
//! Each call issues exactly one request. Nothing is retried.

pub mod completions;
pub mod deployment;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub use completions::CompletionsClient;
pub use deployment::DeploymentClient;

/// Default API root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.abacus.ai";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_KEY: &str = "ABACUS_API_KEY";
pub const ENV_DEPLOYMENT_TOKEN: &str = "ABACUS_DEPLOYMENT_TOKEN";
pub const ENV_DEPLOYMENT_ID: &str = "ABACUS_DEPLOYMENT_ID";
pub const ENV_BASE_URL: &str = "ABACUS_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "ABACUS_TIMEOUT_SECS";

/// Errors from the chat clients.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0} is required")]
    MissingCredential(&'static str),
    #[error("at least one message is required")]
    EmptyMessages,
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
    #[error("failed to marshal request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to execute request: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to unmarshal response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// How a client proves its identity to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `apiKey: <key>`
    ApiKey(String),
}

impl Auth {
    fn header(&self) -> (&'static str, String) {
        match self {
            Auth::Bearer(key) => ("authorization", format!("Bearer {}", key)),
            Auth::ApiKey(key) => ("apiKey", key.clone()),
        }
    }
}

/// A fully prepared POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// Status and raw body of an HTTP reply.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Trait abstracting the HTTP round trip for testing.
#[async_trait]
pub trait HttpApi: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpReply, ChatError>;
}

/// Real HTTP client backed by reqwest.
#[derive(Clone)]
pub struct ReqwestApi {
    http: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(timeout: Duration) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpApi for ReqwestApi {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpReply, ChatError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ChatError::InvalidHeader(*name))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ChatError::InvalidHeader(*name))?;
            headers.insert(header_name, header_value);
        }

        let response = self
            .http
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport_error)?;
        Ok(HttpReply { status, body })
    }
}

fn classify_transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Network(e.to_string())
    }
}

/// Serialize `body`, POST it to `url` with JSON content type and the given
/// credential, and decode a 2xx reply as `Resp`.
pub async fn send_json<Req, Resp>(
    api: &dyn HttpApi,
    url: String,
    auth: &Auth,
    body: &Req,
) -> Result<Resp, ChatError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let body = serde_json::to_vec(body).map_err(ChatError::Encode)?;
    let (auth_name, auth_value) = auth.header();

    tracing::debug!(url = %url, len = body.len(), "POST");

    let reply = api
        .post_json(HttpRequest {
            url,
            headers: vec![
                ("content-type", "application/json".to_string()),
                (auth_name, auth_value),
            ],
            body,
        })
        .await?;

    if !(200..300).contains(&reply.status) {
        tracing::warn!(status = reply.status, "API request failed");
        return Err(ChatError::Status {
            status: reply.status,
            body: reply.body,
        });
    }

    serde_json::from_str(&reply.body).map_err(ChatError::Decode)
}

pub(crate) fn resolve_base_url(base_url: Option<String>) -> String {
    match base_url {
        Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

pub(crate) fn resolve_timeout(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(t) if !t.is_zero() => t,
        _ => DEFAULT_TIMEOUT,
    }
}

/// Read an environment variable, treating empty values as unset.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Decode `null` as the field's default, as the upstream APIs send `null`
/// for empty strings, lists and counters.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub(crate) fn env_timeout() -> Option<Duration> {
    env_var(ENV_TIMEOUT_SECS)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every request and answers with a canned reply.
    pub struct MockHttp {
        pub requests: Mutex<Vec<HttpRequest>>,
        status: u16,
        body: String,
    }

    impl MockHttp {
        pub fn replying(status: u16, body: impl Into<String>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                status,
                body: body.into(),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request recorded")
        }

        pub fn last_body(&self) -> serde_json::Value {
            serde_json::from_slice(&self.last_request().body).unwrap()
        }

        pub fn header(&self, name: &str) -> Option<String> {
            self.last_request()
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }
    }

    #[async_trait]
    impl HttpApi for MockHttp {
        async fn post_json(&self, request: HttpRequest) -> Result<HttpReply, ChatError> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpReply {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockHttp;
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(resolve_base_url(None), DEFAULT_BASE_URL);
        assert_eq!(resolve_base_url(Some(String::new())), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url(Some("http://localhost:8080/".into())),
            "http://localhost:8080"
        );
        assert_eq!(resolve_timeout(None), DEFAULT_TIMEOUT);
        assert_eq!(resolve_timeout(Some(Duration::ZERO)), DEFAULT_TIMEOUT);
        assert_eq!(
            resolve_timeout(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_auth_headers() {
        assert_eq!(
            Auth::Bearer("k".into()).header(),
            ("authorization", "Bearer k".to_string())
        );
        assert_eq!(Auth::ApiKey("k".into()).header(), ("apiKey", "k".to_string()));
    }

    #[tokio::test]
    async fn test_send_json_sets_headers() {
        let api = MockHttp::replying(200, r#"{"ok":true}"#);
        let resp: Value = send_json(
            &api,
            "http://x/y".into(),
            &Auth::ApiKey("secret".into()),
            &json!({"a": 1}),
        )
        .await
        .unwrap();

        assert_eq!(resp, json!({"ok": true}));
        assert_eq!(api.header("content-type").as_deref(), Some("application/json"));
        assert_eq!(api.header("apiKey").as_deref(), Some("secret"));
        assert_eq!(api.last_body(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_send_json_non_2xx() {
        let api = MockHttp::replying(503, "upstream down");
        let auth = Auth::Bearer("k".into());
        let err = send_json::<_, Value>(&api, "http://x".into(), &auth, &json!({}))
            .await
            .unwrap_err();
        match err {
            ChatError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_json_decode_error() {
        let api = MockHttp::replying(200, "not json");
        let auth = Auth::Bearer("k".into());
        let err = send_json::<_, Value>(&api, "http://x".into(), &auth, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
    }
}
