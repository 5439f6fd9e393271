use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Transport settings for an OpenAI-compatible chat-completions endpoint.
/// The credential is supplied separately since its absence is meaningful.
#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAiClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.trim().is_empty() {
                cfg.model = model.trim().to_string();
            }
        }
        if let Ok(timeout) = std::env::var("OPENAI_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    api_key: String,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, cfg: OpenAiClientConfig) -> Result<Self, OpenAiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(OpenAiError::from_reqwest)?;
        Ok(Self { http, api_key: api_key.into(), cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiChatCompletionRequest {
        ApiChatCompletionRequest {
            model: req.model.clone().unwrap_or_else(|| self.cfg.model.clone()),
            temperature: req.temperature,
            top_p: req.top_p,
            max_tokens: req.max_tokens,
            messages: req
                .messages
                .iter()
                .map(|m| ApiChatMessage { role: m.role.as_api_str().to_string(), content: Some(m.content.clone()) })
                .collect(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError>;
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError> {
        if request.messages.is_empty() {
            return Err(OpenAiError::EmptyMessages);
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.build_api_request(&request))
            .send()
            .await
            .map_err(OpenAiError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(OpenAiError::from_reqwest)?;

        if !status.is_success() {
            let api_err = serde_json::from_slice::<ApiErrorEnvelope>(&bytes).ok().map(|env| env.error);
            return Err(OpenAiError::Api { status, error: api_err.unwrap_or_default() });
        }

        let parsed: ApiChatCompletionResponse = serde_json::from_slice(&bytes)?;
        let content = parsed
            .choices
            .iter()
            .find_map(|choice| choice.message.content.clone())
            .ok_or(OpenAiError::NoChoices)?;

        Ok(ChatCompletionResponse {
            content,
            usage: parsed.usage.map(|usage| UsageMetrics {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    System,
}

impl ChatRole {
    fn as_api_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
        }
    }
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("chat completion requires at least one message")]
    EmptyMessages,

    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("api error {status}: {}", error.message)]
    Api { status: StatusCode, error: ApiErrorBody },

    #[error("response contained no choices")]
    NoChoices,

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OpenAiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { OpenAiError::Timeout } else { OpenAiError::Http(err) }
    }

    /// Transient failures worth another attempt on the next cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenAiError::Timeout | OpenAiError::Http(_) => true,
            OpenAiError::Api { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

impl Default for ApiErrorBody {
    fn default() -> Self {
        Self { message: "unknown error".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    choices: Vec<ApiChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[cfg(test)]
pub use mock::MockClient;


#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::System, "Summarize this.")],
            max_tokens: Some(256),
            temperature: Some(0.7),
            top_p: Some(1.0),
        }
    }

    #[test]
    fn build_request_uses_config_model_and_sampling() {
        let client = OpenAiClient::new("test", OpenAiClientConfig::default()).unwrap();
        let value = serde_json::to_value(client.build_api_request(&sample_request())).unwrap();

        assert_eq!(value["model"], DEFAULT_MODEL);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "Summarize this.");
        assert_eq!(value["max_tokens"], 256);
        assert_eq!(value["top_p"], 1.0);
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn unset_sampling_fields_are_omitted() {
        let client = OpenAiClient::new("test", OpenAiClientConfig::default()).unwrap();
        let mut req = sample_request();
        req.temperature = None;
        req.top_p = None;
        req.max_tokens = None;
        let value = serde_json::to_value(client.build_api_request(&req)).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("top_p").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let cfg = OpenAiClientConfig { base_url: "http://proxy.local/v1/".into(), ..Default::default() };
        let client = OpenAiClient::new("k", cfg).unwrap();
        assert_eq!(client.endpoint(), "http://proxy.local/v1/chat/completions");
    }

    #[test]
    fn api_error_display_and_retry_classification() {
        let bad = OpenAiError::Api {
            status: StatusCode::BAD_REQUEST,
            error: ApiErrorBody { message: "bad request".into() },
        };
        assert_eq!(bad.to_string(), "api error 400 Bad Request: bad request");
        assert!(!bad.is_retryable());

        let limited = OpenAiError::Api { status: StatusCode::TOO_MANY_REQUESTS, error: ApiErrorBody::default() };
        assert!(limited.is_retryable());
        assert!(OpenAiError::Timeout.is_retryable());
    }

    #[tokio::test]
    async fn mock_client_returns_enqueued_response() {
        let mock = MockClient::new();
        mock.push_content("hi");

        let req = sample_request();
        let out = mock.chat_completion(req.clone()).await.unwrap();

        assert_eq!(out.content, "hi");
        assert_eq!(mock.calls(), vec![req]);
        assert!(matches!(mock.chat_completion(sample_request()).await, Err(OpenAiError::NoChoices)));
    }
}
