//! Short abstracts via an OpenAI-compatible completion service.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SummarizationError;
use crate::telemetry;
use crate::llm::openai::{ChatCompletionRequest, ChatMessage, ChatRole, LlmClient};

pub const DEFAULT_PROMPT: &str =
    "\n\nSummarize the article above in two or three plain sentences. Do not add a title, links or emojis.";

const MAX_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 1.0;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, ct: &CancellationToken, text: &str) -> Result<String, SummarizationError>;
}

pub struct OpenAiSummarizer {
    /// `None` when no credential is configured.
    client: Option<Arc<dyn LlmClient>>,
    prompt: String,
    // one request in flight per instance
    gate: Mutex<()>,
}

impl OpenAiSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, prompt: impl Into<String>) -> Self {
        Self { client: Some(client), prompt: prompt.into(), gate: Mutex::new(()) }
    }

    pub fn disabled() -> Self {
        Self { client: None, prompt: String::new(), gate: Mutex::new(()) }
    }

    fn request(&self, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::System, format!("{text}{}", self.prompt))],
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, ct: &CancellationToken, text: &str) -> Result<String, SummarizationError> {
        let Some(client) = self.client.as_ref() else {
            return Ok(String::new());
        };

        let req = self.request(text);
        let call = async {
            let _guard = self.gate.lock().await;
            client.chat_completion(req).await
        };
        let resp = tokio::select! {
            biased;
            _ = ct.cancelled() => return Err(SummarizationError::Cancelled),
            res = call => res,
        };

        let log = telemetry::deliver();
        let resp = resp.inspect_err(|e| {
            log.warn_kv("completion failed", [("retryable", e.is_retryable().to_string())]);
        })?;
        if let Some(usage) = &resp.usage {
            log.debug_kv("completion usage", [
                ("prompt_tokens", format!("{:?}", usage.prompt_tokens)),
                ("completion_tokens", format!("{:?}", usage.completion_tokens)),
                ("total_tokens", format!("{:?}", usage.total_tokens)),
            ]);
        }
        Ok(trim_to_sentence(&resp.content))
    }
}

/// Drop a trailing fragment cut off by the token limit. Text without any
/// sentence terminator yields an empty summary.
pub fn trim_to_sentence(raw: &str) -> String {
    let text = raw.trim();
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');
    if text.ends_with(is_terminator) {
        return text.to_string();
    }
    match text.rfind(is_terminator) {
        Some(idx) => text[..=idx].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::SummarizationError;
    use crate::llm::openai::{MockClient, OpenAiError};

    #[test]
    fn incomplete_trailing_sentence_is_dropped() {
        assert_eq!(trim_to_sentence("Foo bar baz. Qux cor"), "Foo bar baz.");
        assert_eq!(trim_to_sentence("  One. Two!  Three? four  "), "One. Two!  Three?");
    }

    #[test]
    fn complete_text_is_kept_trimmed() {
        assert_eq!(trim_to_sentence("\n Already done. \n"), "Already done.");
        assert_eq!(trim_to_sentence("Really?"), "Really?");
    }

    #[test]
    fn no_terminator_yields_empty() {
        assert_eq!(trim_to_sentence("cut off mid"), "");
        assert_eq!(trim_to_sentence("   "), "");
    }

    #[tokio::test]
    async fn disabled_returns_empty_without_error() {
        let s = OpenAiSummarizer::disabled();
        let out = s.summarize(&CancellationToken::new(), "some text").await.unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn sends_text_with_prompt_and_fixed_sampling() {
        let mock = Arc::new(MockClient::new());
        mock.push_content("Short summary. And a cut");
        let s = OpenAiSummarizer::new(mock.clone(), " PROMPT");

        let out = s.summarize(&CancellationToken::new(), "article body").await.unwrap();
        assert_eq!(out, "Short summary.");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages, vec![ChatMessage::new(ChatRole::System, "article body PROMPT")]);
        assert_eq!(calls[0].max_tokens, Some(256));
        assert_eq!(calls[0].temperature, Some(0.7));
        assert_eq!(calls[0].top_p, Some(1.0));
    }

    #[tokio::test]
    async fn api_failure_is_summarization_error() {
        let mock = Arc::new(MockClient::new());
        mock.push_response(Err(OpenAiError::Timeout));
        let s = OpenAiSummarizer::new(mock, DEFAULT_PROMPT);
        let err = s.summarize(&CancellationToken::new(), "x").await.unwrap_err();
        assert!(matches!(err, SummarizationError::Api(OpenAiError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let mock = Arc::new(MockClient::with_delay(Duration::from_millis(50)));
        mock.push_content("A.");
        mock.push_content("B.");
        let s = OpenAiSummarizer::new(mock.clone(), DEFAULT_PROMPT);
        let ct = CancellationToken::new();

        let (a, b) = tokio::join!(s.summarize(&ct, "one"), s.summarize(&ct, "two"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(mock.calls().len(), 2);
        assert_eq!(mock.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let mock = Arc::new(MockClient::new());
        let s = OpenAiSummarizer::new(mock.clone(), DEFAULT_PROMPT);
        let ct = CancellationToken::new();
        ct.cancel();
        let err = s.summarize(&ct, "x").await.unwrap_err();
        assert!(matches!(err, SummarizationError::Cancelled));
        assert!(mock.calls().is_empty());
    }
}
