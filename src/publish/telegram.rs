//! Telegram Bot API `sendMessage` publisher.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::PublishError;

use super::Publisher;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

pub struct TelegramPublisher {
    client: Client,
    api_url: String,
    bot_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramPublisher {
    pub fn new(client: Client, api_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self { client, api_url: api_url.into(), bot_token: bot_token.into() }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url.trim_end_matches('/'), self.bot_token)
    }

    async fn send_message(&self, channel_id: i64, text: &str) -> Result<(), PublishError> {
        let body = json!({
            "chat_id": channel_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });
        let http = |source| PublishError::Http { channel_id, source };

        let resp = self.client.post(self.method_url("sendMessage")).json(&body).send().await.map_err(http)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(http)?;
        let reply = serde_json::from_slice::<ApiReply>(&bytes).ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
            reply => Err(PublishError::Api {
                channel_id,
                status,
                description: reply
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned()),
            }),
        }
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, ct: &CancellationToken, channel_id: i64, text: &str) -> Result<(), PublishError> {
        tokio::select! {
            biased;
            _ = ct.cancelled() => Err(PublishError::Cancelled),
            res = self.send_message(channel_id, text) => res,
        }
    }
}
