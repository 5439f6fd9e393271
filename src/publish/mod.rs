//! Outbound channel contract and message formatting.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PublishError;

pub mod markup;
mod telegram;

pub use markup::escape_markdown;
pub use telegram::{DEFAULT_API_URL, TelegramPublisher};

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, ct: &CancellationToken, channel_id: i64, text: &str) -> Result<(), PublishError>;
}

/// Bold title, blank line, summary, blank line, link. An empty summary
/// leaves just the title and link.
pub fn format_message(title: &str, summary: &str, link: &str) -> String {
    let summary = summary.trim();
    let body = if summary.is_empty() { String::new() } else { format!("\n\n{}", escape_markdown(summary)) };
    format!("*{}*{}\n\n{}", escape_markdown(title), body, escape_markdown(link))
}
