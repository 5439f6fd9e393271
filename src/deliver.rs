//! Delivery pipeline: one article per cycle, oldest eligible first.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::publish::{Publisher, format_message};
use crate::store::ArticleStore;
use crate::summary::Summarizer;
use crate::telemetry;
use crate::telemetry::ops::deliver::Phase as DeliverPhase;
use crate::util::cancel::until_cancelled;
use crate::util::time::to_chrono;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { article_id: i64, title: String, link: String },
    Skipped,
}

pub struct Notifier {
    articles: Arc<dyn ArticleStore>,
    extractor: Arc<dyn Extractor>,
    summarizer: Arc<dyn Summarizer>,
    publisher: Arc<dyn Publisher>,
    channel_id: i64,
    lookup_window: Duration,
}

impl Notifier {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        extractor: Arc<dyn Extractor>,
        summarizer: Arc<dyn Summarizer>,
        publisher: Arc<dyn Publisher>,
        channel_id: i64,
        lookup_window: Duration,
    ) -> Self {
        Self { articles, extractor, summarizer, publisher, channel_id, lookup_window }
    }

    /// Select, extract, summarize, publish, commit. Any stage failure leaves
    /// the article unposted so the next cycle picks it up again.
    pub async fn select_and_send(&self, ct: &CancellationToken) -> Result<DeliveryOutcome, PipelineError> {
        let log = telemetry::deliver();
        let since = Utc::now() - to_chrono(self.lookup_window);

        let mut batch = until_cancelled(ct, self.articles.list_unposted(since, 1))
            .instrument(log.span(&DeliverPhase::Select))
            .await?;
        let Some(article) = batch.pop() else {
            log.debug("nothing to deliver");
            return Ok(DeliveryOutcome::Skipped);
        };

        let text = self
            .extractor
            .extract(&article, ct)
            .instrument(log.span_kv(&DeliverPhase::Extract, [("article_id", article.id.to_string()), ("link", article.link.clone())]))
            .await?;

        let summary = self
            .summarizer
            .summarize(ct, &text)
            .instrument(log.span(&DeliverPhase::Summarize))
            .await?;

        let message = format_message(&article.title, &summary, &article.link);
        self.publisher
            .publish(ct, self.channel_id, &message)
            .instrument(log.span(&DeliverPhase::Publish))
            .await?;

        // already published: record it even if shutdown has started
        self.articles
            .mark_delivered(article.id)
            .instrument(log.span(&DeliverPhase::Commit))
            .await?;

        log.info_kv("📨 delivered", [("article_id", article.id.to_string()), ("title", article.title.clone())]);
        Ok(DeliveryOutcome::Sent { article_id: article.id, title: article.title, link: article.link })
    }

    /// Same scheduling shape as the fetcher: first cycle immediately, no
    /// overlap, no catch-up. Returns `Err(PipelineError::Cancelled)` on stop.
    pub async fn run(&self, ct: CancellationToken, interval: Duration) -> Result<(), PipelineError> {
        let log = telemetry::deliver();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ct.cancelled() => return Err(PipelineError::Cancelled),
                _ = ticker.tick() => {}
            }

            match self.select_and_send(&ct).instrument(log.root_span()).await {
                Ok(_) => {}
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(err) => log.error_kv("❌ delivery cycle failed", [("error", err.to_string())]),
            }
        }
    }
}
