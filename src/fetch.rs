//! Fetch pipeline: poll every source concurrently, filter, persist.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::PipelineError;
use crate::filter::KeywordFilter;
use crate::source::{FeedSource, SourceResolver};
use crate::store::{ArticleStore, InsertOutcome, NewArticle, SourceProvider};
use crate::telemetry;
use crate::telemetry::ops::fetch::Phase as FetchPhase;
use crate::util::cancel::until_cancelled;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceSummary {
    pub source_id: i64,
    pub name: String,
    pub inserted: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source_id: i64,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub sources: usize,
    pub per_source: Vec<SourceSummary>,
    pub failed: Vec<SourceFailure>,
}

impl FetchReport {
    pub fn inserted(&self) -> usize { self.per_source.iter().map(|s| s.inserted).sum() }
    pub fn duplicates(&self) -> usize { self.per_source.iter().map(|s| s.duplicates).sum() }
    pub fn filtered(&self) -> usize { self.per_source.iter().map(|s| s.filtered).sum() }
    pub fn errors(&self) -> usize { self.per_source.iter().map(|s| s.errors).sum() }
}

pub struct Fetcher {
    sources: Arc<dyn SourceProvider>,
    articles: Arc<dyn ArticleStore>,
    resolver: Arc<dyn SourceResolver>,
    filter: Arc<KeywordFilter>,
}

impl Fetcher {
    pub fn new(
        sources: Arc<dyn SourceProvider>,
        articles: Arc<dyn ArticleStore>,
        resolver: Arc<dyn SourceResolver>,
        filter: KeywordFilter,
    ) -> Self {
        Self { sources, articles, resolver, filter: Arc::new(filter) }
    }

    /// One fetch cycle. Only a failure to list sources fails the cycle; a
    /// failing source is logged and reported without affecting the others.
    pub async fn run_once(&self, ct: &CancellationToken) -> Result<FetchReport, PipelineError> {
        let log = telemetry::fetch();

        let sources = until_cancelled(ct, self.sources.list_sources())
            .instrument(log.span(&FetchPhase::ListSources))
            .await?;

        let mut tasks = JoinSet::new();
        for src in &sources {
            if ct.is_cancelled() { break; }
            let adapter = self.resolver.resolve(src);
            let span = log.span_kv(&FetchPhase::Source, [("source_id", src.id.to_string()), ("url", src.feed_url.clone())]);
            tasks.spawn(
                fetch_source(adapter, self.articles.clone(), self.filter.clone(), ct.clone()).instrument(span),
            );
        }

        let mut report = FetchReport { sources: sources.len(), ..Default::default() };
        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SourceRun { result: Ok(summary), .. }) => {
                    log.source_summary(summary.source_id, summary.inserted, summary.duplicates, summary.filtered, summary.errors);
                    report.per_source.push(summary);
                }
                Ok(SourceRun { result: Err(PipelineError::Cancelled), .. }) => cancelled = true,
                Ok(SourceRun { source_id, name, result: Err(err) }) => {
                    log.warn_kv("⚠️  source failed", [("source_id", source_id.to_string()), ("name", name.clone()), ("error", err.to_string())]);
                    report.failed.push(SourceFailure { source_id, name, error: err.to_string() });
                }
                Err(join_err) => {
                    log.error(format!("❌ source task aborted: {join_err}"));
                    report.failed.push(SourceFailure { source_id: -1, name: String::new(), error: join_err.to_string() });
                }
            }
        }

        if cancelled || ct.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        log.totals(report.sources, report.failed.len(), report.inserted(), report.duplicates(), report.filtered(), report.errors());
        Ok(report)
    }

    /// Run a cycle now and then on every tick until `ct` fires, returning
    /// `Err(PipelineError::Cancelled)`. Cycle failures are logged and the
    /// loop waits for the next tick; slow cycles delay ticks, never overlap.
    pub async fn run(&self, ct: CancellationToken, interval: Duration) -> Result<(), PipelineError> {
        let log = telemetry::fetch();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ct.cancelled() => return Err(PipelineError::Cancelled),
                _ = ticker.tick() => {}
            }

            match self.run_once(&ct).instrument(log.root_span()).await {
                Ok(_) => {}
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(err) => log.error_kv("❌ fetch cycle failed", [("error", err.to_string())]),
            }
        }
    }
}

struct SourceRun {
    source_id: i64,
    name: String,
    result: Result<SourceSummary, PipelineError>,
}

async fn fetch_source(
    adapter: Arc<dyn FeedSource>,
    articles: Arc<dyn ArticleStore>,
    filter: Arc<KeywordFilter>,
    ct: CancellationToken,
) -> SourceRun {
    let source_id = adapter.id();
    let name = adapter.name().to_string();
    let result = process_source(adapter.as_ref(), articles.as_ref(), &filter, &ct).await;
    SourceRun { source_id, name, result }
}

async fn process_source(
    adapter: &dyn FeedSource,
    articles: &dyn ArticleStore,
    filter: &KeywordFilter,
    ct: &CancellationToken,
) -> Result<SourceSummary, PipelineError> {
    let log = telemetry::fetch();
    let items = adapter.fetch(ct).await?;

    let mut summary = SourceSummary { source_id: adapter.id(), name: adapter.name().to_string(), ..Default::default() };
    for item in items {
        if filter.should_skip(&item) {
            log.debug_kv("↩️ filtered", [("title", item.title.clone()), ("link", item.link.clone()), ("source", item.source_name.clone())]);
            summary.filtered += 1;
            continue;
        }

        let article = NewArticle {
            source_id: adapter.id(),
            published_at: item.published_at.with_timezone(&Utc),
            title: item.title,
            link: item.link,
            summary: item.summary,
        };
        let link = article.link.clone();

        // best effort: one failed insert never stops the rest of the feed
        match until_cancelled(ct, articles.insert_article(article))
            .instrument(log.span(&FetchPhase::WriteArticle))
            .await
        {
            Ok(InsertOutcome::Inserted) => summary.inserted += 1,
            Ok(InsertOutcome::Duplicate) => summary.duplicates += 1,
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(err) => {
                log.warn_kv("⚠️  insert failed", [("link", link), ("error", err.to_string())]);
                summary.errors += 1;
            }
        }
    }
    Ok(summary)
}
