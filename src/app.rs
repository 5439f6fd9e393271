//! Component wiring and the one-shot `fetch` / `deliver` commands.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::Settings;
use crate::deliver::{DeliveryOutcome, Notifier};
use crate::error::PipelineError;
use crate::extract::ReadabilityExtractor;
use crate::fetch::Fetcher;
use crate::filter::KeywordFilter;
use crate::llm::openai::{OpenAiClient, OpenAiClientConfig};
use crate::publish::TelegramPublisher;
use crate::source::RssResolver;
use crate::store::PgStore;
use crate::summary::{OpenAiSummarizer, Summarizer};
use crate::telemetry;
use crate::telemetry::emit::Meta;

const USER_AGENT: &str = concat!("newsbot/", env!("CARGO_PKG_VERSION"));

/// `newsbot fetch`: run a single fetch cycle
#[derive(Args, Debug)]
pub struct FetchCmd {}

/// `newsbot deliver`: run a single delivery cycle
#[derive(Args, Debug)]
pub struct DeliverCmd {}

pub fn http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("build http client")
}

pub fn fetcher(store: &Arc<PgStore>, settings: &Settings, client: Client) -> Fetcher {
    Fetcher::new(
        store.clone(),
        store.clone(),
        Arc::new(RssResolver::new(client)),
        KeywordFilter::new(&settings.filter_keywords),
    )
}

pub fn summarizer(settings: &Settings) -> Result<OpenAiSummarizer> {
    let log = telemetry::deliver();
    match settings.openai_api_key.as_deref() {
        Some(key) => {
            let cfg = OpenAiClientConfig::from_env();
            log.info_kv("🧠 summarizer enabled", [("model", cfg.model.clone())]);
            let client = OpenAiClient::new(key, cfg).context("build OpenAI client")?;
            Ok(OpenAiSummarizer::new(Arc::new(client), settings.openai_prompt.clone()))
        }
        None => {
            log.info("🧠 summarizer disabled (OPENAI_API_KEY unset)");
            Ok(OpenAiSummarizer::disabled())
        }
    }
}

pub fn notifier(store: &Arc<PgStore>, settings: &Settings, client: Client) -> Result<Notifier> {
    let tg = settings.telegram()?;
    let summarizer: Arc<dyn Summarizer> = Arc::new(summarizer(settings)?);
    let extractor = ReadabilityExtractor::new(client.clone()).context("build extractor")?;
    Ok(Notifier::new(
        store.clone(),
        Arc::new(extractor),
        summarizer,
        Arc::new(TelegramPublisher::new(client, tg.api_url, tg.bot_token)),
        tg.channel_id,
        settings.lookup_window,
    ))
}

/// Token cancelled on Ctrl-C or SIGTERM.
pub fn cancel_on_shutdown() -> CancellationToken {
    let ct = CancellationToken::new();
    let trigger = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });
    ct
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Shutdown during a one-shot cycle is a normal stop, not a failure.
fn stopped_on_cancel<T>(res: Result<T, PipelineError>) -> Result<Option<T>, PipelineError> {
    match res {
        Err(err) if err.is_cancelled() => Ok(None),
        other => other.map(Some),
    }
}

pub async fn run_fetch(store: Arc<PgStore>, settings: &Settings, _args: FetchCmd) -> Result<()> {
    let log = telemetry::fetch();
    let t0 = Instant::now();
    let fetcher = fetcher(&store, settings, http_client(settings)?);
    let ct = cancel_on_shutdown();

    let Some(report) = stopped_on_cancel(fetcher.run_once(&ct).instrument(log.root_span()).await)? else {
        log.info("🛑 stopped");
        return Ok(());
    };

    if telemetry::config::json_mode() {
        telemetry::emit::print_result("fetch", &report, Some(Meta { duration_ms: Some(t0.elapsed().as_millis()) }))?;
    }
    Ok(())
}

pub async fn run_deliver(store: Arc<PgStore>, settings: &Settings, _args: DeliverCmd) -> Result<()> {
    let log = telemetry::deliver();
    let t0 = Instant::now();
    let notifier = notifier(&store, settings, http_client(settings)?)?;
    let ct = cancel_on_shutdown();

    let Some(outcome) = stopped_on_cancel(notifier.select_and_send(&ct).instrument(log.root_span()).await)? else {
        log.info("🛑 stopped");
        return Ok(());
    };
    if outcome == DeliveryOutcome::Skipped {
        log.info("💤 nothing eligible to deliver");
    }

    if telemetry::config::json_mode() {
        telemetry::emit::print_result("deliver", &outcome, Some(Meta { duration_ms: Some(t0.elapsed().as_millis()) }))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, StoreError};
    use crate::store::memory::MemoryStore;

    #[test]
    fn cancellation_is_not_a_failure() {
        assert!(matches!(stopped_on_cancel::<()>(Err(PipelineError::Cancelled)), Ok(None)));
        assert!(matches!(stopped_on_cancel(Ok(3)), Ok(Some(3))));

        let err = stopped_on_cancel::<()>(Err(ExtractionError::NoContent { url: "https://x.test".into() }.into()));
        assert!(matches!(err, Err(PipelineError::Extraction(_))));
        let err = stopped_on_cancel::<()>(Err(StoreError::NotFound { entity: "article", id: 1 }.into()));
        assert!(matches!(err, Err(PipelineError::Store(_))));
    }

    #[tokio::test]
    async fn fetch_cycle_interrupted_by_shutdown_stops_cleanly() {
        let store = Arc::new(MemoryStore::new());
        store.add_source(1, "a", "http://127.0.0.1:1/feed");
        let fetcher = Fetcher::new(
            store.clone(),
            store.clone(),
            Arc::new(RssResolver::new(Client::new())),
            KeywordFilter::new(Vec::<String>::new()),
        );
        let ct = CancellationToken::new();
        ct.cancel();

        let out = stopped_on_cancel(fetcher.run_once(&ct).await).unwrap();
        assert!(out.is_none());
    }
}
