use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::app;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::store::PgStore;
use crate::telemetry;
use crate::telemetry::ops::run::Phase as RunPhase;
use crate::util::time::parse_duration_str;

/// `newsbot run`: poll feeds and deliver articles until stopped
#[derive(Args, Debug)]
pub struct RunCmd {
    /// Overrides FETCH_INTERVAL (e.g. 10m)
    #[arg(long, value_parser = parse_interval)]
    pub fetch_interval: Option<Duration>,
    /// Overrides NOTIFICATION_INTERVAL (e.g. 1m)
    #[arg(long, value_parser = parse_interval)]
    pub notify_interval: Option<Duration>,
    /// Overrides LOOKUP_WINDOW (e.g. 20m)
    #[arg(long, value_parser = parse_interval)]
    pub lookup_window: Option<Duration>,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_duration_str(s).ok_or_else(|| format!("invalid duration {s:?}; use e.g. 90s, 10m, 1h"))
}

pub async fn run(store: Arc<PgStore>, mut settings: Settings, args: RunCmd) -> Result<()> {
    let log = telemetry::run();

    if let Some(d) = args.fetch_interval { settings.set_fetch_interval(d); }
    if let Some(d) = args.notify_interval { settings.notification_interval = d; }
    if let Some(d) = args.lookup_window { settings.set_lookup_window(d); }

    let client = app::http_client(&settings)?;
    let fetcher = app::fetcher(&store, &settings, client.clone());
    let notifier = app::notifier(&store, &settings, client)?;

    log.info_kv("🚀 starting", [
        ("fetch_interval", format!("{:?}", settings.fetch_interval)),
        ("notify_interval", format!("{:?}", settings.notification_interval)),
        ("lookup_window", format!("{:?}", settings.lookup_window)),
        ("keywords", settings.filter_keywords.len().to_string()),
    ]);

    let ct = app::cancel_on_shutdown();
    let mut tasks: JoinSet<(&'static str, Result<(), PipelineError>)> = JoinSet::new();
    {
        let ct = ct.clone();
        let every = settings.fetch_interval;
        tasks.spawn(async move { ("fetcher", fetcher.run(ct, every).await) }.instrument(log.span(&RunPhase::Fetcher)));
    }
    {
        let ct = ct.clone();
        let every = settings.notification_interval;
        tasks.spawn(async move { ("notifier", notifier.run(ct, every).await) }.instrument(log.span(&RunPhase::Notifier)));
    }

    let mut failed = false;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Err(PipelineError::Cancelled))) => log.info(format!("🛑 {} stopped", name)),
            Ok((name, Err(err))) => {
                log.error_kv("❌ pipeline exited", [("pipeline", name.to_string()), ("error", err.to_string())]);
                failed = true;
                ct.cancel();
            }
            Ok((name, Ok(()))) => {
                log.warn_kv("⚠️  pipeline returned without cancellation", [("pipeline", name.to_string())]);
                ct.cancel();
            }
            Err(join_err) => {
                log.error(format!("❌ pipeline task aborted: {}", join_err));
                failed = true;
                ct.cancel();
            }
        }
    }

    log.info("👋 shutting down");
    if failed {
        bail!("a pipeline exited with an error");
    }
    Ok(())
}
