use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use url::Url;

use crate::store::{PgStore, Source, SourceProvider};
use crate::telemetry::{self};
use crate::telemetry::ops::source::Phase as SourcePhase;

/// newsbot source add/ls/rm
#[derive(Args)]
pub struct SourceCmd {
    #[command(subcommand)]
    pub cmd: SourceSub,
}

#[derive(Subcommand)]
pub enum SourceSub {
    // register a feed (plan-only by default; use --apply to write)
    Add {
        url: String,
        /// Display name; defaults to the feed host.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    // list feeds
    Ls,
    // remove a feed and its articles (plan-only by default)
    Rm {
        id: i64,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

#[derive(Serialize)]
struct SourceAddPlan {
    action: &'static str,
    url: String,
    name: String,
}

#[derive(Serialize)]
struct SourceAddResult {
    source_id: i64,
    inserted: bool,
    url: String,
}

#[derive(Serialize)]
struct SourceList {
    sources: Vec<Source>,
}

#[derive(Serialize)]
struct SourceRemovePlan {
    action: &'static str,
    source: Source,
}

#[derive(Serialize)]
struct SourceRemoveResult {
    source_id: i64,
    removed: bool,
}

pub async fn run(store: &PgStore, args: SourceCmd) -> Result<()> {
    let log = telemetry::source();
    let _g = log.root_span().entered();
    match args.cmd {
        SourceSub::Add { url, name, apply } => add_source(store, url, name, apply).await?,
        SourceSub::Ls => ls_sources(store).await?,
        SourceSub::Rm { id, apply } => rm_source(store, id, apply).await?,
    }
    Ok(())
}

fn default_name(url: &Url) -> String {
    url.host_str().map(|h| h.trim_start_matches("www.").to_string()).unwrap_or_else(|| url.to_string())
}

async fn add_source(store: &PgStore, url: String, name: Option<String>, apply: bool) -> Result<()> {
    let log = telemetry::source();
    let _g = log.root_span_kv([
        ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
        ("url", url.clone()),
        ("name", format!("{:?}", name)),
    ]).entered();

    // friendly error before any DB I/O
    let parsed = match Url::parse(&url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => u,
        _ => bail!("Invalid feed URL: {}", url),
    };
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| default_name(&parsed));

    if !apply {
        let _s = log.span(&SourcePhase::Plan).entered();
        log.info(format!("📝 Source plan — add url={} name={}", url, name));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&SourceAddPlan { action: "add", url, name })?;
        }
        return Ok(());
    }

    let _s = log.span(&SourcePhase::Add).entered();
    let (source_id, inserted) = store.add_source(&name, &url).await?;
    if inserted { log.info(format!("➕ Source added id={}", source_id)); } else { log.info(format!("♻️ Source updated id={}", source_id)); }
    if telemetry::config::json_mode() {
        log.result(&SourceAddResult { source_id, inserted, url })?;
    }
    Ok(())
}

async fn ls_sources(store: &PgStore) -> Result<()> {
    let log = telemetry::source();
    let _s = log.span(&SourcePhase::List).entered();
    let sources = store.list_sources().await?;
    log.info("📡 Sources:");
    for s in &sources {
        log.info(format!("[{}] {} ({}) added_at={}", s.id, s.feed_url, s.name, s.created_at.to_rfc3339()));
    }
    if telemetry::config::json_mode() {
        log.result(&SourceList { sources })?;
    }
    Ok(())
}

async fn rm_source(store: &PgStore, id: i64, apply: bool) -> Result<()> {
    let log = telemetry::source();
    let _g = log.root_span_kv([
        ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
        ("source_id", id.to_string()),
    ]).entered();

    let source = store.source_by_id(id).await?;

    if !apply {
        let _s = log.span(&SourcePhase::Plan).entered();
        log.info(format!("📝 Source plan — remove [{}] {} ({}) and its articles", source.id, source.feed_url, source.name));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&SourceRemovePlan { action: "remove", source })?;
        }
        return Ok(());
    }

    let _s = log.span(&SourcePhase::Remove).entered();
    store.delete_source(id).await?;
    log.info(format!("🗑️ Source removed id={}", id));
    if telemetry::config::json_mode() {
        log.result(&SourceRemoveResult { source_id: id, removed: true })?;
    }
    Ok(())
}
