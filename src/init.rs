use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::telemetry;
use crate::telemetry::ops::init::Phase as InitPhase;

/// `newsbot init`: apply pending schema migrations
#[derive(Args, Debug)]
pub struct InitCmd {}

#[derive(Serialize)]
struct InitResult {
    migrated: bool,
}

pub async fn run(pool: &PgPool, _args: InitCmd) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span().entered();

    // idempotent: already-applied migrations are skipped
    sqlx::migrate!()
        .run(pool)
        .instrument(log.span(&InitPhase::Migrate))
        .await
        .context("apply migrations")?;

    log.info("✅ Database initialized");
    if telemetry::config::json_mode() {
        log.result(&InitResult { migrated: true })?;
    }
    Ok(())
}
