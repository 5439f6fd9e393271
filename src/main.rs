use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::PgPool;

mod app;
mod config;
mod deliver;
mod error;
mod extract;
mod fetch;
mod filter;
mod init;
mod llm;
mod publish;
mod run;
mod source;
mod sources;
mod store;
mod summary;
mod telemetry;
mod util;

use config::Settings;
use store::PgStore;

#[derive(Parser)]
#[command(name = "newsbot", about = "Feed-to-Telegram news pipeline")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Init(init::InitCmd),
    Source(sources::SourceCmd),
    Fetch(app::FetchCmd),
    Deliver(app::DeliverCmd),
    Run(run::RunCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // stderr logging; honors RUST_LOG and NEWSBOT_LOG_FORMAT
    telemetry::config::init_tracing();
    let dsn = cli
        .dsn
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;

    let pool = PgPool::connect(&dsn).await.context("connect to database")?;
    let store = Arc::new(PgStore::new(pool.clone()));

    match cli.command {
        Commands::Init(args) => init::run(&pool, args).await?,
        Commands::Source(args) => sources::run(&store, args).await?,
        Commands::Fetch(args) => app::run_fetch(store, &Settings::from_env()?, args).await?,
        Commands::Deliver(args) => app::run_deliver(store, &Settings::from_env()?, args).await?,
        Commands::Run(args) => run::run(store, Settings::from_env()?, args).await?,
    }

    Ok(())
}
