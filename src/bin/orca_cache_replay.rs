use anyhow::{Context, Result};
use clap::Parser;
use orca_cache::presentation::dto::cache_dto::ReplayScript;
use orca_cache::shared::logging;
use orca_cache::{AppConfig, AppError, CacheHandler, MemoryViewStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "orca-cache-replay")]
#[command(about = "Replay updateCache calls against a seeded view cache", long_about = None)]
struct Cli {
    /// Replay script (JSON with `seed`, `updates` and `reorders`)
    #[arg(short, long, env = "ORCA_REPLAY_SCRIPT")]
    script: PathBuf,

    /// Pretty-print the resulting cache
    #[arg(long)]
    pretty: bool,

    /// Log filter (overrides ORCA_LOG_FILTER)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ORCA_LOG_JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(filter) = cli.log_level {
        config.logging.filter = filter;
    }
    config.logging.json |= cli.json_logs;
    config.validate().map_err(AppError::Configuration)?;
    logging::init(&config.logging);

    info!("Starting orca-cache-replay v{}", env!("CARGO_PKG_VERSION"));

    let script = ReplayScript::load(&cli.script)
        .with_context(|| format!("failed to load {}", cli.script.display()))?;

    let store = Arc::new(MemoryViewStore::with_change_buffer(config.store.change_buffer));
    let handler = CacheHandler::new(store);
    let report = handler.replay(script).await?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
