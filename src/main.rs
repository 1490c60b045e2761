//! Thin binary entry point; the hub itself lives in the library crate so
//! `benches/` can reach the broadcast and flood-guard paths directly.

use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use verlihub_rs::config::Config;
use verlihub_rs::db::{self, Database};
use verlihub_rs::handlers::context::SecurityShared;
use verlihub_rs::hooks::Hooks;
use verlihub_rs::network::Gateway;
use verlihub_rs::state::Hub;
use verlihub_rs::{http, metrics, scheduler, worker};

const HUB_MAILBOX_CAPACITY: usize = 1024;

/// Resolve the configuration path from CLI arguments.
/// Supports `-c <path>`, `--config <path>`, or a bare path.
/// Falls back to `config.toml` when no argument is provided.
fn resolve_config_path() -> String {
    let mut args = std::env::args().skip(1);

    let raw_path = match args.next() {
        Some(flag) if flag == "-c" || flag == "--config" => args.next().unwrap_or_else(|| {
            eprintln!("Missing path after {flag}");
            std::process::exit(1);
        }),
        Some(path) => path,
        None => "config.toml".to_string(),
    };

    match std::fs::canonicalize(Path::new(&raw_path)) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => raw_path,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();

    // `Config::load` validates internally; a second pass here would be redundant.
    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("ERROR: failed to load config from {config_path}: {e}");
        e
    })?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match config.server.log_format {
        verlihub_rs::config::LogFormat::Json => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).json().init();
        }
        verlihub_rs::config::LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).init();
        }
    }

    info!(hub = %config.server.name, listen = %config.listen.address, "starting verlihub-rs");

    let config = Arc::new(config);

    let db = Database::new(&config.server.database_path).await?;

    let topic_seed = match db::setup::get(db.pool(), "hub_topic").await {
        Ok(Some(stored)) => stored,
        Ok(None) => config.server.topic.clone(),
        Err(err) => {
            tracing::warn!(%err, "failed to read stored hub topic, using config default");
            config.server.topic.clone()
        }
    };
    let topic = Arc::new(RwLock::new(topic_seed));

    let security = Arc::new(SecurityShared::new(config.flood.clone_fragment_len));
    let hooks = Arc::new(Hooks::new());

    let hub = Hub::spawn(config.clone(), db.clone(), HUB_MAILBOX_CAPACITY);
    let worker = worker::WorkerHandle::spawn();
    scheduler::spawn(config.clone(), db.clone(), security.clone(), topic.clone(), worker);

    if let Some(bind) = config.metrics.bind {
        metrics::init();
        tokio::spawn(http::run_metrics_server(bind));
    }

    let gateway = Gateway::bind(config.listen.address, hub, db, config.clone(), security, topic, hooks).await?;
    gateway.run().await?;

    Ok(())
}
