//! The three periodic background jobs the hub runs for its whole
//! lifetime: slow cleanup (short-ban sweep, ban/penalty/kick-history
//! pruning), config reload (the DB-backed subset of config re-applied
//! live, spec §9), and hublist announce (spec §9, handed off to
//! [`crate::worker`] so a slow or wedged announce never stalls the
//! cleanup jobs sharing this process).
//!
//! Each job gets its own `tokio::spawn`'d loop on its own interval,
//! following the one-task-per-periodic-job pattern the hub already
//! uses for the per-connection task.

use crate::config::Config;
use crate::db::Database;
use crate::handlers::context::{SecurityShared, SharedTopic};
use crate::worker::{Job, WorkerHandle};
use std::sync::Arc;
use std::time::Duration;

pub fn spawn(config: Arc<Config>, db: Database, security: Arc<SecurityShared>, topic: SharedTopic, worker: WorkerHandle) {
    spawn_slow_timer(config.clone(), db.clone(), security);
    spawn_reload_timer(config.clone(), db.clone(), topic);
    spawn_hublist_timer(config, db, worker);
}

/// Short-ban sweep, expired `banlist`/`temp_rights` pruning, and weekly
/// `kicklist` rotation (spec §9B).
fn spawn_slow_timer(config: Arc<Config>, db: Database, security: Arc<SecurityShared>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.scheduler.slow_timer_secs));
        loop {
            interval.tick().await;
            run_slow_timer(&config, &db, &security).await;
        }
    });
}

async fn run_slow_timer(config: &Config, db: &Database, security: &SecurityShared) {
    let now = chrono::Utc::now().timestamp();

    let swept = security.short_bans.sweep_expired(now);
    if swept > 0 {
        tracing::debug!(swept, "short-ban sweep");
    }

    match crate::db::bans::prune_expired(db.pool()).await {
        Ok(n) if n > 0 => tracing::debug!(pruned = n, "expired durable bans pruned"),
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "ban prune failed"),
    }

    match crate::db::bans::prune_unban_history(db.pool(), config.scheduler.unban_history_retention_days).await {
        Ok(n) if n > 0 => tracing::debug!(pruned = n, "unban history pruned"),
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "unban history prune failed"),
    }

    match crate::db::penalties::prune_expired(db.pool(), now).await {
        Ok(n) if n > 0 => tracing::debug!(pruned = n, "expired penalty rows pruned"),
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "penalty prune failed"),
    }

    match crate::db::kicks::rotate(db.pool(), config.scheduler.kick_history_rotate_days, now).await {
        Ok(n) if n > 0 => tracing::debug!(rotated = n, "kick history rotated"),
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "kick history rotation failed"),
    }
}

/// Re-reads `setup_list` and applies the mutable subset of config live
/// (currently: the hub topic). The listen address and other
/// process-level settings are excluded (spec §9) — those require a
/// restart.
fn spawn_reload_timer(config: Arc<Config>, db: Database, topic: SharedTopic) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.scheduler.reload_timer_secs));
        loop {
            interval.tick().await;
            match crate::db::setup::get(db.pool(), "hub_topic").await {
                Ok(Some(reloaded)) => {
                    let mut guard = topic.write();
                    if *guard != reloaded {
                        *guard = reloaded;
                        tracing::info!("hub topic reloaded from setup_list");
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(%err, "setup_list reload failed"),
            }
        }
    });
}

/// Submits a hublist announce job to the worker on a fixed cadence.
/// No-op entirely when `hublist.enabled` is false (spec's hublist
/// Non-goal: this hub never itself hosts a directory).
fn spawn_hublist_timer(config: Arc<Config>, _db: Database, worker: WorkerHandle) {
    if !config.hublist.enabled {
        return;
    }
    let Some(target) = config.hublist.target.clone() else {
        tracing::warn!("hublist.enabled is set but hublist.target is missing, announce disabled");
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.scheduler.hublist_timer_secs));
        loop {
            interval.tick().await;
            let body = format!("{} {}", config.server.name, config.hublist.public_address);
            worker.submit(Job::AnnounceHublist { target: target.clone(), body }).await;
        }
    });
}
