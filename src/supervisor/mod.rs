/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::manager::app::config::PlatformConfig;
use crate::runtime::cache::TenantCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;

/// The periodic background work of C11: idle-cache sweep and stale-temp-dir
/// cleanup, each its own `tokio::time::interval` ticker per §9's design
/// note. Holds the handles only so [`shutdown`](Self::shutdown) can cancel
/// them in lockstep with the rest of graceful shutdown.
pub struct LifecycleSupervisor {
    idle_sweep: JoinHandle<()>,
    temp_cleanup: JoinHandle<()>,
}

impl LifecycleSupervisor {
    /// Spawns both timers against the configured intervals/thresholds
    /// (defaults: 15 min idle threshold / 10 min sweep, 24h max age / 6h
    /// cleanup — §4.6, §4.11).
    pub fn spawn(cache: Arc<TenantCache>, uploads_root: PathBuf, platform: &PlatformConfig) -> Self {
        let idle_sweep = tokio::spawn(idle_sweep_loop(
            cache,
            platform.idle_sweep_interval(),
            platform.idle_evict_threshold(),
        ));
        let temp_cleanup = tokio::spawn(temp_cleanup_loop(
            uploads_root,
            platform.temp_cleanup_interval(),
            platform.temp_max_age(),
        ));
        Self {
            idle_sweep,
            temp_cleanup,
        }
    }

    /// Cancels both timers. Called once the front door has stopped
    /// accepting new connections and drained in-flight requests, so no
    /// sweep can race a response already on its way out.
    pub fn shutdown(self) {
        self.idle_sweep.abort();
        self.temp_cleanup.abort();
        tracing::info!("lifecycle supervisor timers stopped");
    }
}

async fn idle_sweep_loop(cache: Arc<TenantCache>, interval: Duration, threshold: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let evicted = cache.evict_idle(threshold).await;
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), slugs = ?evicted, "idle sweep evicted tenants");
        }
    }
}

async fn temp_cleanup_loop(uploads_root: PathBuf, interval: Duration, max_age: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = clean_stale_temp_dirs(&uploads_root, max_age).await {
            tracing::warn!(error = %e, "temp cleanup sweep failed");
        }
    }
}

/// Removes every entry of `root` whose mtime is older than `max_age`. Best
/// effort: a single unreadable entry is logged and skipped rather than
/// aborting the whole sweep.
async fn clean_stale_temp_dirs(root: &Path, max_age: Duration) -> std::io::Result<()> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let cutoff = std::time::SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

    while let Some(entry) = entries.next_entry().await? {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let modified = metadata.modified().unwrap_or(std::time::SystemTime::now());
        if modified >= cutoff {
            continue;
        }
        let path = entry.path();
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove stale temp entry");
        }
    }
    Ok(())
}

/// Resolves once Ctrl+C or, on Unix, `SIGTERM` arrives — mirrors the
/// teacher's `shutdown_signal` / `axum::serve(...).with_graceful_shutdown(...)`
/// pairing exactly (§9).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
