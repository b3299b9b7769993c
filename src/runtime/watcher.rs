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

use crate::registry::service::{CacheEvictor, WatcherControl};
use dashmap::DashMap;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex as SyncMutex;
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(300);
const IGNORED_COMPONENTS: &[&str] = &["node_modules", ".git"];

/// Watches every currently loaded tenant's directory and evicts it from the
/// cache on any change (§4.7). Registration/unregistration is driven
/// exclusively by the Tenant Cache's load/evict lifecycle; this component
/// never loads or evicts on its own initiative beyond forwarding events.
pub struct FileWatcher {
    debouncer: SyncMutex<Debouncer<notify::RecommendedWatcher>>,
    watched: DashMap<String, PathBuf>,
}

impl FileWatcher {
    /// Spawns the background task that drains debounced filesystem events
    /// and calls `cache.evict(slug)`. The watcher never holds a per-slug
    /// lock itself — eviction ordering is entirely the cache's concern.
    pub fn new(cache: Arc<dyn CacheEvictor>) -> notify::Result<Arc<Self>> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();

        let debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            let _ = tx.send(result);
        })?;

        let watcher = Arc::new(Self {
            debouncer: SyncMutex::new(debouncer),
            watched: DashMap::new(),
        });

        let watcher_for_task = watcher.clone();
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                let events = match result {
                    Ok(events) => events,
                    Err(errors) => {
                        for e in errors {
                            tracing::warn!(error = %e, "filesystem watch error");
                        }
                        continue;
                    }
                };
                let mut slugs = Vec::new();
                for event in events {
                    if is_ignored(&event.path) {
                        continue;
                    }
                    if let Some(slug) = watcher_for_task.owning_slug(&event.path) {
                        if !slugs.contains(&slug) {
                            slugs.push(slug);
                        }
                    }
                }
                for slug in slugs {
                    cache.evict(&slug).await;
                }
            }
        });

        Ok(watcher)
    }

    fn owning_slug(&self, path: &Path) -> Option<String> {
        self.watched
            .iter()
            .find(|entry| path.starts_with(entry.value()))
            .map(|entry| entry.key().clone())
    }
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|component| {
        IGNORED_COMPONENTS
            .iter()
            .any(|ignored| component.as_os_str() == *ignored)
    })
}

impl WatcherControl for FileWatcher {
    fn register(&self, slug: &str, dir: &Path) {
        let mut debouncer = match self.debouncer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = debouncer.watcher().watch(dir, RecursiveMode::Recursive) {
            tracing::warn!(slug, dir = %dir.display(), error = %e, "failed to watch tenant directory");
            return;
        }
        self.watched.insert(slug.to_string(), dir.to_path_buf());
    }

    fn unregister(&self, slug: &str) {
        if let Some((_, dir)) = self.watched.remove(slug) {
            let mut debouncer = match self.debouncer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let _ = debouncer.watcher().unwatch(&dir);
        }
    }
}
