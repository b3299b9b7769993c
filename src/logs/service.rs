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

use crate::common::error::RepositoryResult;
use crate::logs::model::{EventKind, EventLevel, EventLogEntry, NewEventLog};
use crate::logs::repository::EventLogsRepository;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Every component that raises a lifecycle event depends on this trait
/// instead of `EventLogService` directly, the same inversion
/// `registry::service::CacheEvictor` uses to keep the dependency graph
/// acyclic (the deploy pipeline, registry, config store, backup engine and
/// cache all sit "below" the logging concern, not above it).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(
        &self,
        slug: Option<&str>,
        event: EventKind,
        level: EventLevel,
        message: &str,
        metadata: serde_json::Value,
    );
}

/// Owns the `event_logs` table and the per-tenant append-only text mirror at
/// `<LOGS_ROOT>/<slug>.log` (§3 persisted state layout, §6 `GET .../logs`).
pub struct EventLogService {
    repository: Arc<dyn EventLogsRepository>,
    logs_root: PathBuf,
}

impl EventLogService {
    pub fn new(repository: Arc<dyn EventLogsRepository>, logs_root: PathBuf) -> Self {
        Self {
            repository,
            logs_root,
        }
    }

    fn log_path(&self, slug: &str) -> PathBuf {
        self.logs_root.join(format!("{slug}.log"))
    }

    /// `format=json` branch of `GET /api/admin/apps/:slug/logs` (§6).
    pub async fn list(&self, slug: &str, limit: i64) -> RepositoryResult<Vec<EventLogEntry>> {
        self.repository.list_for_slug(slug, limit).await
    }

    /// `format=text` branch: the last `limit` lines of the tenant's
    /// append-only log file, oldest first. Returns an empty string if the
    /// tenant has never logged anything yet.
    pub async fn tail_text(&self, slug: &str, limit: usize) -> std::io::Result<String> {
        let path = self.log_path(slug);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(limit);
        Ok(lines[start..].join("\n"))
    }

    async fn append_file(&self, slug: &str, line: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.logs_root).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(slug))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait]
impl EventRecorder for EventLogService {
    /// Records one lifecycle moment: a DB row always, plus an append-only
    /// text line when the event is tenant-scoped. Best-effort per §7's
    /// propagation policy for background/ambient work — failures here are
    /// logged and swallowed, never surfaced to the caller whose action
    /// triggered the event.
    async fn record(
        &self,
        slug: Option<&str>,
        event: EventKind,
        level: EventLevel,
        message: &str,
        metadata: serde_json::Value,
    ) {
        let entry = NewEventLog {
            slug: slug.map(str::to_string),
            event,
            level,
            message: message.to_string(),
            metadata,
        };
        if let Err(e) = self.repository.insert(entry).await {
            tracing::warn!(error = %e, "failed to persist event log row");
        }

        if let Some(slug) = slug {
            let timestamp = chrono::Utc::now().to_rfc3339();
            let line = format!("[{timestamp}] {level} {event} {slug}: {message}");
            if let Err(e) = self.append_file(slug, &line).await {
                tracing::warn!(slug, error = %e, "failed to append tenant log file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::repository::MockEventLogsRepository;

    #[tokio::test]
    async fn record_appends_a_text_line_for_a_tenant_scoped_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockEventLogsRepository::new();
        mock.expect_insert().returning(|_| Ok(()));
        let service = EventLogService::new(Arc::new(mock), dir.path().to_path_buf());

        service
            .record(
                Some("shop"),
                EventKind::Deploy,
                EventLevel::Info,
                "deployed from archive",
                serde_json::json!({}),
            )
            .await;

        let tail = service.tail_text("shop", 10).await.unwrap();
        assert!(tail.contains("deploy shop: deployed from archive"));
    }

    #[tokio::test]
    async fn platform_scoped_events_do_not_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockEventLogsRepository::new();
        mock.expect_insert().returning(|_| Ok(()));
        let service = EventLogService::new(Arc::new(mock), dir.path().to_path_buf());

        service
            .record(None, EventKind::Error, EventLevel::Error, "sync failed", serde_json::json!({}))
            .await;

        assert!(!dir.path().join("None.log").exists());
    }

    #[tokio::test]
    async fn tail_text_is_empty_for_an_unknown_slug() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockEventLogsRepository::new();
        let service = EventLogService::new(Arc::new(mock), dir.path().to_path_buf());
        assert_eq!(service.tail_text("nope", 10).await.unwrap(), "");
    }
}
