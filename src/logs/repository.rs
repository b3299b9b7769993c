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

use crate::common::error::{RepositoryError, RepositoryResult};
use crate::logs::model::{EventLogEntry, EventLogRow, NewEventLog};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

/// Durable access to the append-only `event_logs` table (§3, §6 `/logs`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventLogsRepository: Send + Sync {
    async fn insert(&self, entry: NewEventLog) -> RepositoryResult<()>;
    async fn list_for_slug(&self, slug: &str, limit: i64) -> RepositoryResult<Vec<EventLogEntry>>;
}

pub struct PgEventLogsRepository {
    pool: PgPool,
}

impl PgEventLogsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_entry(row: EventLogRow) -> RepositoryResult<EventLogEntry> {
    row.into_entry().map_err(RepositoryError::InvalidInput)
}

#[async_trait]
impl EventLogsRepository for PgEventLogsRepository {
    async fn insert(&self, entry: NewEventLog) -> RepositoryResult<()> {
        sqlx::query(
            r#"INSERT INTO event_logs (slug, event, level, message, metadata)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&entry.slug)
        .bind(entry.event.to_string())
        .bind(entry.level.to_string())
        .bind(&entry.message)
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_slug(&self, slug: &str, limit: i64) -> RepositoryResult<Vec<EventLogEntry>> {
        let rows: Vec<EventLogRow> = sqlx::query_as(
            r#"SELECT slug, event, level, message, metadata, timestamp
               FROM event_logs WHERE slug = $1 ORDER BY timestamp DESC LIMIT $2"#,
        )
        .bind(slug)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_entry).collect()
    }
}
