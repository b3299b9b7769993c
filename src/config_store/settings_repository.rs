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
use crate::config_store::model::SettingEntry;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

/// Durable access to the `settings` table (§4.3).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> RepositoryResult<Option<SettingEntry>>;
    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        description: Option<String>,
        encrypted: bool,
    ) -> RepositoryResult<SettingEntry>;
    async fn get_by_category(&self, category: &str) -> RepositoryResult<Vec<SettingEntry>>;
    async fn list_all(&self) -> RepositoryResult<Vec<SettingEntry>>;
    async fn delete(&self, key: &str) -> RepositoryResult<()>;
}

pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(&self, key: &str) -> RepositoryResult<Option<SettingEntry>> {
        let row: Option<SettingEntry> = sqlx::query_as(
            "SELECT key, value, category, encrypted, description, updated_at
             FROM settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        description: Option<String>,
        encrypted: bool,
    ) -> RepositoryResult<SettingEntry> {
        let row: SettingEntry = sqlx::query_as(
            r#"INSERT INTO settings (key, value, category, encrypted, description, updated_at)
               VALUES ($1, $2, $3, $4, $5, now())
               ON CONFLICT (key) DO UPDATE
                 SET value = $2, category = $3, encrypted = $4, description = $5, updated_at = now()
               RETURNING key, value, category, encrypted, description, updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(category)
        .bind(encrypted)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_category(&self, category: &str) -> RepositoryResult<Vec<SettingEntry>> {
        let rows: Vec<SettingEntry> = sqlx::query_as(
            "SELECT key, value, category, encrypted, description, updated_at
             FROM settings WHERE category = $1 ORDER BY key",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> RepositoryResult<Vec<SettingEntry>> {
        let rows: Vec<SettingEntry> = sqlx::query_as(
            "SELECT key, value, category, encrypted, description, updated_at
             FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, key: &str) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
