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

use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, RepositoryError, codes};
use crate::config_store::env_store::{EnvStore, EnvStoreError};
use crate::config_store::model::{EnvPatchAction, NewSetting, SettingEntry};
use crate::config_store::settings_repository::SettingsRepository;
use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::registry::service::CacheEvictor;
use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error(transparent)]
    Env(#[from] EnvStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("setting '{0}' not found")]
    SettingNotFound(String),
}

pub type ConfigStoreResult<T> = Result<T, ConfigStoreError>;

impl From<ConfigStoreError> for FriendlyError<GeneralError> {
    fn from(e: ConfigStoreError) -> Self {
        let (status, code) = match &e {
            ConfigStoreError::Env(EnvStoreError::InvalidKey(_)) => {
                (StatusCode::BAD_REQUEST, codes::VALIDATION_ENV_KEY)
            }
            ConfigStoreError::Env(EnvStoreError::Filesystem(_)) => {
                return FriendlyError::internal(
                    file!(),
                    GeneralError {
                        message: e.to_string(),
                    },
                );
            }
            ConfigStoreError::SettingNotFound(_) => (StatusCode::NOT_FOUND, codes::STORE_NOT_FOUND),
            ConfigStoreError::Repository(repo_err) if repo_err.is_not_found() => {
                (StatusCode::NOT_FOUND, codes::STORE_NOT_FOUND)
            }
            ConfigStoreError::Repository(_) => {
                return FriendlyError::internal(
                    file!(),
                    GeneralError {
                        message: e.to_string(),
                    },
                );
            }
        };
        FriendlyError::user_facing(
            Level::DEBUG,
            status,
            code,
            file!(),
            GeneralError {
                message: e.to_string(),
            },
        )
    }
}

/// Owns both halves of C3: per-tenant `.env` I/O and platform `settings`
/// rows. Any env write evicts the tenant's cache slot (§4.3) so the next
/// request observes the new variables.
pub struct ConfigStore {
    env_store: EnvStore,
    settings: Arc<dyn SettingsRepository>,
    cache: Arc<dyn CacheEvictor>,
    events: Arc<dyn EventRecorder>,
}

impl ConfigStore {
    pub fn new(
        env_store: EnvStore,
        settings: Arc<dyn SettingsRepository>,
        cache: Arc<dyn CacheEvictor>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            env_store,
            settings,
            cache,
            events,
        }
    }

    pub async fn load_env(&self, slug: &str) -> ConfigStoreResult<BTreeMap<String, String>> {
        Ok(self.env_store.load(slug).await?)
    }

    /// `PATCH .../env` (§6): `Replace` overwrites the whole file, `Merge` unions with it.
    pub async fn patch_env(
        &self,
        slug: &str,
        env: BTreeMap<String, String>,
        action: EnvPatchAction,
    ) -> ConfigStoreResult<BTreeMap<String, String>> {
        let result = match action {
            EnvPatchAction::Replace => {
                self.env_store.save(slug, &env).await?;
                env
            }
            EnvPatchAction::Merge => self.env_store.merge(slug, &env).await?,
        };
        self.cache.evict(slug).await;
        self.record_env_update(slug).await;
        Ok(result)
    }

    /// `DELETE .../env` (§6): `Some(keys)` removes only those keys, `None` deletes the whole file.
    pub async fn delete_env(&self, slug: &str, keys: Option<Vec<String>>) -> ConfigStoreResult<BTreeMap<String, String>> {
        let remaining = match keys {
            Some(keys) => self.env_store.delete_keys(slug, &keys).await?,
            None => {
                self.env_store.delete_file(slug).await?;
                BTreeMap::new()
            }
        };
        self.cache.evict(slug).await;
        self.record_env_update(slug).await;
        Ok(remaining)
    }

    async fn record_env_update(&self, slug: &str) {
        self.events
            .record(
                Some(slug),
                EventKind::EnvUpdate,
                EventLevel::Info,
                "environment variables updated",
                serde_json::json!({}),
            )
            .await;
    }

    pub async fn get_setting(&self, key: &str, default: Option<serde_json::Value>) -> ConfigStoreResult<Option<SettingEntry>> {
        match self.settings.get(key).await? {
            Some(entry) => Ok(Some(entry)),
            None => Ok(default.map(|value| SettingEntry {
                key: key.to_string(),
                value,
                category: "default".to_string(),
                encrypted: false,
                description: None,
                updated_at: chrono::Utc::now(),
            })),
        }
    }

    pub async fn set_setting(
        &self,
        key: &str,
        value: serde_json::Value,
        category: &str,
        description: Option<String>,
        encrypted: bool,
    ) -> ConfigStoreResult<SettingEntry> {
        Ok(self
            .settings
            .set(key, value, category, description, encrypted)
            .await?)
    }

    pub async fn get_by_category(&self, category: &str) -> ConfigStoreResult<Vec<SettingEntry>> {
        Ok(self.settings.get_by_category(category).await?)
    }

    pub async fn list_settings(&self) -> ConfigStoreResult<Vec<SettingEntry>> {
        Ok(self.settings.list_all().await?)
    }

    /// `PUT /api/admin/settings` (§6): upserts each row independently.
    pub async fn set_settings(&self, entries: Vec<NewSetting>) -> ConfigStoreResult<Vec<SettingEntry>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(
                self.settings
                    .set(&entry.key, entry.value, &entry.category, entry.description, entry.encrypted)
                    .await?,
            );
        }
        Ok(out)
    }

    pub async fn delete_setting(&self, key: &str) -> ConfigStoreResult<()> {
        Ok(self.settings.delete(key).await?)
    }
}
