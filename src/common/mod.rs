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

use std::sync::Arc;

use crate::{
    common::error::RepositoryResult,
    manager::app::{
        config::AppConfig,
        database::{DatabaseMigrator, PgPoolManager, PoolManager},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;

pub(crate) mod dto;
pub(crate) mod error;
pub(crate) mod extractors;
pub(crate) mod macros;
pub(crate) mod types;

/// Every module reaches configuration through this trait instead of an ambient
/// static, so tests can substitute a fixture config without touching the real
/// `AppState`.
pub trait ConfigProvider: Send + Sync {
    fn config(&self) -> Arc<AppConfig>;
}

/// Outbound HTTP client shared by the webhook dispatcher and the frontend proxy.
pub trait HttpClientProvider: Send + Sync {
    fn http_client(&self) -> Arc<reqwest::Client>;
}

pub struct AppState<P>
where
    P: Send + Sync,
{
    pub config: Arc<AppConfig>,
    pub pool_manager: Arc<P>,
    pub http_client: Arc<reqwest::Client>,
}

pub type DefaultAppState = AppState<PgPoolManager>;

impl DefaultAppState {
    fn init_config() -> anyhow::Result<AppConfig> {
        Ok(AppConfig::from_env()?)
    }

    async fn init_pool_manager(config: Arc<AppConfig>) -> anyhow::Result<PgPoolManager> {
        Ok(PgPoolManager::new(config.database()).await?)
    }

    pub async fn new() -> anyhow::Result<DefaultAppState> {
        let config = Arc::new(Self::init_config()?);
        let pool_manager = Arc::new(Self::init_pool_manager(config.clone()).await?);
        Ok(Self {
            config,
            pool_manager,
            http_client: Arc::new(
                reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(5))
                    .build()?,
            ),
        })
    }
}

impl<P> ConfigProvider for AppState<P>
where
    P: Send + Sync,
{
    fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}

impl<P> HttpClientProvider for AppState<P>
where
    P: Send + Sync,
{
    fn http_client(&self) -> Arc<reqwest::Client> {
        self.http_client.clone()
    }
}

#[async_trait]
impl DatabaseMigrator for AppState<PgPoolManager> {
    async fn migrate_main_db(&self) -> RepositoryResult<()> {
        self.pool_manager.migrate_main_db().await
    }
    async fn migrate_tenant_db(&self, namespace: &str) -> RepositoryResult<()> {
        self.pool_manager.migrate_tenant_db(namespace).await
    }
}

#[async_trait]
impl PoolManager for AppState<PgPoolManager> {
    fn get_main_pool(&self) -> PgPool {
        self.pool_manager.get_main_pool()
    }
    fn get_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool> {
        self.pool_manager.get_tenant_pool(namespace)
    }
    async fn add_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool> {
        self.pool_manager.add_tenant_pool(namespace).await
    }
    fn remove_tenant_pool(&self, namespace: &str) {
        self.pool_manager.remove_tenant_pool(namespace)
    }
}
