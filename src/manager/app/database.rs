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
use crate::manager::app::config::DatabaseConfig;
use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection-pool access for the main platform database and per-tenant
/// namespaces (§6, §9 "per-tenant database namespacing").
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PoolManager: Send + Sync {
    fn get_main_pool(&self) -> PgPool;
    fn get_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool>;
    async fn add_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool>;
    fn remove_tenant_pool(&self, namespace: &str);
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseMigrator: Send + Sync {
    async fn migrate_main_db(&self) -> RepositoryResult<()>;
    async fn migrate_tenant_db(&self, namespace: &str) -> RepositoryResult<()>;
}

/// Owns the main pool plus a concurrently-accessed map of lazily created
/// per-tenant pools, keyed by the `app_<slug>` namespace (§9).
pub struct PgPoolManager {
    main_pool: PgPool,
    database_config: DatabaseConfig,
    tenant_pools: DashMap<String, PgPool>,
}

impl PgPoolManager {
    pub async fn new(database_config: &DatabaseConfig) -> RepositoryResult<PgPoolManager> {
        let main_pool = PgPoolOptions::new()
            .max_connections(database_config.max_pool_size())
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_config.main_url())
            .await?;
        Ok(Self {
            main_pool,
            database_config: database_config.clone(),
            tenant_pools: DashMap::new(),
        })
    }
}

#[async_trait]
impl PoolManager for PgPoolManager {
    fn get_main_pool(&self) -> PgPool {
        self.main_pool.clone()
    }

    fn get_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool> {
        Ok(self
            .tenant_pools
            .get(namespace)
            .ok_or(RepositoryError::TenantPoolNotFound)?
            .clone())
    }

    async fn add_tenant_pool(&self, namespace: &str) -> RepositoryResult<PgPool> {
        if let Some(existing) = self.tenant_pools.get(namespace) {
            return Ok(existing.clone());
        }
        let pool = PgPoolOptions::new()
            .max_connections(self.database_config.max_pool_size())
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_config.url_for(namespace))
            .await?;
        self.tenant_pools.insert(namespace.to_string(), pool.clone());
        Ok(pool)
    }

    fn remove_tenant_pool(&self, namespace: &str) {
        self.tenant_pools.remove(namespace);
    }
}

#[async_trait]
impl DatabaseMigrator for PgPoolManager {
    async fn migrate_main_db(&self) -> RepositoryResult<()> {
        Ok(sqlx::migrate!("./migrations/main").run(&self.main_pool).await?)
    }

    async fn migrate_tenant_db(&self, namespace: &str) -> RepositoryResult<()> {
        let pool = self.get_tenant_pool(namespace)?;
        Ok(sqlx::migrate!("./migrations/tenant").run(&pool).await?)
    }
}

/// Creates the target database for a new tenant namespace on the shared
/// Postgres instance, then opens (and registers) its pool.
pub async fn provision_tenant_database(
    pool_manager: &PgPoolManager,
    admin_pool: &PgPool,
    namespace: &str,
) -> RepositoryResult<()> {
    sqlx::query(&format!(r#"CREATE DATABASE "{namespace}""#))
        .execute(admin_pool)
        .await?;
    pool_manager.add_tenant_pool(namespace).await?;
    pool_manager.migrate_tenant_db(namespace).await
}
