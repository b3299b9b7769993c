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
use crate::registry::model::{NewTenant, Tenant, TenantPatch, TenantRow};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

/// Durable access to the `tenants` table (§4.2). The registry's filesystem
/// sync and cache/watcher coupling live one layer up in
/// [`crate::registry::service::TenantRegistry`]; this trait is pure storage.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TenantsRepository: Send + Sync {
    async fn list(&self, status_filter: Option<String>) -> RepositoryResult<Vec<Tenant>>;
    async fn get(&self, slug: &str) -> RepositoryResult<Tenant>;
    async fn create(&self, new_tenant: NewTenant) -> RepositoryResult<Tenant>;
    async fn update(&self, slug: &str, patch: TenantPatch) -> RepositoryResult<Tenant>;
    async fn delete(&self, slug: &str) -> RepositoryResult<()>;
    async fn rename(&self, slug: &str, new_slug: &str) -> RepositoryResult<Tenant>;
    async fn increment_request_count(&self, slug: &str) -> RepositoryResult<()>;
}

pub struct PgTenantsRepository {
    pool: PgPool,
}

impl PgTenantsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_tenant(row: TenantRow) -> RepositoryResult<Tenant> {
    row.into_tenant()
        .map_err(RepositoryError::InvalidInput)
}

#[async_trait]
impl TenantsRepository for PgTenantsRepository {
    async fn list(&self, status_filter: Option<String>) -> RepositoryResult<Vec<Tenant>> {
        let rows: Vec<TenantRow> = match status_filter {
            Some(status) => {
                sqlx::query_as(
                    r#"SELECT slug, name, status, kind, entry_path, build_output_dir,
                              proxy_map, source, repo_url, branch, webhook_url, last_error,
                              request_count, created_at, updated_at, last_deployed_at
                       FROM tenants WHERE status = $1 ORDER BY slug"#,
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"SELECT slug, name, status, kind, entry_path, build_output_dir,
                              proxy_map, source, repo_url, branch, webhook_url, last_error,
                              request_count, created_at, updated_at, last_deployed_at
                       FROM tenants ORDER BY slug"#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(to_tenant).collect()
    }

    async fn get(&self, slug: &str) -> RepositoryResult<Tenant> {
        let row: TenantRow = sqlx::query_as(
            r#"SELECT slug, name, status, kind, entry_path, build_output_dir,
                      proxy_map, source, repo_url, branch, webhook_url, last_error,
                      request_count, created_at, updated_at, last_deployed_at
               FROM tenants WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        to_tenant(row)
    }

    async fn create(&self, new_tenant: NewTenant) -> RepositoryResult<Tenant> {
        let proxy_map = serde_json::to_value(&new_tenant.proxy_map)
            .map_err(|e| RepositoryError::InvalidInput(e.to_string()))?;
        let row: TenantRow = sqlx::query_as(
            r#"INSERT INTO tenants
                (slug, name, status, kind, entry_path, build_output_dir, proxy_map,
                 source, repo_url, branch)
               VALUES ($1, $2, 'active', $3, $4, $5, $6, $7, $8, $9)
               RETURNING slug, name, status, kind, entry_path, build_output_dir,
                         proxy_map, source, repo_url, branch, webhook_url, last_error,
                         request_count, created_at, updated_at, last_deployed_at"#,
        )
        .bind(&new_tenant.slug)
        .bind(&new_tenant.name)
        .bind(new_tenant.kind.to_string())
        .bind(&new_tenant.entry_path)
        .bind(&new_tenant.build_output_dir)
        .bind(proxy_map)
        .bind(new_tenant.source.to_string())
        .bind(&new_tenant.repo_url)
        .bind(&new_tenant.branch)
        .fetch_one(&self.pool)
        .await?;
        to_tenant(row)
    }

    async fn update(&self, slug: &str, patch: TenantPatch) -> RepositoryResult<Tenant> {
        let mut builder = sqlx::QueryBuilder::new("UPDATE tenants SET updated_at = now()");

        if let Some(name) = &patch.name {
            builder.push(", name = ").push_bind(name.clone());
        }
        if let Some(status) = &patch.status {
            builder.push(", status = ").push_bind(status.to_string());
        }
        if let Some(kind) = &patch.kind {
            builder.push(", kind = ").push_bind(kind.to_string());
        }
        if let Some(entry_path) = &patch.entry_path {
            builder.push(", entry_path = ").push_bind(entry_path.clone());
        }
        if let Some(build_output_dir) = &patch.build_output_dir {
            builder
                .push(", build_output_dir = ")
                .push_bind(build_output_dir.clone());
        }
        if let Some(proxy_map) = &patch.proxy_map {
            let value = serde_json::to_value(proxy_map)
                .map_err(|e| RepositoryError::InvalidInput(e.to_string()))?;
            builder.push(", proxy_map = ").push_bind(value);
        }
        if let Some(source) = &patch.source {
            builder.push(", source = ").push_bind(source.to_string());
        }
        if let Some(repo_url) = &patch.repo_url {
            builder.push(", repo_url = ").push_bind(repo_url.clone());
        }
        if let Some(branch) = &patch.branch {
            builder.push(", branch = ").push_bind(branch.clone());
        }
        if let Some(webhook_url) = &patch.webhook_url {
            builder.push(", webhook_url = ").push_bind(webhook_url.clone());
        }
        if let Some(last_error) = &patch.last_error {
            builder.push(", last_error = ").push_bind(last_error.clone());
        }
        if let Some(last_deployed_at) = &patch.last_deployed_at {
            builder
                .push(", last_deployed_at = ")
                .push_bind(*last_deployed_at);
        }

        builder.push(" WHERE slug = ").push_bind(slug.to_string());
        builder.push(
            r#" RETURNING slug, name, status, kind, entry_path, build_output_dir,
                          proxy_map, source, repo_url, branch, webhook_url, last_error,
                          request_count, created_at, updated_at, last_deployed_at"#,
        );

        let row: Option<TenantRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await?;
        to_tenant(row.ok_or(RepositoryError::NotFound)?)
    }

    async fn delete(&self, slug: &str) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tenants WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn rename(&self, slug: &str, new_slug: &str) -> RepositoryResult<Tenant> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"UPDATE tenants SET slug = $2, updated_at = now() WHERE slug = $1
               RETURNING slug, name, status, kind, entry_path, build_output_dir,
                         proxy_map, source, repo_url, branch, webhook_url, last_error,
                         request_count, created_at, updated_at, last_deployed_at"#,
        )
        .bind(slug)
        .bind(new_slug)
        .fetch_optional(&self.pool)
        .await?;
        to_tenant(row.ok_or(RepositoryError::NotFound)?)
    }

    async fn increment_request_count(&self, slug: &str) -> RepositoryResult<()> {
        sqlx::query("UPDATE tenants SET request_count = request_count + 1 WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
