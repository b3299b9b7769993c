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
use crate::common::types::slug::TenantSlug;
use crate::common::types::value_object::ValueObjectable;
use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::registry::model::{NewTenant, Tenant, TenantKind, TenantPatch, TenantStatus};
use crate::registry::repository::TenantsRepository;
use crate::validator;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;

/// Reverse dependency from the runtime layer: the registry must be able to
/// evict a loaded tenant without depending on `runtime::cache` directly.
#[async_trait]
pub trait CacheEvictor: Send + Sync {
    async fn evict(&self, slug: &str);
}

/// Same inversion for the file watcher (§4.2 delete/rename ordering, §4.6 load).
pub trait WatcherControl: Send + Sync {
    fn register(&self, slug: &str, dir: &std::path::Path);
    fn unregister(&self, slug: &str);
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    #[error("slug '{0}' already exists")]
    SlugConflict(String),

    #[error("tenant directory missing: {0}")]
    DirectoryMissing(String),

    #[error("entry file missing: {0}")]
    EntryMissing(String),

    #[error("entry file rejected: {0}")]
    ValidationFailed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("tenant not found")]
    NotFound,
}

impl From<RegistryError> for FriendlyError<GeneralError> {
    fn from(e: RegistryError) -> Self {
        let (status, code) = match &e {
            RegistryError::InvalidSlug(_) => (StatusCode::BAD_REQUEST, codes::VALIDATION_SLUG),
            RegistryError::SlugConflict(_) => (StatusCode::CONFLICT, codes::APP_SLUG_CONFLICT),
            RegistryError::NotFound => (StatusCode::NOT_FOUND, codes::APP_NOT_FOUND),
            RegistryError::DirectoryMissing(_) | RegistryError::EntryMissing(_) => {
                (StatusCode::BAD_REQUEST, codes::FS_ERROR)
            }
            RegistryError::ValidationFailed(_) => {
                (StatusCode::BAD_REQUEST, codes::APP_FORBIDDEN_CODE)
            }
            RegistryError::Filesystem(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::FS_ERROR),
            RegistryError::Repository(repo_err) if repo_err.is_not_found() => {
                (StatusCode::NOT_FOUND, codes::APP_NOT_FOUND)
            }
            RegistryError::Repository(repo_err) if repo_err.is_unique_violation() => {
                (StatusCode::CONFLICT, codes::APP_SLUG_CONFLICT)
            }
            RegistryError::Repository(_) => {
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

pub type RegistryResult<T> = Result<T, RegistryError>;

const ENTRY_FILE_CANDIDATES: &[&str] = &["server.js", "app.js", "index.js", "main.js"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub renamed: Vec<(String, String)>,
    pub skipped: Vec<(String, String)>,
}

/// Authoritative Tenant store plus the filesystem coupler described in §4.2:
/// every mutating operation keeps `<APPS_ROOT>/<slug>/` and the durable row
/// in lockstep, and orders cache eviction / watcher teardown ahead of any
/// directory mutation so a loaded tenant never outlives its own deletion.
pub struct TenantRegistry {
    repository: Arc<dyn TenantsRepository>,
    apps_root: PathBuf,
    cache: Arc<dyn CacheEvictor>,
    watcher: Arc<dyn WatcherControl>,
    events: Arc<dyn EventRecorder>,
}

impl TenantRegistry {
    pub fn new(
        repository: Arc<dyn TenantsRepository>,
        apps_root: PathBuf,
        cache: Arc<dyn CacheEvictor>,
        watcher: Arc<dyn WatcherControl>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            repository,
            apps_root,
            events,
            cache,
            watcher,
        }
    }

    fn tenant_dir(&self, slug: &str) -> PathBuf {
        self.apps_root.join(slug)
    }

    fn validate_slug(slug: &str) -> RegistryResult<()> {
        TenantSlug(slug.to_string())
            .validate()
            .map_err(RegistryError::InvalidSlug)
    }

    pub async fn list(&self, status_filter: Option<String>) -> RegistryResult<Vec<Tenant>> {
        Ok(self.repository.list(status_filter).await?)
    }

    pub async fn get(&self, slug: &str) -> RegistryResult<Tenant> {
        self.repository
            .get(slug)
            .await
            .map_err(|e| if e.is_not_found() { RegistryError::NotFound } else { e.into() })
    }

    /// Registers a tenant whose tree already exists under `<APPS_ROOT>`
    /// (manual registration, or the tail end of the deploy pipeline).
    pub async fn create(&self, new_tenant: NewTenant) -> RegistryResult<Tenant> {
        Self::validate_slug(&new_tenant.slug)?;

        let dir = self.tenant_dir(&new_tenant.slug);
        if !dir.is_dir() {
            return Err(RegistryError::DirectoryMissing(
                dir.display().to_string(),
            ));
        }
        if new_tenant.kind != TenantKind::Frontend {
            let entry = dir.join(&new_tenant.entry_path);
            if !entry.is_file() {
                return Err(RegistryError::EntryMissing(entry.display().to_string()));
            }
        }

        match self.repository.create(new_tenant).await {
            Ok(tenant) => Ok(tenant),
            Err(e) if e.is_unique_violation() => Err(RegistryError::SlugConflict(
                "slug already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(&self, slug: &str, patch: TenantPatch) -> RegistryResult<Tenant> {
        self.repository
            .update(slug, patch)
            .await
            .map_err(|e| if e.is_not_found() { RegistryError::NotFound } else { e.into() })
    }

    /// Evicts, unregisters the watcher, removes the directory, then deletes
    /// the row — in that order (§4.2). Any filesystem failure leaves the row
    /// intact with `status=error` rather than an orphaned record.
    pub async fn delete(&self, slug: &str) -> RegistryResult<()> {
        let _ = self.repository.get(slug).await?;

        self.cache.evict(slug).await;
        self.watcher.unregister(slug);

        let dir = self.tenant_dir(slug);
        if dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                let _ = self
                    .repository
                    .update(
                        slug,
                        TenantPatch {
                            status: Some(TenantStatus::Error),
                            last_error: Some(Some(format!("delete failed: {e}"))),
                            ..Default::default()
                        },
                    )
                    .await;
                return Err(RegistryError::Filesystem(e.to_string()));
            }
        }

        self.repository.delete(slug).await?;
        self.events
            .record(
                Some(slug),
                EventKind::Delete,
                EventLevel::Info,
                "tenant deleted",
                serde_json::json!({}),
            )
            .await;
        Ok(())
    }

    /// Atomic rename (§4.2): evict, move the directory, then update the row.
    /// If the directory move fails the row is left completely untouched.
    pub async fn rename(&self, slug: &str, new_slug: &str) -> RegistryResult<Tenant> {
        Self::validate_slug(new_slug)?;
        if self.repository.get(new_slug).await.is_ok() {
            return Err(RegistryError::SlugConflict(new_slug.to_string()));
        }

        self.cache.evict(slug).await;
        self.watcher.unregister(slug);

        let from = self.tenant_dir(slug);
        let to = self.tenant_dir(new_slug);
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| RegistryError::Filesystem(e.to_string()))?;

        match self.repository.rename(slug, new_slug).await {
            Ok(tenant) => {
                self.events
                    .record(
                        Some(new_slug),
                        EventKind::Rename,
                        EventLevel::Info,
                        &format!("renamed from '{slug}'"),
                        serde_json::json!({ "from": slug, "to": new_slug }),
                    )
                    .await;
                Ok(tenant)
            }
            Err(e) => {
                // Best-effort rollback of the directory move so the two stay
                // consistent even though the row update failed.
                let _ = tokio::fs::rename(&to, &from).await;
                Err(e.into())
            }
        }
    }

    /// Reconciles `<APPS_ROOT>` against the store (§4.2). Idempotent: a
    /// second call with no intervening change reports zero-valued deltas.
    pub async fn sync(&self, auto_rename: bool) -> RegistryResult<SyncReport> {
        let mut report = SyncReport::default();

        let known: Vec<Tenant> = self.repository.list(None).await?;

        // Pass 1: rows whose directory vanished are dropped.
        for tenant in &known {
            if !self.tenant_dir(&tenant.slug).is_dir() {
                self.repository.delete(&tenant.slug).await?;
                report.removed.push(tenant.slug.clone());
            }
        }

        let known_slugs: std::collections::HashSet<String> = self
            .repository
            .list(None)
            .await?
            .into_iter()
            .map(|t| t.slug)
            .collect();

        // Pass 2: directories with a recognized entry file and no row.
        let mut entries = match tokio::fs::read_dir(&self.apps_root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(report),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::Filesystem(e.to_string()))?
        {
            if !entry.path().is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().to_string();

            let entry_file = ENTRY_FILE_CANDIDATES
                .iter()
                .find(|candidate| entry.path().join(candidate).is_file());
            let Some(entry_file) = entry_file else {
                continue;
            };

            let mut slug = dir_name.clone();
            if known_slugs.contains(&slug) {
                continue;
            }

            if TenantSlug(slug.clone()).validate().is_err() {
                if !auto_rename {
                    report
                        .skipped
                        .push((dir_name.clone(), "slug invalid and autoRename=false".to_string()));
                    continue;
                }
                let sanitized = sanitize_slug(&slug);
                if TenantSlug(sanitized.clone()).validate().is_err()
                    || known_slugs.contains(&sanitized)
                    || self.tenant_dir(&sanitized).exists()
                {
                    report
                        .skipped
                        .push((dir_name.clone(), "sanitized slug collides".to_string()));
                    continue;
                }
                let from = self.tenant_dir(&slug);
                let to = self.tenant_dir(&sanitized);
                if let Err(e) = tokio::fs::rename(&from, &to).await {
                    report
                        .skipped
                        .push((dir_name.clone(), format!("rename failed: {e}")));
                    continue;
                }
                report.renamed.push((slug.clone(), sanitized.clone()));
                slug = sanitized;
            }

            let source_text = match tokio::fs::read_to_string(self.tenant_dir(&slug).join(entry_file)).await {
                Ok(text) => text,
                Err(e) => {
                    report.skipped.push((slug, format!("unreadable entry file: {e}")));
                    continue;
                }
            };
            let validation = validator::validate_entry_source(&source_text);
            if !validation.valid {
                report.skipped.push((
                    slug,
                    validation.reason.unwrap_or_else(|| "rejected by validator".to_string()),
                ));
                continue;
            }

            let new_tenant = NewTenant {
                slug: slug.clone(),
                name: slug.clone(),
                kind: TenantKind::Backend,
                entry_path: entry_file.to_string(),
                build_output_dir: None,
                proxy_map: Vec::new(),
                source: crate::registry::model::TenantSource::Unknown,
                repo_url: None,
                branch: None,
            };
            match self.repository.create(new_tenant).await {
                Ok(_) => report.added.push(slug),
                Err(e) => report.skipped.push((slug, e.to_string())),
            }
        }

        Ok(report)
    }
}

/// lowercase, spaces -> `-`, strip anything else, collapse `-` runs, trim `-` (§4.2).
fn sanitize_slug(raw: &str) -> String {
    let lowered = raw.to_lowercase().replace(' ', "-");
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    let mut collapsed = String::with_capacity(stripped.len());
    let mut prev_dash = false;
    for c in stripped.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push(c);
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_replaces_spaces() {
        assert_eq!(sanitize_slug("My Shop"), "my-shop");
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_slug("My_Shop!!"), "myshop");
    }

    #[test]
    fn sanitize_collapses_dash_runs_and_trims() {
        assert_eq!(sanitize_slug("--foo---bar--"), "foo-bar");
    }
}
