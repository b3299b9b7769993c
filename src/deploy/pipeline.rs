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
use crate::common::error::{FriendlyError, codes};
use crate::deploy::archive::{self, ArchiveError};
use crate::deploy::git::{self, GitError};
use crate::deploy::kind_detect;
use crate::deploy::policy;
use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::manager::app::config::AppConfig;
use crate::registry::model::{NewTenant, ProxyRule, Tenant, TenantKind, TenantPatch, TenantSource, TenantStatus};
use crate::registry::service::{CacheEvictor, RegistryError, TenantRegistry};
use crate::validator;
use axum::http::StatusCode;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::Level;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("entry file rejected: {0}")]
    ValidationFailed(String),
    #[error("dependency policy violation: {0}")]
    PolicyViolation(String),
    #[error("build step failed: {0}")]
    BuildFailed(String),
    #[error("dependency install failed: {0}")]
    InstallFailed(String),
    #[error("build step timed out")]
    BuildTimeout,
    #[error("dependency install timed out")]
    InstallTimeout,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git update is only defined for git-import tenants")]
    NotGitImport,
}

pub type DeployResult<T> = Result<T, DeployError>;

impl From<DeployError> for FriendlyError<GeneralError> {
    fn from(e: DeployError) -> Self {
        let message = e.to_string();
        let (status, code) = match e {
            DeployError::InvalidSlug(_) => (StatusCode::BAD_REQUEST, codes::VALIDATION_SLUG),
            DeployError::Archive(ArchiveError::TooLarge(_)) => {
                (StatusCode::PAYLOAD_TOO_LARGE, codes::VALIDATION_SIZE)
            }
            DeployError::Archive(_) => (StatusCode::BAD_REQUEST, codes::APP_DEPLOY_FAILED),
            DeployError::Git(GitError::InvalidUrl(_)) => {
                (StatusCode::BAD_REQUEST, codes::VCS_INVALID_URL)
            }
            DeployError::Git(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::VCS_CLONE_FAILED),
            DeployError::ValidationFailed(_) | DeployError::PolicyViolation(_) => {
                (StatusCode::BAD_REQUEST, codes::APP_FORBIDDEN_CODE)
            }
            DeployError::BuildFailed(_) | DeployError::InstallFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::APP_DEPLOY_FAILED)
            }
            DeployError::BuildTimeout | DeployError::InstallTimeout => {
                (StatusCode::REQUEST_TIMEOUT, codes::SERVER_TIMEOUT)
            }
            DeployError::NotGitImport => {
                (StatusCode::BAD_REQUEST, codes::APP_UNSUPPORTED_OPERATION)
            }
            DeployError::Registry(registry_err) => return registry_err.into(),
            DeployError::Io(_) => {
                return FriendlyError::internal(file!(), GeneralError { message });
            }
        };
        FriendlyError::user_facing(Level::WARN, status, code, file!(), GeneralError { message })
    }
}

/// Caller-supplied hints for an ingest; any `None` falls back to auto-detection.
#[derive(Debug, Clone, Default)]
pub struct IngestOverrides {
    pub entry_path: Option<String>,
    pub kind: Option<TenantKind>,
    pub build_output_dir: Option<String>,
    pub proxy_map: Vec<ProxyRule>,
}

/// Orchestrates archive/git ingest and git-update (§4.5): extract or clone
/// into a scratch directory, auto-detect, validate, build, install, then
/// atomically move into `<APPS_ROOT>/<slug>/` and upsert the Tenant row.
pub struct DeployPipeline {
    registry: Arc<TenantRegistry>,
    cache: Arc<dyn CacheEvictor>,
    config: Arc<AppConfig>,
    events: Arc<dyn EventRecorder>,
}

impl DeployPipeline {
    pub fn new(
        registry: Arc<TenantRegistry>,
        cache: Arc<dyn CacheEvictor>,
        config: Arc<AppConfig>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            registry,
            cache,
            config,
            events,
        }
    }

    fn stage_dir(&self, slug: &str) -> PathBuf {
        self.config
            .platform()
            .uploads_root()
            .join(format!("{slug}-{}", staging_suffix()))
    }

    fn apps_dir(&self, slug: &str) -> PathBuf {
        self.config.platform().apps_root().join(slug)
    }

    async fn finalize(
        &self,
        staging: &Path,
        slug: &str,
        source: TenantSource,
        overrides: IngestOverrides,
        repo_url: Option<String>,
        branch: Option<String>,
    ) -> DeployResult<Tenant> {
        let detected_kind = overrides.kind.unwrap_or_else(|| kind_detect::detect_kind(staging));

        let violations = policy::check_dependencies(staging);
        if policy::has_blocking_violation(&violations) {
            let _ = tokio::fs::remove_dir_all(staging).await;
            let names: Vec<String> = violations.iter().map(|v| v.reason.clone()).collect();
            return Err(DeployError::PolicyViolation(names.join("; ")));
        }

        let entry_path = if detected_kind != TenantKind::Frontend {
            let entry = overrides
                .entry_path
                .or_else(|| kind_detect::detect_entry_path(staging))
                .unwrap_or_default();
            if entry.is_empty() {
                let _ = tokio::fs::remove_dir_all(staging).await;
                return Err(DeployError::ValidationFailed(
                    "no recognized backend entry file found".to_string(),
                ));
            }
            let source_text = tokio::fs::read_to_string(staging.join(&entry)).await?;
            let validation = validator::validate_entry_source(&source_text);
            if !validation.valid {
                let _ = tokio::fs::remove_dir_all(staging).await;
                return Err(DeployError::ValidationFailed(
                    validation.reason.unwrap_or_default(),
                ));
            }
            entry
        } else {
            String::new()
        };

        if detected_kind.needs_dependency_install() {
            if let Err(e) = self.run_npm(staging, &["install", "--omit=dev"], self.config.build().install_timeout()).await {
                let _ = tokio::fs::remove_dir_all(staging).await;
                return Err(e);
            }
        }
        if detected_kind.needs_build_output() && staging.join("package.json").is_file() && has_build_script(staging) {
            if let Err(e) = self.run_npm(staging, &["run", "build"], self.config.build().build_timeout()).await {
                let _ = tokio::fs::remove_dir_all(staging).await;
                return Err(e);
            }
        }

        let build_output_dir = overrides
            .build_output_dir
            .or_else(|| kind_detect::detect_build_output_dir(staging));

        let target = self.apps_dir(slug);
        if target.exists() {
            tokio::fs::remove_dir_all(&target).await?;
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(staging, &target).await?;

        let new_tenant = NewTenant {
            slug: slug.to_string(),
            name: slug.to_string(),
            kind: detected_kind,
            entry_path,
            build_output_dir,
            proxy_map: overrides.proxy_map,
            source,
            repo_url,
            branch,
        };

        let ingest_event = match source {
            TenantSource::ArchiveUpload => EventKind::ArchiveUpload,
            TenantSource::GitImport => EventKind::GitImport,
            TenantSource::Manual | TenantSource::Unknown => EventKind::Deploy,
        };

        match self.registry.get(slug).await {
            Ok(_) => {
                let tenant = self
                    .registry
                    .update(
                        slug,
                        TenantPatch {
                            kind: Some(new_tenant.kind),
                            entry_path: Some(new_tenant.entry_path),
                            build_output_dir: Some(new_tenant.build_output_dir),
                            proxy_map: Some(new_tenant.proxy_map),
                            source: Some(new_tenant.source),
                            repo_url: Some(new_tenant.repo_url),
                            branch: Some(new_tenant.branch),
                            status: Some(TenantStatus::Active),
                            last_error: Some(None),
                            last_deployed_at: Some(chrono::Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.cache.evict(slug).await;
                self.events
                    .record(
                        Some(slug),
                        EventKind::Redeploy,
                        EventLevel::Info,
                        &format!("redeployed as {}", tenant.kind),
                        serde_json::json!({ "source": ingest_event.to_string() }),
                    )
                    .await;
                Ok(tenant)
            }
            Err(_) => {
                let tenant = self.registry.create(new_tenant).await?;
                let tenant = self
                    .registry
                    .update(
                        slug,
                        TenantPatch {
                            last_deployed_at: Some(chrono::Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap_or(tenant);
                self.events
                    .record(
                        Some(slug),
                        ingest_event,
                        EventLevel::Info,
                        &format!("deployed as {}", tenant.kind),
                        serde_json::json!({}),
                    )
                    .await;
                Ok(tenant)
            }
        }
    }

    async fn run_npm(&self, dir: &Path, args: &[&str], timeout: std::time::Duration) -> DeployResult<()> {
        let Ok(npm) = which::which("npm") else {
            return Err(DeployError::InstallFailed(
                "no npm binary available on this host".to_string(),
            ));
        };
        let mut cmd = Command::new(npm);
        cmd.args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let child = cmd.spawn()?;

        let is_build = args.first() == Some(&"run");
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| if is_build { DeployError::BuildTimeout } else { DeployError::InstallTimeout })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(if is_build {
                DeployError::BuildFailed(stderr)
            } else {
                DeployError::InstallFailed(stderr)
            });
        }
        Ok(())
    }

    /// Accepts a staged archive already written to disk by the upload
    /// handler, extracts it, and runs it through the shared finalize path.
    pub async fn ingest_archive(
        &self,
        archive_path: &Path,
        slug: &str,
        overrides: IngestOverrides,
    ) -> DeployResult<Tenant> {
        Self::validate_slug(slug)?;
        let staging = self.stage_dir(slug);
        archive::extract(archive_path, &staging, self.config.build().max_archive_bytes())?;
        self.finalize(&staging, slug, TenantSource::ArchiveUpload, overrides, None, None)
            .await
    }

    pub async fn ingest_git(
        &self,
        repo_url: &str,
        branch: Option<&str>,
        slug: &str,
        overrides: IngestOverrides,
    ) -> DeployResult<Tenant> {
        Self::validate_slug(slug)?;
        git::validate_url(repo_url)?;
        let effective_url = git::inject_token(repo_url, self.config.build().git_token());

        let staging = self.stage_dir(slug);
        git::shallow_clone(&effective_url, branch, &staging, self.config.build().clone_timeout()).await?;

        self.finalize(
            &staging,
            slug,
            TenantSource::GitImport,
            overrides,
            Some(repo_url.to_string()),
            branch.map(|b| b.to_string()),
        )
        .await
    }

    /// Fast-forwards a `source=git-import` tenant to its stored (or a
    /// requested) branch and reruns the build if its kind requires one.
    pub async fn update_git(&self, slug: &str, branch: Option<&str>) -> DeployResult<Tenant> {
        let tenant = self.registry.get(slug).await?;
        if tenant.source != TenantSource::GitImport {
            return Err(DeployError::NotGitImport);
        }
        let Some(repo_url) = tenant.repo_url.clone() else {
            return Err(DeployError::NotGitImport);
        };
        let target_branch = branch.map(|b| b.to_string()).or(tenant.branch.clone());

        let staging = self.stage_dir(slug);
        let effective_url = git::inject_token(&repo_url, self.config.build().git_token());
        if let Err(e) = git::shallow_clone(&effective_url, target_branch.as_deref(), &staging, self.config.build().clone_timeout()).await {
            self.mark_error(slug, &e.to_string()).await;
            return Err(e.into());
        }

        match self
            .finalize(
                &staging,
                slug,
                TenantSource::GitImport,
                IngestOverrides {
                    kind: Some(tenant.kind),
                    ..Default::default()
                },
                Some(repo_url),
                target_branch,
            )
            .await
        {
            Ok(tenant) => Ok(tenant),
            Err(e) => {
                self.mark_error(slug, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn mark_error(&self, slug: &str, message: &str) {
        let _ = self
            .registry
            .update(
                slug,
                TenantPatch {
                    status: Some(TenantStatus::Error),
                    last_error: Some(Some(message.to_string())),
                    ..Default::default()
                },
            )
            .await;
        self.events
            .record(
                Some(slug),
                EventKind::Error,
                EventLevel::Error,
                message,
                serde_json::json!({}),
            )
            .await;
    }

    fn validate_slug(slug: &str) -> DeployResult<()> {
        use crate::common::types::slug::TenantSlug;
        use crate::common::types::value_object::ValueObjectable;
        TenantSlug(slug.to_string())
            .validate()
            .map_err(DeployError::InvalidSlug)
    }
}

fn has_build_script(dir: &Path) -> bool {
    let Ok(raw) = std::fs::read_to_string(dir.join("package.json")) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return false;
    };
    value.get("scripts").and_then(|s| s.get("build")).is_some()
}

fn staging_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
