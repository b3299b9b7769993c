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

use crate::backup::model::{BackupEntry, BackupMetadata};
use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, codes};
use crate::common::types::slug::TenantSlug;
use crate::common::types::value_object::ValueObjectable;
use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::registry::model::{NewTenant, Tenant, TenantPatch};
use crate::registry::service::{CacheEvictor, RegistryError, TenantRegistry};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::Level;

const TREE_PREFIX: &str = "tree/";
const METADATA_ENTRY: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup '{0}' not found")]
    NotFound(String),
    #[error("tenant '{0}' already exists")]
    Conflict(String),
    #[error("invalid backup name: {0}")]
    InvalidName(String),
    #[error("archive is missing or has a malformed {METADATA_ENTRY}: {0}")]
    MalformedMetadata(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackupResult<T> = Result<T, BackupError>;

impl From<BackupError> for FriendlyError<GeneralError> {
    fn from(e: BackupError) -> Self {
        let e = match e {
            BackupError::Registry(registry_err) => return registry_err.into(),
            other => other,
        };
        let message = e.to_string();
        let (status, code) = match &e {
            BackupError::NotFound(_) => (StatusCode::NOT_FOUND, codes::BACKUP_NOT_FOUND),
            BackupError::Conflict(_) => (StatusCode::CONFLICT, codes::BACKUP_CONFLICT),
            BackupError::InvalidName(_) | BackupError::MalformedMetadata(_) | BackupError::Zip(_) => {
                (StatusCode::BAD_REQUEST, codes::BACKUP_INVALID)
            }
            BackupError::Registry(_) => unreachable!("handled above"),
            BackupError::Io(_) => {
                return FriendlyError::internal(file!(), GeneralError { message });
            }
        };
        FriendlyError::user_facing(Level::WARN, status, code, file!(), GeneralError { message })
    }
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)-(\d{8}T\d{6}Z)\.zip$").expect("valid regex"))
}

/// Owns `<BACKUPS_ROOT>` exclusively (§3): snapshot/restore tenant trees as
/// portable ZIP archives carrying a `metadata.json` Tenant snapshot,
/// grounded in the Build Pipeline's stage-then-atomically-move shape
/// (`deploy::pipeline::DeployPipeline`) and the extraction safeguards of
/// `deploy::archive`.
pub struct BackupEngine {
    registry: Arc<TenantRegistry>,
    cache: Arc<dyn CacheEvictor>,
    backups_root: PathBuf,
    apps_root: PathBuf,
    events: Arc<dyn EventRecorder>,
}

impl BackupEngine {
    pub fn new(
        registry: Arc<TenantRegistry>,
        cache: Arc<dyn CacheEvictor>,
        backups_root: PathBuf,
        apps_root: PathBuf,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            registry,
            cache,
            backups_root,
            apps_root,
            events,
        }
    }

    fn validate_name(name: &str) -> BackupResult<()> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
        {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// `create(slug)` (§4.9): snapshots `<APPS_ROOT>/<slug>/` into
    /// `<slug>-<timestamp>.zip`, embedding a `metadata.json` Tenant snapshot
    /// at the archive root and the tenant tree under a `tree/` prefix so the
    /// two namespaces never collide.
    pub async fn create(&self, slug: &str) -> BackupResult<BackupEntry> {
        let tenant = self.registry.get(slug).await?;
        let dir = self.apps_root.join(slug);

        tokio::fs::create_dir_all(&self.backups_root).await?;
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let name = format!("{slug}-{timestamp}.zip");
        let path = self.backups_root.join(&name);

        write_archive(&path, &dir, &tenant)?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();

        self.events
            .record(
                Some(slug),
                EventKind::Backup,
                EventLevel::Info,
                &format!("created backup '{name}'"),
                serde_json::json!({ "size_bytes": size_bytes }),
            )
            .await;

        Ok(BackupEntry {
            name,
            slug: slug.to_string(),
            created_at: Utc::now(),
            size_bytes,
        })
    }

    /// `list()` (§4.9): every `<slug>-<timestamp>.zip` under the backups
    /// root, parsed from the filename alone (no archive is opened).
    pub async fn list(&self) -> BackupResult<Vec<BackupEntry>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.backups_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(captures) = filename_pattern().captures(&file_name) else {
                continue;
            };
            let slug = captures[1].to_string();
            let created_at = parse_backup_timestamp(&captures[2]).unwrap_or_else(Utc::now);
            let size_bytes = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            out.push(BackupEntry {
                name: file_name,
                slug,
                created_at,
                size_bytes,
            });
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    /// `restore(archiveName, targetSlug?, overwrite?)` (§4.9): if the target
    /// slug is already registered and `overwrite=false` this is a conflict;
    /// with `overwrite=true` the existing tenant is evicted and its
    /// directory/row removed before the archive is extracted.
    pub async fn restore(
        &self,
        archive_name: &str,
        target_slug: Option<String>,
        overwrite: bool,
    ) -> BackupResult<Tenant> {
        Self::validate_name(archive_name)?;
        let path = self.backups_root.join(archive_name);
        if !path.is_file() {
            return Err(BackupError::NotFound(archive_name.to_string()));
        }

        let metadata = read_metadata(&path)?;
        let target = target_slug.unwrap_or_else(|| metadata.slug.clone());
        TenantSlug(target.clone())
            .validate()
            .map_err(RegistryError::InvalidSlug)?;

        let existing = self.registry.get(&target).await.ok();
        if existing.is_some() {
            if !overwrite {
                return Err(BackupError::Conflict(target));
            }
            self.registry.delete(&target).await?;
        }

        let target_dir = self.apps_root.join(&target);
        tokio::fs::create_dir_all(&target_dir).await?;
        extract_tree(&path, &target_dir)?;

        let new_tenant = NewTenant {
            slug: target.clone(),
            name: metadata.name.clone(),
            kind: metadata.kind,
            entry_path: metadata.entry_path.clone(),
            build_output_dir: metadata.build_output_dir.clone(),
            proxy_map: metadata.proxy_map.clone(),
            source: metadata.source,
            repo_url: metadata.repo_url.clone(),
            branch: metadata.branch.clone(),
        };
        let tenant = self.registry.create(new_tenant).await?;
        let tenant = self
            .registry
            .update(
                &target,
                TenantPatch {
                    status: Some(metadata.status),
                    webhook_url: Some(metadata.webhook_url.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_or(tenant);

        self.cache.evict(&target).await;
        self.events
            .record(
                Some(&target),
                EventKind::Backup,
                EventLevel::Info,
                &format!("restored from backup '{archive_name}'"),
                serde_json::json!({}),
            )
            .await;
        Ok(tenant)
    }

    /// `delete(archiveName)` (§4.9): removes one archive file.
    pub async fn delete(&self, archive_name: &str) -> BackupResult<()> {
        Self::validate_name(archive_name)?;
        let path = self.backups_root.join(archive_name);
        if !path.is_file() {
            return Err(BackupError::NotFound(archive_name.to_string()));
        }
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    /// `prune(days)` (§4.9): deletes every archive older than `days`,
    /// returning the names removed.
    pub async fn prune(&self, days: i64) -> BackupResult<Vec<String>> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut removed = Vec::new();
        for entry in self.list().await? {
            if entry.created_at < cutoff {
                self.delete(&entry.name).await?;
                removed.push(entry.name);
            }
        }
        Ok(removed)
    }
}

fn parse_backup_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Writes `metadata.json` plus the tenant tree (prefixed `tree/`) into a
/// fresh ZIP at `path`. Mirrors `deploy::archive`'s synchronous-`zip`-crate
/// shape; called directly from an async method the same way
/// `deploy::archive::extract` is.
fn write_archive(path: &Path, tree_dir: &Path, tenant: &Tenant) -> BackupResult<()> {
    let file = File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let metadata = BackupMetadata::from(tenant);
    writer.start_file(METADATA_ENTRY, options)?;
    std::io::Write::write_all(&mut writer, &serde_json::to_vec_pretty(&metadata)?)?;

    if tree_dir.is_dir() {
        add_tree(&mut writer, tree_dir, tree_dir, options)?;
    }

    writer.finish()?;
    Ok(())
}

fn add_tree(
    writer: &mut zip::ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: zip::write::SimpleFileOptions,
) -> BackupResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let zip_name = format!("{TREE_PREFIX}{}", relative.to_string_lossy().replace('\\', "/"));

        if path.is_dir() {
            writer.add_directory(format!("{zip_name}/"), options)?;
            add_tree(writer, root, &path, options)?;
        } else {
            writer.start_file(zip_name, options)?;
            let mut source = File::open(&path)?;
            std::io::copy(&mut source, writer)?;
        }
    }
    Ok(())
}

fn read_metadata(path: &Path) -> BackupResult<BackupMetadata> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let entry = zip
        .by_name(METADATA_ENTRY)
        .map_err(|_| BackupError::MalformedMetadata(format!("no {METADATA_ENTRY} entry")))?;
    serde_json::from_reader(entry)
        .map_err(|e| BackupError::MalformedMetadata(e.to_string()))
}

/// Extracts every `tree/…` entry of the archive into `dest`, stripping the
/// prefix. Path-traversal guard mirrors `deploy::archive::extract`'s use of
/// `enclosed_name()`.
fn extract_tree(path: &Path, dest: &Path) -> BackupResult<()> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(BackupError::MalformedMetadata(
                "archive entry escapes the extraction root".to_string(),
            ));
        };
        let Ok(relative) = relative.strip_prefix(TREE_PREFIX) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }
    Ok(())
}

impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> Self {
        BackupError::MalformedMetadata(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::{TenantKind, TenantSource, TenantStatus};

    fn sample_tenant(slug: &str) -> Tenant {
        Tenant {
            slug: slug.to_string(),
            name: slug.to_string(),
            status: TenantStatus::Active,
            kind: TenantKind::Backend,
            entry_path: "server.js".to_string(),
            build_output_dir: None,
            proxy_map: Vec::new(),
            source: TenantSource::Manual,
            repo_url: None,
            branch: None,
            webhook_url: None,
            last_error: None,
            request_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_deployed_at: None,
        }
    }

    #[test]
    fn round_trips_tree_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree-src");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("server.js"), b"module.exports = () => {};").unwrap();

        let archive_path = dir.path().join("shop-20260101T000000Z.zip");
        write_archive(&archive_path, &tree, &sample_tenant("shop")).unwrap();

        let metadata = read_metadata(&archive_path).unwrap();
        assert_eq!(metadata.slug, "shop");

        let out = dir.path().join("restored");
        std::fs::create_dir_all(&out).unwrap();
        extract_tree(&archive_path, &out).unwrap();
        assert!(out.join("server.js").is_file());
    }

    #[test]
    fn filename_pattern_captures_slug_and_timestamp() {
        let captures = filename_pattern().captures("my-shop-20260101T000000Z.zip").unwrap();
        assert_eq!(&captures[1], "my-shop");
        assert_eq!(&captures[2], "20260101T000000Z");
    }

    #[test]
    fn rejects_path_traversal_in_backup_name() {
        assert!(BackupEngine::validate_name("../etc/passwd").is_err());
        assert!(BackupEngine::validate_name("plain-name.zip").is_ok());
    }
}
