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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Disabled,
    Error,
}

impl Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TenantStatus::Active => "active",
            TenantStatus::Disabled => "disabled",
            TenantStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TenantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "disabled" => Ok(TenantStatus::Disabled),
            "error" => Ok(TenantStatus::Error),
            other => Err(format!("unknown tenant status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    Backend,
    Frontend,
    Fullstack,
}

impl TenantKind {
    pub fn needs_subprocess(&self) -> bool {
        matches!(self, TenantKind::Backend | TenantKind::Fullstack)
    }

    pub fn needs_build_output(&self) -> bool {
        matches!(self, TenantKind::Frontend | TenantKind::Fullstack)
    }

    pub fn needs_dependency_install(&self) -> bool {
        matches!(self, TenantKind::Backend | TenantKind::Fullstack)
    }
}

impl Display for TenantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TenantKind::Backend => "backend",
            TenantKind::Frontend => "frontend",
            TenantKind::Fullstack => "fullstack",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TenantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backend" => Ok(TenantKind::Backend),
            "frontend" => Ok(TenantKind::Frontend),
            "fullstack" => Ok(TenantKind::Fullstack),
            other => Err(format!("unknown tenant kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenantSource {
    ArchiveUpload,
    GitImport,
    Manual,
    Unknown,
}

impl Display for TenantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TenantSource::ArchiveUpload => "archive-upload",
            TenantSource::GitImport => "git-import",
            TenantSource::Manual => "manual",
            TenantSource::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TenantSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive-upload" => Ok(TenantSource::ArchiveUpload),
            "git-import" => Ok(TenantSource::GitImport),
            "manual" => Ok(TenantSource::Manual),
            "unknown" => Ok(TenantSource::Unknown),
            other => Err(format!("unknown tenant source '{other}'")),
        }
    }
}

/// One `pathPrefix -> upstreamBaseURL` entry of a frontend/fullstack tenant's
/// proxy map (§3). Order is significant: rules are tried first-match-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRule {
    pub path_prefix: String,
    pub upstream_base_url: String,
}

/// The persisted Tenant row (§3). Durable state owned exclusively by the
/// Tenant Registry; never mutated directly by the cache or the forwarder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub slug: String,
    pub name: String,
    pub status: TenantStatus,
    pub kind: TenantKind,
    pub entry_path: String,
    pub build_output_dir: Option<String>,
    pub proxy_map: Vec<ProxyRule>,
    pub source: TenantSource,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub webhook_url: Option<String>,
    pub last_error: Option<String>,
    pub request_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

/// Raw shape returned by `sqlx` queries against the `tenants` table: enums
/// and timestamps are plain columns here, upgraded to domain types in
/// [`TenantRow::into_tenant`].
#[derive(Debug, sqlx::FromRow)]
pub struct TenantRow {
    pub slug: String,
    pub name: String,
    pub status: String,
    pub kind: String,
    pub entry_path: String,
    pub build_output_dir: Option<String>,
    pub proxy_map: serde_json::Value,
    pub source: String,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub webhook_url: Option<String>,
    pub last_error: Option<String>,
    pub request_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

impl TenantRow {
    pub fn into_tenant(self) -> Result<Tenant, String> {
        Ok(Tenant {
            slug: self.slug,
            name: self.name,
            status: self.status.parse()?,
            kind: self.kind.parse()?,
            entry_path: self.entry_path,
            build_output_dir: self.build_output_dir,
            proxy_map: serde_json::from_value(self.proxy_map)
                .map_err(|e| format!("malformed proxy_map: {e}"))?,
            source: self.source.parse()?,
            repo_url: self.repo_url,
            branch: self.branch,
            webhook_url: self.webhook_url,
            last_error: self.last_error,
            request_count: self.request_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_deployed_at: self.last_deployed_at,
        })
    }
}

/// Fields accepted when creating a tenant row (§4.2 `create`).
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub slug: String,
    pub name: String,
    pub kind: TenantKind,
    pub entry_path: String,
    pub build_output_dir: Option<String>,
    pub proxy_map: Vec<ProxyRule>,
    pub source: TenantSource,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
}

/// A sparse patch applied by `update`/internal pipeline callbacks (§4.2).
/// `None` fields are left untouched; this is not the same as "set to null".
#[derive(Debug, Clone, Default)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub kind: Option<TenantKind>,
    pub entry_path: Option<String>,
    pub build_output_dir: Option<Option<String>>,
    pub proxy_map: Option<Vec<ProxyRule>>,
    pub source: Option<TenantSource>,
    pub repo_url: Option<Option<String>>,
    pub branch: Option<Option<String>>,
    pub webhook_url: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}
