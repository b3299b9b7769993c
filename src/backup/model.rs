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

use crate::registry::model::{ProxyRule, Tenant, TenantKind, TenantSource, TenantStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `metadata.json` document embedded at the root of every backup ZIP
/// (§3 `BackupBlob`): a snapshot of the Tenant row as it stood at backup
/// time, independent of whatever the row says now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
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
    pub snapshot_at: DateTime<Utc>,
}

impl From<&Tenant> for BackupMetadata {
    fn from(tenant: &Tenant) -> Self {
        Self {
            slug: tenant.slug.clone(),
            name: tenant.name.clone(),
            status: tenant.status,
            kind: tenant.kind,
            entry_path: tenant.entry_path.clone(),
            build_output_dir: tenant.build_output_dir.clone(),
            proxy_map: tenant.proxy_map.clone(),
            source: tenant.source,
            repo_url: tenant.repo_url.clone(),
            branch: tenant.branch.clone(),
            webhook_url: tenant.webhook_url.clone(),
            snapshot_at: Utc::now(),
        }
    }
}

/// One `list()` row (§4.9): filename plus what can be parsed out of it and
/// its filesystem size, without opening the archive.
#[derive(Debug, Clone, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}
