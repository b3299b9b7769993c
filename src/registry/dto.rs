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

use crate::registry::model::{ProxyRule, TenantKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListAppsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub slug: String,
    pub name: String,
    pub kind: TenantKind,
    #[serde(default)]
    pub entry_path: String,
    pub build_output_dir: Option<String>,
    #[serde(default)]
    pub proxy_map: Vec<ProxyRule>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchAppRequest {
    pub name: Option<String>,
    pub status: Option<String>,
    pub kind: Option<TenantKind>,
    pub entry_path: Option<String>,
    pub build_output_dir: Option<Option<String>>,
    pub proxy_map: Option<Vec<ProxyRule>>,
    pub webhook_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RenameAppRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub auto_rename: bool,
}
