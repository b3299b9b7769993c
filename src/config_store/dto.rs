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

use crate::config_store::model::EnvPatchAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvAction {
    Merge,
    Replace,
}

impl From<EnvAction> for EnvPatchAction {
    fn from(action: EnvAction) -> Self {
        match action {
            EnvAction::Merge => EnvPatchAction::Merge,
            EnvAction::Replace => EnvPatchAction::Replace,
        }
    }
}

/// `PATCH /api/admin/apps/:slug/env` body (§6).
#[derive(Debug, Deserialize)]
pub struct EnvPatchRequest {
    pub env: BTreeMap<String, String>,
    pub action: EnvAction,
}

/// `DELETE /api/admin/apps/:slug/env` body (§6). Omitted `keys` deletes the whole file.
#[derive(Debug, Deserialize, Default)]
pub struct EnvDeleteRequest {
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingRequest {
    pub value: serde_json::Value,
    pub category: String,
    pub description: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Deserialize)]
pub struct SettingQuery {
    pub default: Option<serde_json::Value>,
}

/// One row of a `PUT /api/admin/settings` bulk-set body (§6).
#[derive(Debug, Deserialize)]
pub struct BulkSettingEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub category: String,
    pub description: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkSetSettingsRequest {
    pub settings: Vec<BulkSettingEntry>,
}
