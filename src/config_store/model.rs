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

/// A platform-wide key-value row (§4.3). `encrypted` entries are opaque and
/// must be scrubbed from any listing marked public.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettingEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub category: String,
    pub encrypted: bool,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SettingEntry {
    /// Redacts `value` when the entry is marked encrypted, for public listings.
    pub fn redacted(mut self) -> Self {
        if self.encrypted {
            self.value = serde_json::Value::String("••••••••".to_string());
        }
        self
    }
}

/// One row accepted by `ConfigStore::set_settings` (§6 `PUT /api/admin/settings`).
#[derive(Debug, Clone)]
pub struct NewSetting {
    pub key: String,
    pub value: serde_json::Value,
    pub category: String,
    pub description: Option<String>,
    pub encrypted: bool,
}

/// `PATCH .../env` body's `action` field (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPatchAction {
    Merge,
    Replace,
}
