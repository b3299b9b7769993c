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

/// `EventLogEntry.event` (§3): the lifecycle moments the platform records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Load,
    Unload,
    Deploy,
    Redeploy,
    EnvUpdate,
    GitImport,
    ArchiveUpload,
    Error,
    Delete,
    Rename,
    Backup,
    Webhook,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Load => "load",
            EventKind::Unload => "unload",
            EventKind::Deploy => "deploy",
            EventKind::Redeploy => "redeploy",
            EventKind::EnvUpdate => "env-update",
            EventKind::GitImport => "git-import",
            EventKind::ArchiveUpload => "archive-upload",
            EventKind::Error => "error",
            EventKind::Delete => "delete",
            EventKind::Rename => "rename",
            EventKind::Backup => "backup",
            EventKind::Webhook => "webhook",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(EventKind::Load),
            "unload" => Ok(EventKind::Unload),
            "deploy" => Ok(EventKind::Deploy),
            "redeploy" => Ok(EventKind::Redeploy),
            "env-update" => Ok(EventKind::EnvUpdate),
            "git-import" => Ok(EventKind::GitImport),
            "archive-upload" => Ok(EventKind::ArchiveUpload),
            "error" => Ok(EventKind::Error),
            "delete" => Ok(EventKind::Delete),
            "rename" => Ok(EventKind::Rename),
            "backup" => Ok(EventKind::Backup),
            "webhook" => Ok(EventKind::Webhook),
            other => Err(format!("unknown event kind '{other}'")),
        }
    }
}

/// `EventLogEntry.level` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(EventLevel::Info),
            "warn" => Ok(EventLevel::Warn),
            "error" => Ok(EventLevel::Error),
            other => Err(format!("unknown event level '{other}'")),
        }
    }
}

/// The persisted `EventLogEntry` of §3: append-only, one row per lifecycle
/// moment. `slug` is `None` for platform-wide events (e.g. a sync pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub slug: Option<String>,
    pub event: EventKind,
    pub level: EventLevel,
    pub message: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Raw shape returned by `sqlx` queries against `event_logs`.
#[derive(Debug, sqlx::FromRow)]
pub struct EventLogRow {
    pub slug: Option<String>,
    pub event: String,
    pub level: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EventLogRow {
    pub fn into_entry(self) -> Result<EventLogEntry, String> {
        Ok(EventLogEntry {
            slug: self.slug,
            event: self.event.parse()?,
            level: self.level.parse()?,
            message: self.message,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// Fields accepted by `EventLogsRepository::insert`.
#[derive(Debug, Clone)]
pub struct NewEventLog {
    pub slug: Option<String>,
    pub event: EventKind,
    pub level: EventLevel,
    pub message: String,
    pub metadata: serde_json::Value,
}
