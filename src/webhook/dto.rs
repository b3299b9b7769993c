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

/// Lifecycle events the dispatcher can fan out (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    AppDeployed,
    AppUpdated,
    AppDeleted,
    AppError,
    AppBuildCompleted,
    AppBuildFailed,
    WebhookTest,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::AppDeployed => "app.deployed",
            WebhookEvent::AppUpdated => "app.updated",
            WebhookEvent::AppDeleted => "app.deleted",
            WebhookEvent::AppError => "app.error",
            WebhookEvent::AppBuildCompleted => "app.build.completed",
            WebhookEvent::AppBuildFailed => "app.build.failed",
            WebhookEvent::WebhookTest => "webhook.test",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookPayload<T>
where
    T: Serialize,
{
    pub event: String,
    pub slug: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct SetWebhookRequest {
    pub url: String,
}
