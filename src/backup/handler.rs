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

use crate::backup::routes::BackupState;
use crate::common::dto::{GeneralError, OkResponse};
use crate::common::error::FriendlyError;
use crate::webhook::dto::WebhookEvent;
use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

#[derive(Debug, Deserialize)]
pub struct RestoreBackupRequest {
    pub backup_name: String,
    pub new_name: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn list(State(state): State<BackupState>) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let backups = state.engine.list().await?;
    Ok(Json(OkResponse::new(json!({ "backups": backups }))))
}

pub async fn create(
    State(state): State<BackupState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entry = state.engine.create(&slug).await?;
    let tenant = state.registry.get(&slug).await.ok();
    state
        .webhooks
        .notify(
            tenant.as_ref().and_then(|t| t.webhook_url.as_deref()),
            WebhookEvent::AppUpdated,
            &slug,
            &entry,
        )
        .await;
    Ok(Json(OkResponse::new(json!({ "backup": entry }))))
}

pub async fn restore(
    State(state): State<BackupState>,
    Json(payload): Json<RestoreBackupRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state
        .engine
        .restore(&payload.backup_name, payload.new_name, payload.overwrite)
        .await?;
    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppUpdated,
            &tenant.slug,
            &tenant,
        )
        .await;
    Ok(Json(OkResponse::new(json!({ "app": tenant }))))
}

pub async fn delete(
    State(state): State<BackupState>,
    Path(name): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    state.engine.delete(&name).await?;
    Ok(Json(OkResponse::new(json!({ "name": name }))))
}
