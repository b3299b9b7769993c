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

use crate::common::dto::{GeneralError, OkResponse};
use crate::common::error::FriendlyError;
use crate::registry::model::TenantPatch;
use crate::webhook::dto::{SetWebhookRequest, WebhookEvent};
use crate::webhook::routes::WebhookState;
use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

pub async fn get_webhook(
    State(state): State<WebhookState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state.registry.get(&slug).await?;
    Ok(Json(OkResponse::new(json!({ "url": tenant.webhook_url }))))
}

pub async fn set_webhook(
    State(state): State<WebhookState>,
    Path(slug): Path<String>,
    Json(payload): Json<SetWebhookRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state
        .registry
        .update(
            &slug,
            TenantPatch {
                webhook_url: Some(Some(payload.url)),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(OkResponse::new(json!({ "url": tenant.webhook_url }))))
}

pub async fn delete_webhook(
    State(state): State<WebhookState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    state
        .registry
        .update(
            &slug,
            TenantPatch {
                webhook_url: Some(None),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(OkResponse::new(json!({ "slug": slug }))))
}

pub async fn test_webhook(
    State(state): State<WebhookState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state.registry.get(&slug).await?;
    state
        .dispatcher
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::WebhookTest,
            &slug,
            &json!({ "message": "this is a test delivery from PlatformX" }),
        )
        .await;
    Ok(Json(OkResponse::new(
        json!({ "delivered": tenant.webhook_url.is_some() }),
    )))
}
