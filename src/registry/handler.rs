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
use crate::registry::dto::{
    CreateAppRequest, ListAppsQuery, PatchAppRequest, RenameAppRequest, SyncRequest,
};
use crate::registry::model::{NewTenant, TenantPatch, TenantSource, TenantStatus};
use crate::registry::routes::RegistryState;
use crate::webhook::dto::WebhookEvent;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::json;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

pub async fn list(
    State(state): State<RegistryState>,
    Query(query): Query<ListAppsQuery>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let apps = state.registry.list(query.status).await?;
    Ok(Json(OkResponse::new(json!({ "apps": apps }))))
}

pub async fn get(
    State(state): State<RegistryState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let app = state.registry.get(&slug).await?;
    Ok(Json(OkResponse::new(json!({ "app": app }))))
}

pub async fn create(
    State(state): State<RegistryState>,
    Json(payload): Json<CreateAppRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state
        .registry
        .create(NewTenant {
            slug: payload.slug,
            name: payload.name,
            kind: payload.kind,
            entry_path: payload.entry_path,
            build_output_dir: payload.build_output_dir,
            proxy_map: payload.proxy_map,
            source: TenantSource::Manual,
            repo_url: None,
            branch: None,
        })
        .await?;
    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppDeployed,
            &tenant.slug,
            &tenant,
        )
        .await;
    Ok(Json(OkResponse::new(json!({ "app": tenant }))))
}

pub async fn patch(
    State(state): State<RegistryState>,
    Path(slug): Path<String>,
    Json(payload): Json<PatchAppRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let status = payload
        .status
        .map(|s| s.parse::<TenantStatus>())
        .transpose()
        .map_err(|e| {
            FriendlyError::user_facing(
                tracing::Level::DEBUG,
                axum::http::StatusCode::BAD_REQUEST,
                crate::common::error::codes::VALIDATION_GENERAL,
                file!(),
                GeneralError { message: e },
            )
        })?;

    let tenant = state
        .registry
        .update(
            &slug,
            TenantPatch {
                name: payload.name,
                status,
                kind: payload.kind,
                entry_path: payload.entry_path,
                build_output_dir: payload.build_output_dir,
                proxy_map: payload.proxy_map,
                webhook_url: payload.webhook_url,
                ..Default::default()
            },
        )
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
    State(state): State<RegistryState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state.registry.get(&slug).await.ok();
    state.registry.delete(&slug).await?;
    if let Some(tenant) = tenant {
        state
            .webhooks
            .notify(
                tenant.webhook_url.as_deref(),
                WebhookEvent::AppDeleted,
                &tenant.slug,
                &tenant,
            )
            .await;
    }
    Ok(Json(OkResponse::new(json!({ "slug": slug }))))
}

pub async fn rename(
    State(state): State<RegistryState>,
    Path(slug): Path<String>,
    Json(payload): Json<RenameAppRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let tenant = state.registry.rename(&slug, &payload.new_name).await?;
    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppUpdated,
            &tenant.slug,
            &tenant,
        )
        .await;
    Ok(Json(OkResponse::new(
        json!({ "oldSlug": slug, "newSlug": tenant.slug }),
    )))
}

pub async fn sync(
    State(state): State<RegistryState>,
    Json(payload): Json<SyncRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let report = state.registry.sync(payload.auto_rename).await?;
    Ok(Json(OkResponse::new(json!({ "result": report }))))
}
