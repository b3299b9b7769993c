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
use crate::config_store::dto::{
    BulkSetSettingsRequest, EnvDeleteRequest, EnvPatchRequest, SettingQuery, SettingRequest,
};
use crate::config_store::model::NewSetting;
use crate::config_store::routes::ConfigStoreState;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::json;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

pub async fn get_env(
    State(state): State<ConfigStoreState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let vars = state.store.load_env(&slug).await?;
    Ok(Json(OkResponse::new(json!({ "vars": vars }))))
}

pub async fn patch_env(
    State(state): State<ConfigStoreState>,
    Path(slug): Path<String>,
    Json(payload): Json<EnvPatchRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let vars = state
        .store
        .patch_env(&slug, payload.env, payload.action.into())
        .await?;
    Ok(Json(OkResponse::new(json!({ "vars": vars }))))
}

pub async fn delete_env(
    State(state): State<ConfigStoreState>,
    Path(slug): Path<String>,
    body: Option<Json<EnvDeleteRequest>>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let keys = body.and_then(|Json(payload)| payload.keys);
    let vars = state.store.delete_env(&slug, keys).await?;
    Ok(Json(OkResponse::new(json!({ "vars": vars }))))
}

pub async fn get_setting(
    State(state): State<ConfigStoreState>,
    Path(key): Path<String>,
    Query(query): Query<SettingQuery>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entry = state.store.get_setting(&key, query.default).await?;
    Ok(Json(OkResponse::new(json!({ "setting": entry }))))
}

pub async fn set_setting(
    State(state): State<ConfigStoreState>,
    Path(key): Path<String>,
    Json(payload): Json<SettingRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entry = state
        .store
        .set_setting(
            &key,
            payload.value,
            &payload.category,
            payload.description,
            payload.encrypted,
        )
        .await?;
    Ok(Json(OkResponse::new(json!({ "setting": entry }))))
}

pub async fn list_settings_by_category(
    State(state): State<ConfigStoreState>,
    Path(category): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entries = state.store.get_by_category(&category).await?;
    let redacted: Vec<_> = entries.into_iter().map(|e| e.redacted()).collect();
    Ok(Json(OkResponse::new(json!({ "settings": redacted }))))
}

pub async fn list_settings(
    State(state): State<ConfigStoreState>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entries = state.store.list_settings().await?;
    let redacted: Vec<_> = entries.into_iter().map(|e| e.redacted()).collect();
    Ok(Json(OkResponse::new(json!({ "settings": redacted }))))
}

pub async fn set_settings(
    State(state): State<ConfigStoreState>,
    Json(payload): Json<BulkSetSettingsRequest>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    let entries = payload
        .settings
        .into_iter()
        .map(|s| NewSetting {
            key: s.key,
            value: s.value,
            category: s.category,
            description: s.description,
            encrypted: s.encrypted,
        })
        .collect();
    let entries = state.store.set_settings(entries).await?;
    Ok(Json(OkResponse::new(json!({ "settings": entries }))))
}

pub async fn delete_setting(
    State(state): State<ConfigStoreState>,
    Path(key): Path<String>,
) -> ApiResult<Json<OkResponse<serde_json::Value>>> {
    state.store.delete_setting(&key).await?;
    Ok(Json(OkResponse::new(json!({ "key": key }))))
}
