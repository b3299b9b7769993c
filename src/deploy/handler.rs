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

use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, codes};
use crate::deploy::dto::{GitImportRequest, GitUpdateRequest};
use crate::deploy::pipeline::IngestOverrides;
use crate::deploy::routes::DeployState;
use crate::registry::model::{ProxyRule, TenantKind};
use crate::webhook::dto::WebhookEvent;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use serde_json::json;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

fn bad_request(message: impl Into<String>) -> FriendlyError<GeneralError> {
    FriendlyError::user_facing(
        tracing::Level::DEBUG,
        StatusCode::BAD_REQUEST,
        codes::VALIDATION_GENERAL,
        file!(),
        GeneralError {
            message: message.into(),
        },
    )
}

fn bad_mime(message: impl Into<String>) -> FriendlyError<GeneralError> {
    FriendlyError::user_facing(
        tracing::Level::DEBUG,
        StatusCode::BAD_REQUEST,
        codes::VALIDATION_MIME,
        file!(),
        GeneralError {
            message: message.into(),
        },
    )
}

const ZIP_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "application/octet-stream",
];

/// Validates the uploaded field's declared filename/content-type before any
/// bytes are written to disk (§4.5: archive must end in `.zip`).
fn validate_archive_field(field: &axum::extract::multipart::Field<'_>) -> ApiResult<()> {
    let file_name = field
        .file_name()
        .ok_or_else(|| bad_mime("missing filename on uploaded archive"))?;
    if !file_name.to_ascii_lowercase().ends_with(".zip") {
        return Err(bad_mime(format!("archive filename '{file_name}' must end in .zip")));
    }
    if let Some(content_type) = field.content_type() {
        if !ZIP_CONTENT_TYPES.contains(&content_type) {
            return Err(bad_mime(format!("unsupported content type '{content_type}' for archive upload")));
        }
    }
    Ok(())
}

pub async fn upload(
    State(state): State<DeployState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut slug: Option<String> = None;
    let mut entry_path: Option<String> = None;
    let mut kind: Option<TenantKind> = None;
    let mut build_output_dir: Option<String> = None;
    let mut proxy_map: Vec<ProxyRule> = Vec::new();
    let mut archive_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                validate_archive_field(&field)?;
                archive_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(e.to_string()))?
                        .to_vec(),
                );
            }
            "slug" => slug = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            "entryPath" => {
                entry_path = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?)
            }
            "kind" => {
                let raw = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                kind = Some(raw.parse().map_err(bad_request)?);
            }
            "buildOutputDir" => {
                build_output_dir = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?)
            }
            "proxyMap" => {
                let raw = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                proxy_map = serde_json::from_str(&raw).map_err(|e| bad_request(e.to_string()))?;
            }
            _ => {}
        }
    }

    let slug = slug.ok_or_else(|| bad_request("missing 'slug' field"))?;
    let archive_bytes = archive_bytes.ok_or_else(|| bad_request("missing 'file' field"))?;

    tokio::fs::create_dir_all(state.config.platform().uploads_root()).await.ok();
    let archive_path = state
        .config
        .platform()
        .uploads_root()
        .join(format!("{slug}-{}.zip", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&archive_path, &archive_bytes)
        .await
        .map_err(|e| bad_request(e.to_string()))?;

    let result = state
        .pipeline
        .ingest_archive(
            &archive_path,
            &slug,
            IngestOverrides {
                entry_path,
                kind,
                build_output_dir,
                proxy_map,
            },
        )
        .await;
    let _ = tokio::fs::remove_file(&archive_path).await;
    let tenant = result?;

    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppDeployed,
            &tenant.slug,
            &tenant,
        )
        .await;

    Ok(Json(json!({ "success": true, "slug": tenant.slug, "kind": tenant.kind, "app": tenant })))
}

pub async fn git_import(
    State(state): State<DeployState>,
    Json(payload): Json<GitImportRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let tenant = state
        .pipeline
        .ingest_git(
            &payload.repo_url,
            payload.branch.as_deref(),
            &payload.slug,
            IngestOverrides {
                entry_path: payload.entry_path,
                kind: payload.kind,
                build_output_dir: payload.build_output_dir,
                proxy_map: payload.proxy_map,
            },
        )
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

    Ok(Json(json!({ "success": true, "app": tenant })))
}

pub async fn git_update(
    State(state): State<DeployState>,
    Path(slug): Path<String>,
    body: Option<Json<GitUpdateRequest>>,
) -> ApiResult<Json<serde_json::Value>> {
    let branch = body.and_then(|Json(b)| b.branch);
    let tenant = state.pipeline.update_git(&slug, branch.as_deref()).await?;

    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppUpdated,
            &tenant.slug,
            &tenant,
        )
        .await;

    Ok(Json(json!({ "success": true, "app": tenant })))
}

/// Redeploys in place: for a git-import tenant this is equivalent to
/// `update_git` with the stored branch; other sources must be redeployed by
/// re-uploading or re-importing (§6).
pub async fn redeploy(
    State(state): State<DeployState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let tenant = state.pipeline.update_git(&slug, None).await?;
    state
        .webhooks
        .notify(
            tenant.webhook_url.as_deref(),
            WebhookEvent::AppUpdated,
            &tenant.slug,
            &tenant,
        )
        .await;
    Ok(Json(json!({ "success": true, "app": tenant })))
}
