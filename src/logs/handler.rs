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
use crate::logs::routes::LogsState;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub format: Option<String>,
    pub limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// `GET /api/admin/apps/:slug/logs?format=json|text&limit` (§6). Defaults to
/// the JSON event-log rows; `format=text` instead tails the append-only
/// `<LOGS_ROOT>/<slug>.log` mirror.
pub async fn get_logs(
    State(state): State<LogsState>,
    Path(slug): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, FriendlyError<GeneralError>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    if query.format.as_deref() == Some("text") {
        let text = state.logs.tail_text(&slug, limit as usize).await.map_err(|e| {
            FriendlyError::internal(
                file!(),
                GeneralError {
                    message: e.to_string(),
                },
            )
        })?;
        return Ok(([("content-type", "text/plain; charset=utf-8")], text).into_response());
    }

    let entries = state.logs.list(&slug, limit).await?;
    Ok(OkResponse::new(json!({ "logs": entries })).into_response())
}
