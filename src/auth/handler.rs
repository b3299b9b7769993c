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

use crate::auth::dto::LoginRequest;
use crate::auth::service::AuthService;
use crate::common::dto::{GeneralError, OkResponse};
use crate::common::error::FriendlyError;
use crate::common::extractors::client_ip::ClientIp;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;

type ApiResult<T> = Result<T, FriendlyError<GeneralError>>;

pub async fn login(
    State(service): State<Arc<AuthService>>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<OkResponse<crate::auth::dto::LoginResponse>>> {
    let response = service.login(&payload, ip)?;
    Ok(Json(OkResponse::new(response)))
}

pub async fn verify(
    State(service): State<Arc<AuthService>>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Json<OkResponse<crate::auth::dto::VerifyResponse>>> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let response = service.verify(token)?;
    Ok(Json(OkResponse::new(response)))
}
