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

use crate::auth::claims::Claims;
use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, codes};
use crate::manager::app::config::AppConfig;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::Level;

/// Guards every admin-API route except the unauthenticated ones named in §6
/// (health, `/api/auth/login`). Extracts the bearer token, validates it
/// against the operator realm, and stores the resulting [`Claims`] as a
/// request extension for downstream handlers.
pub async fn require_auth(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, FriendlyError<GeneralError>> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            FriendlyError::user_facing(
                Level::DEBUG,
                StatusCode::UNAUTHORIZED,
                codes::AUTH_TOKEN_INVALID,
                file!(),
                GeneralError {
                    message: "missing bearer token".to_string(),
                },
            )
        })?;

    let claims = Claims::from_token(
        token,
        config.auth().jwt_secret().as_bytes(),
        config.auth().jwt_issuer(),
        config.auth().jwt_audience(),
    )
    .map_err(|_| {
        FriendlyError::user_facing(
            Level::DEBUG,
            StatusCode::UNAUTHORIZED,
            codes::AUTH_TOKEN_INVALID,
            file!(),
            GeneralError {
                message: "invalid or expired token".to_string(),
            },
        )
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
