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

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt::Display;
use uuid::Uuid;

/// Envelope for every successful admin-API response: `{success: true, ...}`.
#[derive(Debug, Serialize)]
pub struct OkResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> OkResponse<T>
where
    T: Serialize,
{
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T> IntoResponse for OkResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Envelope for every error response, carrying the numeric code taxonomy of §7.
#[derive(Debug, Serialize)]
pub struct ErrorBody<T>
where
    T: Serialize,
{
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<T>
where
    T: Serialize,
{
    pub success: bool,
    pub error: ErrorBody<T>,
    pub request_id: Uuid,
}

pub struct ErrorResponse<T>
where
    T: Serialize,
{
    pub status_code: StatusCode,
    pub code: u16,
    pub message: String,
    pub details: Option<T>,
    pub request_id: Uuid,
}

impl<T> IntoResponse for ErrorResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let mut response = Json(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
            request_id: self.request_id,
        })
        .into_response();
        *response.status_mut() = self.status_code;
        response
    }
}

/// A minimal message-only error payload, used when a field-level breakdown doesn't apply.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralError {
    pub message: String,
}

impl Display for GeneralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A field-level validation error payload, carrying both a summary message and the
/// per-field breakdown produced by the failing value objects.
#[derive(Debug, Clone, Serialize)]
pub struct FormError<T>
where
    T: Serialize,
{
    pub message: String,
    pub fields: T,
}

impl<T> Display for FormError<T>
where
    T: Serialize,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
