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

use crate::common::dto::{ErrorResponse, FormError, GeneralError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use std::fmt::Display;
use thiserror::Error;
use tracing::Level;
use tracing::event;
use uuid::Uuid;

/// The numeric error code families from the admin API's error envelope.
///
/// Families: 1xxx auth, 2xxx validation, 3xxx app, 4xxx durable-store,
/// 5xxx filesystem, 6xxx VCS, 7xxx server, 8xxx env.
pub mod codes {
    pub const AUTH_INVALID_CREDENTIALS: u16 = 1001;
    pub const AUTH_TOKEN_EXPIRED: u16 = 1002;
    pub const AUTH_TOKEN_INVALID: u16 = 1003;
    pub const AUTH_FORBIDDEN: u16 = 1004;
    pub const AUTH_RATE_LIMITED: u16 = 1005;

    pub const VALIDATION_SLUG: u16 = 2001;
    pub const VALIDATION_SIZE: u16 = 2002;
    pub const VALIDATION_MIME: u16 = 2003;
    pub const VALIDATION_ENV_KEY: u16 = 2004;
    pub const VALIDATION_GENERAL: u16 = 2005;

    pub const APP_NOT_FOUND: u16 = 3001;
    pub const APP_SLUG_CONFLICT: u16 = 3002;
    pub const APP_FORBIDDEN_CODE: u16 = 3004;
    pub const APP_DEPLOY_FAILED: u16 = 3005;
    pub const APP_UPSTREAM_FAILED: u16 = 3006;
    pub const APP_UNSUPPORTED_OPERATION: u16 = 3007;

    pub const STORE_ERROR: u16 = 4001;
    pub const STORE_NOT_FOUND: u16 = 4002;

    pub const FS_ERROR: u16 = 5001;
    pub const FS_CONFLICT: u16 = 5002;

    pub const VCS_CLONE_FAILED: u16 = 6001;
    pub const VCS_INVALID_URL: u16 = 6002;
    pub const VCS_NOT_GIT_IMPORT: u16 = 6003;

    pub const SERVER_TIMEOUT: u16 = 7001;
    pub const SERVER_INTERNAL: u16 = 7002;
    pub const SERVER_UNAVAILABLE: u16 = 7003;

    pub const BACKUP_NOT_FOUND: u16 = 9001;
    pub const BACKUP_CONFLICT: u16 = 9002;
    pub const BACKUP_INVALID: u16 = 9003;
}

/// Distinguishes an error meant to reach the client (with a status and error code)
/// from one that must never leak its internal `Display` text.
#[derive(Debug, Error, Clone)]
pub enum FriendlyError<T>
where
    T: Serialize + Display,
{
    #[error("{2}")]
    UserFacing(StatusCode, u16, T),
    #[error("internal error")]
    Internal(String, T),
}

impl<T> FriendlyError<T>
where
    T: Serialize + Display,
{
    pub fn user_facing(severity: Level, status: StatusCode, code: u16, loc: &str, body: T) -> Self {
        Self::UserFacing(status, code, body).trace(severity, loc)
    }

    pub fn internal(loc: &str, body: T) -> Self {
        Self::Internal(loc.to_string(), body).trace(Level::ERROR, loc)
    }

    fn trace(self, severity: Level, loc: &str) -> Self {
        match &self {
            FriendlyError::UserFacing(status, code, body) => match severity {
                Level::ERROR => event!(Level::ERROR, %loc, %status, code, %body, "user-facing error"),
                Level::WARN => event!(Level::WARN, %loc, %status, code, %body, "user-facing error"),
                Level::INFO => event!(Level::INFO, %loc, %status, code, %body, "user-facing error"),
                Level::DEBUG => event!(Level::DEBUG, %loc, %status, code, %body, "user-facing error"),
                Level::TRACE => event!(Level::TRACE, %loc, %status, code, %body, "user-facing error"),
            },
            FriendlyError::Internal(_, body) => {
                event!(Level::ERROR, %loc, %body, "internal error");
            }
        }
        self
    }

    fn status_and_code(&self) -> (StatusCode, u16) {
        match self {
            FriendlyError::UserFacing(status, code, _) => (*status, *code),
            FriendlyError::Internal(_, _) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::SERVER_INTERNAL)
            }
        }
    }
}

impl<T> IntoResponse for FriendlyError<T>
where
    T: Serialize + Display,
{
    fn into_response(self) -> Response {
        let (status_code, code) = self.status_and_code();
        match self {
            FriendlyError::UserFacing(_, _, body) => ErrorResponse {
                status_code,
                code,
                message: body.to_string(),
                details: Some(body),
                request_id: Uuid::new_v4(),
            }
            .into_response(),
            FriendlyError::Internal(_, _) => ErrorResponse::<()> {
                status_code,
                code,
                message: "unexpected error".to_string(),
                details: None,
                request_id: Uuid::new_v4(),
            }
            .into_response(),
        }
    }
}

pub trait FormErrorResponse: Serialize + Display + Clone {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNPROCESSABLE_ENTITY
    }
    fn code(&self) -> u16 {
        codes::VALIDATION_GENERAL
    }
    fn global_message(&self) -> String {
        "one or more fields failed validation".to_string()
    }
    fn log_level(&self) -> Level {
        Level::DEBUG
    }
    fn into_error_response(self) -> Response {
        FriendlyError::user_facing(
            self.log_level(),
            self.status_code(),
            self.code(),
            file!(),
            FormError {
                message: self.global_message(),
                fields: self,
            },
        )
        .into_response()
    }
}

/// Errors surfaced by any repository-layer (`sqlx`-backed) component.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrate error: {0}")]
    Migrate(#[from] MigrateError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("custom error: {0}")]
    Custom(String),

    #[error("tenant pool not found")]
    TenantPoolNotFound,
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        if let RepositoryError::Database(sqlx::Error::Database(database_error)) = self {
            return database_error.is_unique_violation();
        }
        false
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound)
            || matches!(self, RepositoryError::Database(sqlx::Error::RowNotFound))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for FriendlyError<GeneralError> {
    fn from(e: RepositoryError) -> Self {
        if e.is_not_found() {
            FriendlyError::user_facing(
                Level::DEBUG,
                StatusCode::NOT_FOUND,
                codes::STORE_NOT_FOUND,
                file!(),
                GeneralError {
                    message: "resource not found".to_string(),
                },
            )
        } else if e.is_unique_violation() {
            FriendlyError::user_facing(
                Level::DEBUG,
                StatusCode::CONFLICT,
                codes::APP_SLUG_CONFLICT,
                file!(),
                GeneralError {
                    message: "resource already exists".to_string(),
                },
            )
        } else {
            FriendlyError::internal(
                file!(),
                GeneralError {
                    message: e.to_string(),
                },
            )
        }
    }
}
