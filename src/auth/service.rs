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
use crate::auth::dto::{LoginRequest, LoginResponse, VerifyResponse};
use crate::auth::rate_limit::LoginRateLimiter;
use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, codes};
use crate::manager::app::config::AppConfig;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::http::StatusCode;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many login attempts")]
    RateLimited,
    #[error("token expired or invalid")]
    InvalidToken,
    #[error("hashing error: {0}")]
    Hash(String),
}

impl From<AuthServiceError> for FriendlyError<GeneralError> {
    fn from(e: AuthServiceError) -> Self {
        let (status, code) = match &e {
            AuthServiceError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, codes::AUTH_INVALID_CREDENTIALS)
            }
            AuthServiceError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, codes::AUTH_RATE_LIMITED),
            AuthServiceError::InvalidToken => (StatusCode::UNAUTHORIZED, codes::AUTH_TOKEN_INVALID),
            AuthServiceError::Hash(_) => {
                return FriendlyError::internal(
                    file!(),
                    GeneralError {
                        message: e.to_string(),
                    },
                );
            }
        };
        FriendlyError::user_facing(
            Level::DEBUG,
            status,
            code,
            file!(),
            GeneralError {
                message: e.to_string(),
            },
        )
    }
}

/// Holds the bootstrap operator credential (hashed once at startup, never the
/// plaintext from config) and issues/validates JWTs for the single operator
/// realm. There is no user table: §1 scopes the auth/JWT issuer's own identity
/// store out as "this crate's own admin API", one operator account.
pub struct AuthService {
    config: Arc<AppConfig>,
    admin_password_hash: String,
    rate_limiter: LoginRateLimiter,
}

impl AuthService {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, AuthServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        let admin_password_hash = Argon2::default()
            .hash_password(config.auth().bootstrap_admin_password().as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthServiceError::Hash(e.to_string()))?;
        Ok(Self {
            config,
            admin_password_hash,
            rate_limiter: LoginRateLimiter::default(),
        })
    }

    pub fn login(
        &self,
        payload: &LoginRequest,
        ip: IpAddr,
    ) -> Result<LoginResponse, AuthServiceError> {
        if !self.rate_limiter.check_and_record(ip) {
            return Err(AuthServiceError::RateLimited);
        }

        if payload.email != self.config.auth().bootstrap_admin_email() {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let parsed_hash = PasswordHash::new(&self.admin_password_hash)
            .map_err(|e| AuthServiceError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthServiceError::InvalidCredentials)?;

        let claims = Claims::new(
            &payload.email,
            self.config.auth().jwt_issuer(),
            self.config.auth().jwt_audience(),
            self.config.auth().jwt_expiration_mins(),
        );
        let token = claims
            .to_token(self.config.auth().jwt_secret().as_bytes())
            .map_err(|e| AuthServiceError::Hash(e.to_string()))?;

        Ok(LoginResponse {
            token,
            expires_at: claims.exp,
        })
    }

    pub fn verify(&self, token: &str) -> Result<VerifyResponse, AuthServiceError> {
        let claims = Claims::from_token(
            token,
            self.config.auth().jwt_secret().as_bytes(),
            self.config.auth().jwt_issuer(),
            self.config.auth().jwt_audience(),
        )
        .map_err(|_| AuthServiceError::InvalidToken)?;
        Ok(VerifyResponse {
            sub: claims.sub,
            exp: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::app::config::AppConfig;

    fn sample_config() -> Arc<AppConfig> {
        let raw = r#"
            [server]
            host = "0.0.0.0"
            port = 5000
            apex_host = "platformx.localhost"
            mode = "development"

            [database]
            host = "localhost"
            port = 5432
            user = "platformx"
            password = "secret"
            main_database = "platformx"
            max_pool_size = 5

            [auth]
            jwt_secret = "dev-secret"
            jwt_expiration_mins = 60
            jwt_issuer = "platformx"
            jwt_audience = "platformx-admin"
            bootstrap_admin_email = "admin@platformx.localhost"
            bootstrap_admin_password = "changeme"

            [platform]
            apps_root = "./apps"
            backups_root = "./backups"
            uploads_root = "./uploads"
            logs_root = "./logs"
            idle_evict_threshold_mins = 15
            idle_sweep_interval_mins = 10
            temp_cleanup_interval_hours = 6
            temp_max_age_hours = 24

            [build]
            build_timeout_mins = 10
            install_timeout_mins = 5
            clone_timeout_secs = 60
            max_archive_mb = 50

            [webhook]
            enabled = true
            timeout_secs = 5
        "#;
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap();
        Arc::new(config.try_deserialize().unwrap())
    }

    #[test]
    fn accepts_correct_bootstrap_credentials() {
        let service = AuthService::new(sample_config()).unwrap();
        let result = service.login(
            &LoginRequest {
                email: "admin@platformx.localhost".to_string(),
                password: "changeme".to_string(),
            },
            IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_wrong_password() {
        let service = AuthService::new(sample_config()).unwrap();
        let result = service.login(
            &LoginRequest {
                email: "admin@platformx.localhost".to_string(),
                password: "wrong".to_string(),
            },
            IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 2)),
        );
        assert!(matches!(result, Err(AuthServiceError::InvalidCredentials)));
    }

    #[test]
    fn verify_round_trips_a_freshly_issued_token() {
        let service = AuthService::new(sample_config()).unwrap();
        let login = service
            .login(
                &LoginRequest {
                    email: "admin@platformx.localhost".to_string(),
                    password: "changeme".to_string(),
                },
                IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 3)),
            )
            .unwrap();
        let verified = service.verify(&login.token).unwrap();
        assert_eq!(verified.sub, "admin@platformx.localhost");
    }

    #[test]
    fn sixth_attempt_within_window_is_rate_limited() {
        let service = AuthService::new(sample_config()).unwrap();
        let ip = IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 4));
        for _ in 0..5 {
            let _ = service.login(
                &LoginRequest {
                    email: "admin@platformx.localhost".to_string(),
                    password: "wrong".to_string(),
                },
                ip,
            );
        }
        let result = service.login(
            &LoginRequest {
                email: "admin@platformx.localhost".to_string(),
                password: "changeme".to_string(),
            },
            ip,
        );
        assert!(matches!(result, Err(AuthServiceError::RateLimited)));
    }
}
