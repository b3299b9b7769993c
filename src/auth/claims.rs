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

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims for the platform's single operator realm (§6: "this crate *is* the
/// JWT issuer for its own admin API"). There is no per-tenant claim — the
/// admin API authenticates one operator identity, not a tenant-scoped user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the operator identifier (bootstrap admin's email).
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: &str, issuer: &str, audience: &str, expiration_mins: u32) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: subject.to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::minutes(expiration_mins as i64)).timestamp(),
        }
    }

    pub fn to_token(&self, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret))
    }

    pub fn from_token(
        token: &str,
        secret: &[u8],
        issuer: &str,
        audience: &str,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Ok(decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let claims = Claims::new("admin@platformx.localhost", "platformx", "platformx-admin", 60);
        let token = claims.to_token(b"secret").unwrap();
        let decoded = Claims::from_token(&token, b"secret", "platformx", "platformx-admin").unwrap();
        assert_eq!(decoded.sub, "admin@platformx.localhost");
    }

    #[test]
    fn rejects_token_signed_with_different_secret() {
        let claims = Claims::new("admin@platformx.localhost", "platformx", "platformx-admin", 60);
        let token = claims.to_token(b"secret").unwrap();
        assert!(Claims::from_token(&token, b"other", "platformx", "platformx-admin").is_err());
    }

    #[test]
    fn rejects_wrong_audience() {
        let claims = Claims::new("admin@platformx.localhost", "platformx", "platformx-admin", 60);
        let token = claims.to_token(b"secret").unwrap();
        assert!(Claims::from_token(&token, b"secret", "platformx", "someone-else").is_err());
    }
}
