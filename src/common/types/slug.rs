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

use crate::common::types::value_object::{ValueObject, ValueObjectable};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::sync::OnceLock;

const RESERVED: &[&str] = &[
    "api",
    "admin",
    "www",
    "ftp",
    "mail",
    "platformx",
    "platform",
    "dashboard",
    "console",
    "auth",
    "login",
    "logout",
    "register",
    "signup",
    "static",
    "assets",
    "public",
    "cdn",
    "blog",
    "localhost",
];

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap())
}

/// A tenant slug: the value object for the primary key of the Tenant Registry.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize)]
pub struct TenantSlug(pub String);

impl ValueObjectable for TenantSlug {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        let len = self.0.len();
        if !(3..=63).contains(&len) {
            return Err(format!(
                "slug must be between 3 and 63 characters, got {len}"
            ));
        }
        if self.0.contains("--") {
            return Err("slug must not contain '--'".to_string());
        }
        if !slug_regex().is_match(&self.0) {
            return Err("slug must match ^[a-z0-9]([a-z0-9-]*[a-z0-9])?$".to_string());
        }
        if RESERVED.contains(&self.0.as_str()) {
            return Err(format!("'{}' is a reserved slug", self.0));
        }
        Ok(())
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

impl TenantSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The per-tenant database namespace name: `app_` prefix, hyphens become underscores.
    pub fn db_namespace(&self) -> String {
        format!("app_{}", self.0.replace('-', "_"))
    }
}

impl Display for TenantSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ValueObject<TenantSlug> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ValueObject::new(TenantSlug(s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimum_length() {
        assert!(TenantSlug("abc".to_string()).validate().is_ok());
    }

    #[test]
    fn rejects_below_minimum_length() {
        assert!(TenantSlug("ab".to_string()).validate().is_err());
    }

    #[test]
    fn accepts_maximum_length() {
        let slug = "a".repeat(63);
        assert!(TenantSlug(slug).validate().is_ok());
    }

    #[test]
    fn rejects_above_maximum_length() {
        let slug = "a".repeat(64);
        assert!(TenantSlug(slug).validate().is_err());
    }

    #[test]
    fn rejects_double_hyphen() {
        assert!(TenantSlug("foo--bar".to_string()).validate().is_err());
    }

    #[test]
    fn rejects_reserved_words() {
        assert!(TenantSlug("admin".to_string()).validate().is_err());
    }

    #[test]
    fn rejects_uppercase() {
        assert!(TenantSlug("Shop".to_string()).validate().is_err());
    }

    #[test]
    fn db_namespace_replaces_hyphens() {
        let slug = TenantSlug("my-shop".to_string());
        assert_eq!(slug.db_namespace(), "app_my_shop");
    }
}
