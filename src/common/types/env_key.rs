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

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap())
}

/// A per-tenant `.env` variable name.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize)]
pub struct EnvKey(pub String);

impl ValueObjectable for EnvKey {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        if key_regex().is_match(&self.0) {
            Ok(())
        } else {
            Err(format!(
                "env key '{}' must match ^[A-Z_][A-Z0-9_]*$",
                self.0
            ))
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

impl EnvKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EnvKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ValueObject<EnvKey> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ValueObject::new(EnvKey(s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_leading_digit() {
        assert!(EnvKey("0ABC".to_string()).validate().is_err());
    }

    #[test]
    fn accepts_trailing_digit() {
        assert!(EnvKey("ABC_0".to_string()).validate().is_ok());
    }

    #[test]
    fn rejects_lowercase() {
        assert!(EnvKey("abc".to_string()).validate().is_err());
    }

    #[test]
    fn accepts_leading_underscore() {
        assert!(EnvKey("_PRIVATE".to_string()).validate().is_ok());
    }
}
