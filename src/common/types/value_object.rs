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

use serde::Serialize;
use std::fmt::Display;

/// A type that knows how to validate itself and expose its inner value.
pub trait ValueObjectable {
    type DataType;

    fn validate(&self) -> Result<(), String>;
    fn get_value(&self) -> &Self::DataType;
}

/// Wraps a `ValueObjectable` so construction and validation can never be separated.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ValueObject<T>(T)
where
    T: ValueObjectable;

impl<T> ValueObject<T>
where
    T: ValueObjectable,
{
    pub fn new(inner: T) -> Result<Self, String> {
        inner.validate()?;
        Ok(Self(inner))
    }

    pub fn extract(&self) -> &T {
        &self.0
    }
}

impl<T> Display for ValueObject<T>
where
    T: ValueObjectable,
    T::DataType: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Serialize)]
    struct Positive(i32);

    impl ValueObjectable for Positive {
        type DataType = i32;

        fn validate(&self) -> Result<(), String> {
            if self.0 > 0 {
                Ok(())
            } else {
                Err("must be positive".to_string())
            }
        }

        fn get_value(&self) -> &Self::DataType {
            &self.0
        }
    }

    #[test]
    fn rejects_invalid_inner_value() {
        assert!(ValueObject::new(Positive(-1)).is_err());
    }

    #[test]
    fn accepts_valid_inner_value() {
        assert!(ValueObject::new(Positive(1)).is_ok());
    }
}
