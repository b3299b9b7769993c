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

use crate::common::types::slug::TenantSlug;
use crate::common::types::value_object::ValueObjectable;

/// Result of resolving an HTTP `Host` header against the platform apex (§4.1).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum HostResolution {
    /// The apex host itself: route to the admin API.
    Platform,
    /// A recognized tenant subdomain.
    App(TenantSlug),
    /// Neither the apex nor a well-formed tenant subdomain: 404 at the edge.
    Reject,
}

/// Splits a request host (possibly `host:port`) into a [`HostResolution`]
/// against the configured apex (e.g. `platformx.localhost`).
///
/// Pure and I/O-free by design so every boundary case in §8 is a unit test.
pub fn resolve(host: &str, apex: &str) -> HostResolution {
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let apex = apex.to_ascii_lowercase();

    if host == apex {
        return HostResolution::Platform;
    }

    let suffix = format!(".{apex}");
    let Some(candidate) = host.strip_suffix(&suffix) else {
        return HostResolution::Reject;
    };
    if candidate.is_empty() {
        return HostResolution::Reject;
    }

    match TenantSlug(candidate.to_string()).validate() {
        Ok(()) => HostResolution::App(TenantSlug(candidate.to_string())),
        Err(_) => HostResolution::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APEX: &str = "platformx.localhost";

    #[test]
    fn apex_alone_resolves_to_platform() {
        assert_eq!(resolve(APEX, APEX), HostResolution::Platform);
    }

    #[test]
    fn apex_with_port_resolves_to_platform() {
        assert_eq!(resolve(&format!("{APEX}:5000"), APEX), HostResolution::Platform);
    }

    #[test]
    fn valid_subdomain_resolves_to_app() {
        assert_eq!(
            resolve(&format!("shop.{APEX}"), APEX),
            HostResolution::App(TenantSlug("shop".to_string()))
        );
    }

    #[test]
    fn subdomain_is_lowercased() {
        assert_eq!(
            resolve(&format!("Shop.{APEX}"), APEX),
            HostResolution::App(TenantSlug("shop".to_string()))
        );
    }

    #[test]
    fn double_hyphen_slug_is_rejected() {
        assert_eq!(resolve(&format!("foo--bar.{APEX}"), APEX), HostResolution::Reject);
    }

    #[test]
    fn unrelated_host_is_rejected() {
        assert_eq!(resolve("example.com", APEX), HostResolution::Reject);
    }

    #[test]
    fn empty_subdomain_label_is_rejected() {
        assert_eq!(resolve(&format!(".{APEX}"), APEX), HostResolution::Reject);
    }

    #[test]
    fn reserved_slug_is_rejected() {
        assert_eq!(resolve(&format!("admin.{APEX}"), APEX), HostResolution::Reject);
    }
}
