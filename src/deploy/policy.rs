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

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySeverity {
    Error,
    Warn,
}

/// Packages this front-door refuses to host (the tenant would try to bind
/// its own port or shell out in ways the front-door already owns) and
/// packages it merely flags (deprecated, commonly misconfigured).
const FORBIDDEN: &[&str] = &["pm2", "forever", "nodemon"];
const DEPRECATED: &[&str] = &["request", "node-sass", "left-pad"];

#[derive(Debug, Clone)]
pub struct PolicyViolation {
    pub package: String,
    pub severity: PolicySeverity,
    pub reason: String,
}

/// Scans a staged tree's `package.json` dependencies against the forbidden /
/// deprecated table (§4.5). Missing or unparsable manifests produce no
/// violations — kind detection already treats that tree as plain backend.
pub fn check_dependencies(dir: &Path) -> Vec<PolicyViolation> {
    let Ok(raw) = std::fs::read_to_string(dir.join("package.json")) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return Vec::new();
    };

    let mut deps = Vec::new();
    for field in ["dependencies", "devDependencies"] {
        if let Some(obj) = value.get(field).and_then(|v| v.as_object()) {
            deps.extend(obj.keys().cloned());
        }
    }

    let mut violations = Vec::new();
    for dep in &deps {
        if FORBIDDEN.contains(&dep.as_str()) {
            violations.push(PolicyViolation {
                package: dep.clone(),
                severity: PolicySeverity::Error,
                reason: format!("'{dep}' manages its own process lifecycle; the front-door owns that"),
            });
        } else if DEPRECATED.contains(&dep.as_str()) {
            violations.push(PolicyViolation {
                package: dep.clone(),
                severity: PolicySeverity::Warn,
                reason: format!("'{dep}' is deprecated upstream"),
            });
        }
    }
    violations
}

pub fn has_blocking_violation(violations: &[PolicyViolation]) -> bool {
    violations.iter().any(|v| v.severity == PolicySeverity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_package_is_error_severity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"pm2":"5.0.0"}}"#,
        )
        .unwrap();
        let violations = check_dependencies(dir.path());
        assert_eq!(violations.len(), 1);
        assert!(has_blocking_violation(&violations));
    }

    #[test]
    fn deprecated_package_is_warn_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"request":"2.88.0"}}"#,
        )
        .unwrap();
        let violations = check_dependencies(dir.path());
        assert_eq!(violations.len(), 1);
        assert!(!has_blocking_violation(&violations));
    }

    #[test]
    fn missing_manifest_has_no_violations() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_dependencies(dir.path()).is_empty());
    }
}
