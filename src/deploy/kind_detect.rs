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

use crate::registry::model::TenantKind;
use std::path::Path;

const FRONTEND_LIBS: &[&str] = &["react", "vue", "@angular/core", "svelte"];
const META_FRAMEWORKS: &[&str] = &["next", "nuxt"];
const SERVER_LIBS: &[&str] = &["express", "fastify", "koa", "hapi"];
const ENTRY_CANDIDATES: &[&str] = &["server.js", "app.js", "index.js", "main.js"];
const BUILD_OUTPUT_CANDIDATES: &[&str] = &["dist", "build", "out", ".next", "public", "www", "_site"];

struct Manifest {
    deps: Vec<String>,
    has_build_script: bool,
}

fn read_manifest(dir: &Path) -> Option<Manifest> {
    let raw = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;

    let mut deps = Vec::new();
    for field in ["dependencies", "devDependencies"] {
        if let Some(obj) = value.get(field).and_then(|v| v.as_object()) {
            deps.extend(obj.keys().cloned());
        }
    }

    let has_build_script = value
        .get("scripts")
        .and_then(|s| s.get("build"))
        .is_some();

    Some(Manifest {
        deps,
        has_build_script,
    })
}

fn has_any(deps: &[String], candidates: &[&str]) -> bool {
    candidates.iter().any(|c| deps.iter().any(|d| d == c))
}

/// Auto-detects a tenant's kind from its staged source tree (§4.5), priority
/// order: meta-framework, frontend+server combo, frontend+build, server/entry
/// file, bare build script, default backend.
pub fn detect_kind(dir: &Path) -> TenantKind {
    let Some(manifest) = read_manifest(dir) else {
        return TenantKind::Backend;
    };

    if has_any(&manifest.deps, META_FRAMEWORKS) {
        return TenantKind::Fullstack;
    }
    let has_frontend = has_any(&manifest.deps, FRONTEND_LIBS);
    let has_server = has_any(&manifest.deps, SERVER_LIBS);
    if has_frontend && has_server {
        return TenantKind::Fullstack;
    }
    if has_frontend && manifest.has_build_script {
        return TenantKind::Frontend;
    }
    if has_server || ENTRY_CANDIDATES.iter().any(|c| dir.join(c).is_file()) {
        return TenantKind::Backend;
    }
    if manifest.has_build_script {
        return TenantKind::Frontend;
    }
    TenantKind::Backend
}

/// Finds the first recognized entry file candidate present in `dir`.
pub fn detect_entry_path(dir: &Path) -> Option<String> {
    ENTRY_CANDIDATES
        .iter()
        .find(|c| dir.join(c).is_file())
        .map(|c| c.to_string())
}

/// First existing build-output candidate that also contains an `index.html` (§4.5).
pub fn detect_build_output_dir(dir: &Path) -> Option<String> {
    BUILD_OUTPUT_CANDIDATES
        .iter()
        .find(|candidate| dir.join(candidate).join("index.html").is_file())
        .map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, json: &str) {
        std::fs::write(dir.join("package.json"), json).unwrap();
    }

    #[test]
    fn next_dependency_is_fullstack() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"{"dependencies":{"next":"14.0.0"}}"#);
        assert_eq!(detect_kind(dir.path()), TenantKind::Fullstack);
    }

    #[test]
    fn react_plus_express_is_fullstack() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"dependencies":{"react":"18.0.0","express":"4.0.0"}}"#,
        );
        assert_eq!(detect_kind(dir.path()), TenantKind::Fullstack);
    }

    #[test]
    fn react_with_build_script_is_frontend() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"dependencies":{"react":"18.0.0"},"scripts":{"build":"vite build"}}"#,
        );
        assert_eq!(detect_kind(dir.path()), TenantKind::Frontend);
    }

    #[test]
    fn express_alone_is_backend() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"{"dependencies":{"express":"4.0.0"}}"#);
        assert_eq!(detect_kind(dir.path()), TenantKind::Backend);
    }

    #[test]
    fn no_manifest_with_entry_file_is_backend() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server.js"), "module.exports = () => {};").unwrap();
        assert_eq!(detect_kind(dir.path()), TenantKind::Backend);
    }

    #[test]
    fn build_output_requires_index_html() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dist")).unwrap();
        assert_eq!(detect_build_output_dir(dir.path()), None);
        std::fs::write(dir.path().join("dist/index.html"), "<html></html>").unwrap();
        assert_eq!(detect_build_output_dir(dir.path()), Some("dist".to_string()));
    }
}
