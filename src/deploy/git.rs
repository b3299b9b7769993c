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
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("'{0}' is not a supported repository URL")]
    InvalidUrl(String),
    #[error("git clone timed out")]
    Timeout,
    #[error("git clone failed: {0}")]
    CloneFailed(String),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

const ALLOWED_PREFIXES: &[&str] = &["https://", "http://", "git://", "git@"];

pub fn validate_url(url: &str) -> Result<(), GitError> {
    if ALLOWED_PREFIXES.iter().any(|p| url.starts_with(p)) {
        Ok(())
    } else {
        Err(GitError::InvalidUrl(url.to_string()))
    }
}

/// Injects a platform-wide token into the URL for a small set of supported
/// hosts (§4.5). Only applies to `https://` URLs; anything else is returned
/// unchanged since token injection into SSH or bare `git://` URLs makes no
/// sense.
pub fn inject_token(url: &str, token: Option<&str>) -> String {
    let Some(token) = token else {
        return url.to_string();
    };
    let Some(rest) = url.strip_prefix("https://") else {
        return url.to_string();
    };
    let supported = ["github.com", "gitlab.com", "bitbucket.org"];
    if supported.iter().any(|host| rest.starts_with(host)) {
        format!("https://{token}@{rest}")
    } else {
        url.to_string()
    }
}

/// Shallow, single-branch clone via the `git` binary (§9's subprocess design
/// note extends to the build tooling itself, not just tenant execution).
pub async fn shallow_clone(
    url: &str,
    branch: Option<&str>,
    dest: &Path,
    timeout: std::time::Duration,
) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("clone")
        .arg("--depth=1")
        .arg("--single-branch");
    if let Some(branch) = branch {
        cmd.arg("--branch").arg(branch);
    }
    cmd.arg(url)
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let child = cmd.spawn()?;
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| GitError::Timeout)??;

    if !output.status.success() {
        return Err(GitError::CloneFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let git_dir = dest.join(".git");
    if git_dir.exists() {
        std::fs::remove_dir_all(git_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_url() {
        assert!(validate_url("https://example.com/x.git").is_ok());
    }

    #[test]
    fn accepts_ssh_style_url() {
        assert!(validate_url("git@github.com:user/repo.git").is_ok());
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(validate_url("ftp://example.com/x.git").is_err());
    }

    #[test]
    fn injects_token_for_supported_host() {
        let url = inject_token("https://github.com/user/repo.git", Some("tok123"));
        assert_eq!(url, "https://tok123@github.com/user/repo.git");
    }

    #[test]
    fn leaves_unsupported_host_unchanged() {
        let url = inject_token("https://example.invalid/x.git", Some("tok123"));
        assert_eq!(url, "https://example.invalid/x.git");
    }

    #[test]
    fn leaves_ssh_url_unchanged_even_with_token() {
        let url = inject_token("git@github.com:user/repo.git", Some("tok123"));
        assert_eq!(url, "git@github.com:user/repo.git");
    }

    #[test]
    fn no_token_configured_returns_url_unchanged() {
        let url = inject_token("https://github.com/user/repo.git", None);
        assert_eq!(url, "https://github.com/user/repo.git");
    }
}
