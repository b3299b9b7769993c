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

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvStoreError {
    #[error("invalid env key: {0}")]
    InvalidKey(String),
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

pub type EnvStoreResult<T> = Result<T, EnvStoreError>;

/// Reads and rewrites a single tenant's `.env` file (§4.3). Pure filesystem
/// I/O, no database involvement — the per-tenant env lives alongside the
/// tenant's own code under `<APPS_ROOT>/<slug>/.env`.
pub struct EnvStore {
    apps_root: PathBuf,
}

impl EnvStore {
    pub fn new(apps_root: PathBuf) -> Self {
        Self { apps_root }
    }

    fn env_path(&self, slug: &str) -> PathBuf {
        self.apps_root.join(slug).join(".env")
    }

    fn validate_key(key: &str) -> EnvStoreResult<()> {
        let valid = key.starts_with(|c: char| c.is_ascii_uppercase() || c == '_')
            && key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if valid && !key.is_empty() {
            Ok(())
        } else {
            Err(EnvStoreError::InvalidKey(key.to_string()))
        }
    }

    /// Returns an empty map when the file does not exist, per §4.3.
    pub async fn load(&self, slug: &str) -> EnvStoreResult<BTreeMap<String, String>> {
        let path = self.env_path(slug);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(parse_dotenv(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whole-file replace.
    pub async fn save(&self, slug: &str, map: &BTreeMap<String, String>) -> EnvStoreResult<()> {
        for key in map.keys() {
            Self::validate_key(key)?;
        }
        let path = self.env_path(slug);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, render_dotenv(map)).await?;
        Ok(())
    }

    /// Union of the existing file and `patch`; patch entries win on conflict.
    pub async fn merge(&self, slug: &str, patch: &BTreeMap<String, String>) -> EnvStoreResult<BTreeMap<String, String>> {
        for key in patch.keys() {
            Self::validate_key(key)?;
        }
        let mut current = self.load(slug).await?;
        for (k, v) in patch {
            current.insert(k.clone(), v.clone());
        }
        self.save(slug, &current).await?;
        Ok(current)
    }

    pub async fn delete_keys(&self, slug: &str, keys: &[String]) -> EnvStoreResult<BTreeMap<String, String>> {
        let mut current = self.load(slug).await?;
        for key in keys {
            current.remove(key);
        }
        self.save(slug, &current).await?;
        Ok(current)
    }

    pub async fn delete_file(&self, slug: &str) -> EnvStoreResult<()> {
        let path = self.env_path(slug);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn needs_quoting(value: &str) -> bool {
    value.chars().any(|c| c.is_whitespace() || c == '#')
}

fn render_dotenv(map: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        if needs_quoting(value) {
            out.push_str(key);
            out.push('=');
            out.push('"');
            out.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
            out.push_str("\"\n");
        } else {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

fn parse_dotenv(contents: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, rest)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if EnvStore::validate_key(key).is_err() {
            continue;
        }
        let value = unquote(rest.trim());
        map.insert(key.to_string(), value);
    }
    map
}

fn unquote(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        raw[1..raw.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_returns_empty_map_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let map = store.load("nonexistent").await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("shop")).await.unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let mut map = BTreeMap::new();
        map.insert("DATABASE_URL".to_string(), "postgres://x".to_string());
        map.insert("GREETING".to_string(), "hello world".to_string());
        store.save("shop", &map).await.unwrap();

        let loaded = store.load("shop").await.unwrap();
        assert_eq!(loaded.get("DATABASE_URL").unwrap(), "postgres://x");
        assert_eq!(loaded.get("GREETING").unwrap(), "hello world");
    }

    #[tokio::test]
    async fn values_with_whitespace_are_quoted_on_write() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("shop")).await.unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let mut map = BTreeMap::new();
        map.insert("GREETING".to_string(), "hello world".to_string());
        store.save("shop", &map).await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join("shop/.env")).await.unwrap();
        assert_eq!(raw.trim(), r#"GREETING="hello world""#);
    }

    #[tokio::test]
    async fn merge_patch_wins_over_existing() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("shop")).await.unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), "1".to_string());
        store.save("shop", &map).await.unwrap();

        let mut patch = BTreeMap::new();
        patch.insert("A".to_string(), "2".to_string());
        patch.insert("B".to_string(), "3".to_string());
        let merged = store.merge("shop", &patch).await.unwrap();
        assert_eq!(merged.get("A").unwrap(), "2");
        assert_eq!(merged.get("B").unwrap(), "3");
    }

    #[tokio::test]
    async fn delete_keys_removes_only_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("shop")).await.unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), "1".to_string());
        map.insert("B".to_string(), "2".to_string());
        store.save("shop", &map).await.unwrap();

        let remaining = store.delete_keys("shop", &["A".to_string()]).await.unwrap();
        assert!(!remaining.contains_key("A"));
        assert_eq!(remaining.get("B").unwrap(), "2");
    }

    #[tokio::test]
    async fn save_rejects_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("shop")).await.unwrap();
        let store = EnvStore::new(dir.path().to_path_buf());
        let mut map = BTreeMap::new();
        map.insert("not-a-key".to_string(), "x".to_string());
        assert!(store.save("shop", &map).await.is_err());
    }
}
