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

use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive exceeds the {0} byte limit")]
    TooLarge(u64),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip entry escapes the extraction root")]
    PathTraversal,
}

/// Extracts `archive_path` into `dest`, enforcing the size cap before reading
/// a single byte of entry data, then flattens one level if extraction
/// produced exactly one top-level directory (§4.5).
pub fn extract(archive_path: &Path, dest: &Path, max_bytes: u64) -> Result<(), ArchiveError> {
    let file_len = std::fs::metadata(archive_path)?.len();
    if file_len > max_bytes {
        return Err(ArchiveError::TooLarge(max_bytes));
    }

    std::fs::create_dir_all(dest)?;
    let file = File::open(archive_path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::PathTraversal);
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }

    flatten_single_top_level(dest)?;
    Ok(())
}

/// If `dir` contains exactly one entry and it is a directory, moves that
/// directory's contents up one level and removes the now-empty wrapper.
fn flatten_single_top_level(dir: &Path) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    if entries.len() != 1 || !entries[0].is_dir() {
        return Ok(());
    }

    let wrapper = entries.remove(0);
    for child in std::fs::read_dir(&wrapper)? {
        let child = child?.path();
        let target = dir.join(child.file_name().unwrap());
        std::fs::rename(&child, &target)?;
    }
    std::fs::remove_dir(&wrapper)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_flat_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("app.zip");
        build_zip(&zip_path, &[("server.js", b"module.exports = () => {};")]);

        let out = dir.path().join("out");
        extract(&zip_path, &out, 50 * 1024 * 1024).unwrap();
        assert!(out.join("server.js").is_file());
    }

    #[test]
    fn flattens_single_top_level_directory() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("app.zip");
        build_zip(
            &zip_path,
            &[("myapp/server.js", b"module.exports = () => {};")],
        );

        let out = dir.path().join("out");
        extract(&zip_path, &out, 50 * 1024 * 1024).unwrap();
        assert!(out.join("server.js").is_file());
        assert!(!out.join("myapp").exists());
    }

    #[test]
    fn rejects_archive_over_the_byte_cap() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("app.zip");
        build_zip(&zip_path, &[("server.js", &vec![0u8; 4096])]);

        let out = dir.path().join("out");
        let result = extract(&zip_path, &out, 10);
        assert!(matches!(result, Err(ArchiveError::TooLarge(_))));
    }
}
