// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Filesystem boundary used by the file tools.
//!
//! The engine talks to the filesystem through the [`FileManager`] trait so
//! tests and embedders can substitute their own implementation.
//! [`LocalFileManager`] is the default, backed by `tokio::fs` and `walkdir`.

use std::path::Path;

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::error::ToolError;

/// Capability contract for filesystem access.
#[async_trait]
pub trait FileManager: Send + Sync {
    /// Read the file at `path` as UTF-8 text.
    async fn read(&self, path: &Path) -> Result<String, ToolError>;

    /// Write `content` to `path`, creating parent directories as needed.
    async fn write(&self, path: &Path, content: &str) -> Result<(), ToolError>;

    /// Recursively list paths under `dir`, relative to `dir`, excluding
    /// `.git` trees. Directories are included.
    async fn list(&self, dir: &Path) -> Result<Vec<String>, ToolError>;

    /// Check whether `path` exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all of its parents.
    async fn create_dir_all(&self, path: &Path) -> Result<(), ToolError>;
}

/// Default [`FileManager`] backed by the local filesystem.
pub struct LocalFileManager;

#[async_trait]
impl FileManager for LocalFileManager {
    async fn read(&self, path: &Path) -> Result<String, ToolError> {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::FileNotFound(path.display().to_string())
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                ToolError::PermissionDenied(path.display().to_string())
            } else {
                ToolError::IoError(format!("failed to read {}: {e}", path.display()))
            }
        })
    }

    async fn write(&self, path: &Path, content: &str) -> Result<(), ToolError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::IoError(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(path, content).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ToolError::PermissionDenied(path.display().to_string())
            } else {
                ToolError::IoError(format!("failed to write {}: {e}", path.display()))
            }
        })
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>, ToolError> {
        let dir = dir.to_path_buf();
        // walkdir is blocking; keep it off the async executor
        tokio::task::spawn_blocking(move || list_relative(&dir))
            .await
            .map_err(|e| ToolError::IoError(format!("listing task failed: {e}")))?
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), ToolError> {
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            ToolError::IoError(format!("failed to create {}: {e}", path.display()))
        })
    }
}

fn list_relative(dir: &Path) -> Result<Vec<String>, ToolError> {
    if !dir.is_dir() {
        return Err(ToolError::FileNotFound(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != std::ffi::OsStr::new(".git"));

    for entry in walker {
        let entry = entry.map_err(|e| ToolError::IoError(format!("failed to walk: {e}")))?;
        if entry.depth() == 0 {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        entries.push(relative);
    }
    Ok(entries)
}
