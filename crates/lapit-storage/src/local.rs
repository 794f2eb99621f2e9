// Lapit - commit, staging and sync for small repositories
// Copyright (C) 2025 Lapit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Local filesystem storage backend
//!
//! Implements the `StorageBackend` trait on a directory tree:
//! - A key maps directly to a relative path, so `commits/<id>/a.txt`
//!   lives at `root/commits/<id>/a.txt`
//! - Writes go to a scratch file under `root/.lapit-tmp/` and are renamed
//!   into place, so readers never see partial objects
//! - Async I/O using tokio::fs
//!
//! # Examples
//!
//! ```rust,no_run
//! use lapit_storage::{StorageBackend, local::LocalBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = LocalBackend::new("/var/lib/lapit/objects").await?;
//!     storage.put("commits/abc/a.txt", b"file content").await?;
//!     let keys = storage.list_objects("commits/abc/").await?;
//!     assert_eq!(keys.len(), 1);
//!     Ok(())
//! }
//! ```

use crate::error::{validate_key, StorageError};
use crate::StorageBackend;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const SCRATCH_DIR: &str = ".lapit-tmp";

/// Local filesystem storage backend
#[derive(Clone)]
pub struct LocalBackend {
    root: PathBuf,
    scratch_seq: Arc<AtomicU64>,
}

impl LocalBackend {
    /// Create a new local filesystem backend at the given root path
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Fails if the root path exists but is not a directory, or cannot be created.
    pub async fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root).await?;
        } else if !root.is_dir() {
            return Err(StorageError::backend(format!(
                "path exists but is not a directory: {}",
                root.display()
            ))
            .into());
        }

        Ok(LocalBackend {
            root,
            scratch_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get the root path for this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn scratch_path(&self) -> PathBuf {
        let seq = self.scratch_seq.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(SCRATCH_DIR)
            .join(format!("{}-{}", std::process::id(), seq))
    }

    /// Recursively collect keys under `dir`, skipping the scratch area.
    async fn walk(&self, dir: PathBuf, results: &mut Vec<String>) -> anyhow::Result<()> {
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if path != self.root.join(SCRATCH_DIR) {
                        pending.push(path);
                    }
                } else if file_type.is_file() {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/");
                        results.push(key);
                    }
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        validate_key(key)?;

        match fs::read(self.object_path(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        validate_key(key)?;

        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.scratch_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        validate_key(key)?;
        Ok(fs::try_exists(self.object_path(key)).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        validate_key(key)?;

        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        // Start the walk at the deepest directory the prefix fully names.
        let start = match prefix.rfind('/') {
            Some(idx) => self.object_path(&prefix[..idx]),
            None => self.root.clone(),
        };

        let mut results = Vec::new();
        self.walk(start, &mut results).await?;
        results.retain(|key| key.starts_with(prefix));
        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_not_found;
    use tempfile::TempDir;

    async fn backend() -> (TempDir, LocalBackend) {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path()).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_put_get_maps_key_to_path() {
        let (dir, backend) = backend().await;

        backend.put("commits/abc/a.txt", b"hello").await.unwrap();
        assert_eq!(backend.get("commits/abc/a.txt").await.unwrap(), b"hello");
        assert!(dir.path().join("commits").join("abc").join("a.txt").is_file());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, backend) = backend().await;
        let err = backend.get("commits/none/a.txt").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, backend) = backend().await;
        assert!(backend.put("../escape.txt", b"x").await.is_err());
        assert!(backend.get("commits/../../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_list_objects_recursive_and_sorted() {
        let (_dir, backend) = backend().await;

        backend.put("commits/b/2.txt", b"2").await.unwrap();
        backend.put("commits/a/1.txt", b"1").await.unwrap();
        backend.put("commits/a/commit.json", b"{}").await.unwrap();
        backend.put("elsewhere.txt", b"e").await.unwrap();

        let all = backend.list_objects("commits/").await.unwrap();
        assert_eq!(
            all,
            vec!["commits/a/1.txt", "commits/a/commit.json", "commits/b/2.txt"]
        );

        let one = backend.list_objects("commits/a/").await.unwrap();
        assert_eq!(one.len(), 2);

        let everything = backend.list_objects("").await.unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (_dir, backend) = backend().await;
        assert!(backend.list_objects("commits/zzz/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_and_delete() {
        let (_dir, backend) = backend().await;

        backend.put("k/v", b"old").await.unwrap();
        backend.put("k/v", b"new").await.unwrap();
        assert_eq!(backend.get("k/v").await.unwrap(), b"new");

        backend.delete("k/v").await.unwrap();
        assert!(!backend.exists("k/v").await.unwrap());
        backend.delete("k/v").await.unwrap();
    }
}
