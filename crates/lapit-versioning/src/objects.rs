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

//! Commit-aware adapter over a [`StorageBackend`]
//!
//! Blobs live at `commits/{commitId}/{filename}`. The adapter owns that key
//! scheme, fans uploads out concurrently, and turns backend failures into
//! the [`Error`] taxonomy.
//!
//! # Examples
//!
//! ```no_run
//! use lapit_storage::mock::MockBackend;
//! use lapit_versioning::{CommitId, FileBlob, ObjectStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> lapit_versioning::Result<()> {
//! let store = ObjectStore::new(Arc::new(MockBackend::new()));
//! let id = CommitId::generate();
//!
//! store.put_objects(&id, &[FileBlob::new("a.txt", "hello")]).await?;
//! let files = store.fetch_commit(&id).await?;
//! assert_eq!(files[0].content, b"hello");
//! # Ok(())
//! # }
//! ```

use crate::blob::{commit_key, commit_prefix, FileBlob};
use crate::error::{Error, Result};
use crate::id::{validate_filename, CommitId};
use futures::future::join_all;
use lapit_storage::StorageBackend;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a best-effort bulk delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Keys that were deleted (or already absent)
    pub deleted: Vec<String>,
    /// Keys whose deletion failed
    pub failed: Vec<String>,
}

impl DeleteReport {
    /// Check if every key was deleted
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Object store adapter for commit blobs
#[derive(Debug, Clone)]
pub struct ObjectStore {
    backend: Arc<dyn StorageBackend>,
}

impl ObjectStore {
    /// Wrap a storage backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// The underlying backend
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Upload every file of a commit concurrently
    ///
    /// Uploads are independent: one failure does not cancel the others, and
    /// objects already written stay written.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a bad filename or duplicate names, before
    /// any upload starts. [`Error::Storage`] if any upload failed, with
    /// `failed_keys` naming each one.
    pub async fn put_objects(&self, id: &CommitId, files: &[FileBlob]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for file in files {
            validate_filename(&file.filename)?;
            if !seen.insert(file.filename.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate filename in commit: {}",
                    file.filename
                )));
            }
        }

        let uploads = files.iter().map(|file| {
            let key = commit_key(id, &file.filename);
            async move {
                let result = self.backend.put(&key, &file.content).await;
                (key, result)
            }
        });

        let mut failed_keys = Vec::new();
        let mut first_error = None;
        for (key, result) in join_all(uploads).await {
            match result {
                Ok(()) => debug!(key = %key, "Uploaded object"),
                Err(e) => {
                    warn!(key = %key, error = %format!("{e:#}"), "Object upload failed");
                    first_error.get_or_insert_with(|| format!("{e:#}"));
                    failed_keys.push(key);
                }
            }
        }

        if failed_keys.is_empty() {
            return Ok(());
        }

        failed_keys.sort();
        Err(Error::Storage {
            message: format!(
                "{} of {} uploads failed for commit {}: {}",
                failed_keys.len(),
                files.len(),
                id,
                first_error.unwrap_or_default()
            ),
            failed_keys,
        })
    }

    /// All keys starting with `prefix`, sorted
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        self.backend
            .list_objects(prefix)
            .await
            .map_err(|e| Error::from_backend(&e))
    }

    /// Filenames stored for a commit, sorted
    pub async fn list_commit(&self, id: &CommitId) -> Result<Vec<String>> {
        let prefix = commit_prefix(id);
        Ok(self
            .list_objects(&prefix)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .collect())
    }

    /// Fetch one object
    ///
    /// # Errors
    ///
    /// [`Error::ObjectNotFound`] if the key doesn't exist.
    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        match self.backend.get(key).await {
            Ok(data) => Ok(data),
            Err(e) if lapit_storage::is_not_found(&e) => Err(Error::ObjectNotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(Error::from_backend(&e)),
        }
    }

    /// Fetch the named files of a commit concurrently, in the given order
    pub async fn get_files(&self, id: &CommitId, filenames: &[String]) -> Result<Vec<FileBlob>> {
        let fetches = filenames.iter().map(|name| async move {
            let content = self.get_object(&commit_key(id, name)).await?;
            Ok::<_, Error>(FileBlob::new(name.clone(), content))
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Fetch every file stored under a commit's prefix
    ///
    /// # Errors
    ///
    /// [`Error::CommitNotFound`] if the prefix holds no objects.
    pub async fn fetch_commit(&self, id: &CommitId) -> Result<Vec<FileBlob>> {
        let names = self.list_commit(id).await?;
        if names.is_empty() {
            return Err(Error::CommitNotFound(*id));
        }
        self.get_files(id, &names).await
    }

    /// Delete `keys`, logging and reporting failures instead of returning them
    pub async fn delete_objects(&self, keys: &[String]) -> DeleteReport {
        let deletes = keys.iter().map(|key| async move {
            let result = self.backend.delete(key).await;
            (key.clone(), result)
        });

        let mut report = DeleteReport::default();
        for (key, result) in join_all(deletes).await {
            match result {
                Ok(()) => report.deleted.push(key),
                Err(e) => {
                    warn!(key = %key, error = %format!("{e:#}"), "Object delete failed");
                    report.failed.push(key);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapit_storage::mock::MockBackend;

    fn store() -> (MockBackend, ObjectStore) {
        let backend = MockBackend::new();
        let store = ObjectStore::new(Arc::new(backend.clone()));
        (backend, store)
    }

    #[tokio::test]
    async fn test_put_uses_key_scheme() {
        let (backend, store) = store();
        let id = CommitId::generate();

        store
            .put_objects(&id, &[FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")])
            .await
            .unwrap();

        assert_eq!(
            backend.keys().await,
            vec![format!("commits/{id}/a.txt"), format!("commits/{id}/b.txt")]
        );
    }

    #[tokio::test]
    async fn test_partial_failure_reports_failed_keys() {
        let (backend, store) = store();
        backend.fail_puts_matching("b.txt").await;
        let id = CommitId::generate();

        let err = store
            .put_objects(&id, &[FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")])
            .await
            .unwrap_err();

        match err {
            Error::Storage { failed_keys, .. } => {
                assert_eq!(failed_keys, vec![commit_key(&id, "b.txt")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The sibling upload was not cancelled.
        assert!(backend.exists(&commit_key(&id, "a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_validation_happens_before_io() {
        let (backend, store) = store();
        let id = CommitId::generate();

        let err = store
            .put_objects(&id, &[FileBlob::new("ok.txt", "x"), FileBlob::new("a/b", "y")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = store
            .put_objects(&id, &[FileBlob::new("x", "1"), FileBlob::new("x", "2")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(backend.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let (_backend, store) = store();
        let err = store.get_object("commits/x/none").await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_unknown_commit() {
        let (_backend, store) = store();
        let id = CommitId::generate();
        assert!(matches!(
            store.fetch_commit(&id).await.unwrap_err(),
            Error::CommitNotFound(missing) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_fetch_commit_isolated_by_prefix() {
        let (_backend, store) = store();
        let one = CommitId::generate();
        let two = CommitId::generate();
        store.put_objects(&one, &[FileBlob::new("a.txt", "1")]).await.unwrap();
        store.put_objects(&two, &[FileBlob::new("a.txt", "2")]).await.unwrap();

        let files = store.fetch_commit(&one).await.unwrap();
        assert_eq!(files, vec![FileBlob::new("a.txt", "1")]);
    }

    #[tokio::test]
    async fn test_delete_objects_best_effort() {
        let (backend, store) = store();
        let id = CommitId::generate();
        store
            .put_objects(&id, &[FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")])
            .await
            .unwrap();
        backend.fail_deletes_matching("a.txt").await;

        let keys = store.list_objects(&commit_prefix(&id)).await.unwrap();
        let report = store.delete_objects(&keys).await;

        assert!(!report.is_complete());
        assert_eq!(report.failed, vec![commit_key(&id, "a.txt")]);
        assert_eq!(report.deleted, vec![commit_key(&id, "b.txt")]);
    }
}
