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

use crate::cleanup::{CleanupConfig, CleanupJob, CleanupQueue};
use chrono::{DateTime, Utc};
use lapit_metadata::{
    CommitRecord, MetadataError, MetadataStore, NewCommit, NewRepository, Repository, RepositoryId,
    Visibility,
};
use lapit_storage::StorageBackend;
use lapit_versioning::{commit_prefix, manifest_for, CommitId, Error, FileBlob, ObjectStore, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// A commit to push: its identity, message and files
#[derive(Debug, Clone)]
pub struct PushCommit {
    /// Repository the commit is appended to
    pub repository_id: RepositoryId,
    /// Client-chosen commit id
    pub commit_id: CommitId,
    /// Commit message
    pub message: String,
    /// Author reference, already authorized
    pub author_id: String,
    /// Files of the commit
    pub files: Vec<FileBlob>,
    /// When the client made the commit
    pub committed_at: Option<DateTime<Utc>>,
}

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every blob was written
    Uploaded {
        /// Number of blobs
        files: usize,
    },
    /// The commit is already recorded; nothing was written
    AlreadyRecorded,
}

/// Result of recording or pushing a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The commit is now recorded
    Recorded(CommitRecord),
    /// The commit was recorded before; nothing changed
    AlreadyRecorded(CommitRecord),
}

impl PushOutcome {
    /// The commit record either way
    pub fn record(&self) -> &CommitRecord {
        match self {
            PushOutcome::Recorded(r) | PushOutcome::AlreadyRecorded(r) => r,
        }
    }

    /// Check if this call created the record
    pub fn is_new(&self) -> bool {
        matches!(self, PushOutcome::Recorded(_))
    }
}

/// A commit fetched from the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledCommit {
    /// Metadata record
    pub record: CommitRecord,
    /// Files in manifest order
    pub files: Vec<FileBlob>,
}

/// Result of a cascading repository delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedRepository {
    /// Commit records removed
    pub deleted_commits: usize,
    /// Blob keys whose deletion failed and were queued for cleanup
    pub queued_keys: usize,
    /// Commit prefixes that could not be listed and were queued whole
    pub queued_prefixes: usize,
}

/// Keeps the blob store and the metadata store consistent
///
/// Invariant: a commit record exists only for commits whose blobs were all
/// written.
///
/// Uploads of one commit id are serialized per engine: while one is in
/// flight, another [`push`](Self::push) or [`upload`](Self::upload) of the
/// same id fails with [`Error::Conflict`] instead of overwriting its blobs.
/// Engines in separate processes sharing a store do not see each other's
/// uploads, so clients must never reuse a commit id for different content.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    objects: ObjectStore,
    metadata: Arc<dyn MetadataStore>,
    cleanup: CleanupQueue,
    in_flight: Arc<Mutex<HashSet<CommitId>>>,
}

/// Marks a commit id as being uploaded until dropped
struct UploadClaim<'a> {
    in_flight: &'a Mutex<HashSet<CommitId>>,
    id: CommitId,
}

impl Drop for UploadClaim<'_> {
    fn drop(&mut self) {
        let mut ids = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.id);
    }
}

impl SyncEngine {
    /// Create an engine and spawn its cleanup worker
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        metadata: Arc<dyn MetadataStore>,
        cleanup: CleanupConfig,
    ) -> Self {
        let objects = ObjectStore::new(backend);
        let cleanup = CleanupQueue::spawn(objects.clone(), cleanup);
        Self {
            objects,
            metadata,
            cleanup,
            in_flight: Arc::default(),
        }
    }

    /// The object store adapter
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// The metadata store
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    /// The orphan cleanup queue
    pub fn cleanup(&self) -> &CleanupQueue {
        &self.cleanup
    }

    /// Find `(owner_id, name)` or create it
    ///
    /// Returns the repository and whether this call created it.
    #[instrument(skip(self))]
    pub async fn init_repository(&self, owner_id: &str, name: &str) -> Result<(Repository, bool)> {
        if name.trim().is_empty() {
            return Err(Error::validation("repository name is required"));
        }
        if owner_id.trim().is_empty() {
            return Err(Error::validation("user id is required"));
        }

        if let Some(existing) = self.metadata.find_repository(owner_id, name).await? {
            debug!(repository_id = %existing.id, "Repository already exists");
            return Ok((existing, false));
        }

        let new = NewRepository {
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            description: format!("Repository {name} created via CLI"),
            visibility: Visibility::Public,
        };
        match self.metadata.create_repository(new).await {
            Ok(repo) => {
                info!(repository_id = %repo.id, "Repository created");
                Ok((repo, true))
            }
            // Lost a race with another init of the same name.
            Err(MetadataError::DuplicateRepository { .. }) => {
                let repo = self
                    .metadata
                    .find_repository(owner_id, name)
                    .await?
                    .ok_or_else(|| {
                        Error::Conflict(format!("repository {name:?} is being created"))
                    })?;
                Ok((repo, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Upload a commit's blobs without recording it
    ///
    /// A commit that is already recorded is left alone, so retries never
    /// rewrite immutable blobs.
    ///
    /// # Errors
    ///
    /// [`Error::Storage`] with the failed keys if any upload failed.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload(&self, commit_id: &CommitId, files: &[FileBlob]) -> Result<UploadOutcome> {
        let _claim = self.claim(commit_id)?;
        if self.metadata.get_commit(commit_id).await?.is_some() {
            debug!("Commit already recorded, skipping upload");
            return Ok(UploadOutcome::AlreadyRecorded);
        }
        self.objects.put_objects(commit_id, files).await?;
        Ok(UploadOutcome::Uploaded { files: files.len() })
    }

    /// Record a commit whose blobs were uploaded earlier
    ///
    /// # Errors
    ///
    /// - [`Error::Integrity`] if a manifest file has no blob
    /// - [`Error::DuplicateCommit`] if the id is recorded under another repository
    #[instrument(skip(self, new), fields(commit_id = %new.commit_id))]
    pub async fn record(&self, new: NewCommit) -> Result<PushOutcome> {
        new.validate()?;
        if let Some(outcome) = self.existing(&new).await? {
            return Ok(outcome);
        }

        let stored: HashSet<String> = self
            .objects
            .list_commit(&new.commit_id)
            .await?
            .into_iter()
            .collect();
        let missing: Vec<&str> = new
            .files
            .iter()
            .map(|e| e.filename.as_str())
            .filter(|name| !stored.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Integrity(format!(
                "commit {} has no blobs for: {}",
                new.commit_id,
                missing.join(", ")
            )));
        }

        self.append(new).await
    }

    /// Upload then record a commit
    ///
    /// Retrying a push that already landed returns
    /// [`PushOutcome::AlreadyRecorded`] without touching the blob store. If
    /// any upload fails nothing is recorded and the push must be retried as
    /// a whole.
    #[instrument(skip(self, push), fields(commit_id = %push.commit_id, files = push.files.len()))]
    pub async fn push(&self, push: PushCommit) -> Result<PushOutcome> {
        let new = NewCommit {
            repository_id: push.repository_id,
            commit_id: push.commit_id,
            message: push.message,
            author_id: push.author_id,
            files: manifest_for(&push.commit_id, &push.files),
            committed_at: push.committed_at,
        };
        new.validate()?;
        let _claim = self.claim(&new.commit_id)?;
        if let Some(outcome) = self.existing(&new).await? {
            return Ok(outcome);
        }
        // Fail on a missing repository before writing any blob.
        self.metadata.get_repository(&new.repository_id).await?;

        self.objects.put_objects(&new.commit_id, &push.files).await?;
        debug!("Blobs uploaded");

        self.append(new).await
    }

    /// Fetch a recorded commit and its files
    ///
    /// # Errors
    ///
    /// - [`Error::CommitNotFound`] if the commit was never recorded, even when
    ///   some of its blobs exist from a failed push
    /// - [`Error::Integrity`] if the record names a blob that is missing
    #[instrument(skip(self))]
    pub async fn pull(&self, commit_id: &CommitId) -> Result<PulledCommit> {
        let record = self
            .metadata
            .get_commit(commit_id)
            .await?
            .ok_or(Error::CommitNotFound(*commit_id))?;

        let names: Vec<String> = record.files.iter().map(|e| e.filename.clone()).collect();
        let files = match self.objects.get_files(commit_id, &names).await {
            Ok(files) => files,
            Err(Error::ObjectNotFound { key }) => {
                return Err(Error::Integrity(format!(
                    "commit {commit_id} is recorded but blob {key} is missing"
                )))
            }
            Err(e) => return Err(e),
        };

        debug!(files = files.len(), "Commit pulled");
        Ok(PulledCommit { record, files })
    }

    /// Commit records of a repository, newest first
    pub async fn list_commits(&self, repository_id: &RepositoryId) -> Result<Vec<CommitRecord>> {
        let mut records = self.metadata.list_commits(repository_id).await?;
        records.reverse();
        Ok(records)
    }

    /// Delete a repository, its commit records and their blobs
    ///
    /// Metadata goes first and always completes. Blob deletion is best
    /// effort: failures are logged and queued on the cleanup queue.
    #[instrument(skip(self))]
    pub async fn delete_repository(
        &self,
        repository_id: &RepositoryId,
    ) -> Result<DeletedRepository> {
        let records = self.metadata.delete_repository(repository_id).await?;
        info!(commits = records.len(), "Repository metadata deleted");

        let mut outcome = DeletedRepository {
            deleted_commits: records.len(),
            queued_keys: 0,
            queued_prefixes: 0,
        };

        for record in &records {
            let prefix = commit_prefix(&record.commit_id);
            let keys = match self.objects.list_objects(&prefix).await {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(
                        prefix = %prefix,
                        error = %e,
                        "Cannot list commit blobs, queued for cleanup"
                    );
                    self.cleanup.enqueue(CleanupJob::Prefix(prefix));
                    outcome.queued_prefixes += 1;
                    continue;
                }
            };

            let report = self.objects.delete_objects(&keys).await;
            if !report.is_complete() {
                for key in &report.failed {
                    warn!(key = %key, "Blob delete failed, queued for cleanup");
                }
                outcome.queued_keys += report.failed.len();
                self.cleanup.enqueue(CleanupJob::Keys(report.failed));
            }
        }

        Ok(outcome)
    }

    fn claim(&self, id: &CommitId) -> Result<UploadClaim<'_>> {
        let mut ids = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(*id) {
            return Err(Error::Conflict(format!("commit {id} is already being pushed")));
        }
        Ok(UploadClaim {
            in_flight: &self.in_flight,
            id: *id,
        })
    }

    async fn existing(&self, new: &NewCommit) -> Result<Option<PushOutcome>> {
        match self.metadata.get_commit(&new.commit_id).await? {
            Some(record) if record.repository_id == new.repository_id => {
                debug!("Commit already recorded");
                Ok(Some(PushOutcome::AlreadyRecorded(record)))
            }
            Some(_) => Err(Error::DuplicateCommit(new.commit_id)),
            None => Ok(None),
        }
    }

    async fn append(&self, new: NewCommit) -> Result<PushOutcome> {
        let repository_id = new.repository_id;
        let commit_id = new.commit_id;
        match self.metadata.create_commit_record(new).await {
            Ok(record) => {
                info!(commit_id = %commit_id, repository_id = %repository_id, "Commit recorded");
                Ok(PushOutcome::Recorded(record))
            }
            // A concurrent retry of the same push won the append.
            Err(MetadataError::DuplicateCommit(_)) => {
                match self.metadata.get_commit(&commit_id).await? {
                    Some(record) if record.repository_id == repository_id => {
                        Ok(PushOutcome::AlreadyRecorded(record))
                    }
                    _ => Err(Error::DuplicateCommit(commit_id)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapit_metadata::MemoryMetadataStore;
    use lapit_storage::mock::MockBackend;
    use lapit_versioning::ErrorCode;

    #[tokio::test]
    async fn test_same_id_is_not_uploaded_twice_at_once() {
        let backend = MockBackend::new();
        let engine = SyncEngine::new(
            Arc::new(backend.clone()),
            Arc::new(MemoryMetadataStore::new()),
            CleanupConfig::default(),
        );
        let (repo, _) = engine.init_repository("user-1", "proj").await.unwrap();
        let id = CommitId::generate();
        let push = PushCommit {
            repository_id: repo.id,
            commit_id: id,
            message: "first".to_string(),
            author_id: "user-1".to_string(),
            files: vec![FileBlob::new("a.txt", "A")],
            committed_at: None,
        };

        let claim = engine.claim(&id).unwrap();
        let err = engine.push(push.clone()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        let err = engine.upload(&id, &push.files).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(backend.put_calls(), 0);

        drop(claim);
        assert!(engine.push(push.clone()).await.unwrap().is_new());
        assert!(!engine.push(push).await.unwrap().is_new());
        assert_eq!(backend.put_calls(), 1);
    }
}
