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

//! In-memory metadata store
//!
//! All state sits behind one `RwLock`, so recording a commit inserts the
//! record and appends to the repository's history under a single write
//! guard.

use crate::error::{MetadataError, MetadataResult};
use crate::model::{CommitRecord, NewCommit, NewRepository, Repository, RepositoryId};
use crate::MetadataStore;
use async_trait::async_trait;
use lapit_versioning::CommitId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    repositories: HashMap<RepositoryId, Repository>,
    commits: HashMap<CommitId, CommitRecord>,
}

/// Metadata store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    state: Arc<RwLock<State>>,
}

impl MemoryMetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for MemoryMetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMetadataStore").finish()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_repository(&self, new: NewRepository) -> MetadataResult<Repository> {
        new.validate()?;
        let mut state = self.state.write().await;

        let taken = state
            .repositories
            .values()
            .any(|r| r.owner_id == new.owner_id && r.name == new.name);
        if taken {
            return Err(MetadataError::DuplicateRepository {
                owner_id: new.owner_id,
                name: new.name,
            });
        }

        let repo = new.into_repository();
        state.repositories.insert(repo.id, repo.clone());
        Ok(repo)
    }

    async fn find_repository(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<Option<Repository>> {
        let state = self.state.read().await;
        Ok(state
            .repositories
            .values()
            .find(|r| r.owner_id == owner_id && r.name == name)
            .cloned())
    }

    async fn get_repository(&self, id: &RepositoryId) -> MetadataResult<Repository> {
        let state = self.state.read().await;
        state
            .repositories
            .get(id)
            .cloned()
            .ok_or(MetadataError::RepositoryNotFound(*id))
    }

    async fn create_commit_record(&self, new: NewCommit) -> MetadataResult<CommitRecord> {
        new.validate()?;
        let mut state = self.state.write().await;

        if state.commits.contains_key(&new.commit_id) {
            return Err(MetadataError::DuplicateCommit(new.commit_id));
        }
        let repo = state
            .repositories
            .get_mut(&new.repository_id)
            .ok_or(MetadataError::RepositoryNotFound(new.repository_id))?;
        repo.commits.push(new.commit_id);

        let record = new.into_record();
        state.commits.insert(record.commit_id, record.clone());
        Ok(record)
    }

    async fn get_commit(&self, id: &CommitId) -> MetadataResult<Option<CommitRecord>> {
        Ok(self.state.read().await.commits.get(id).cloned())
    }

    async fn list_commits(
        &self,
        repository_id: &RepositoryId,
    ) -> MetadataResult<Vec<CommitRecord>> {
        let state = self.state.read().await;
        let repo = state
            .repositories
            .get(repository_id)
            .ok_or(MetadataError::RepositoryNotFound(*repository_id))?;
        Ok(repo
            .commits
            .iter()
            .filter_map(|id| state.commits.get(id).cloned())
            .collect())
    }

    async fn delete_repository(&self, id: &RepositoryId) -> MetadataResult<Vec<CommitRecord>> {
        let mut state = self.state.write().await;
        let repo = state
            .repositories
            .remove(id)
            .ok_or(MetadataError::RepositoryNotFound(*id))?;
        Ok(repo
            .commits
            .iter()
            .filter_map(|commit_id| state.commits.remove(commit_id))
            .collect())
    }
}
