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

//! Metadata store for Lapit
//!
//! Durable records of repositories and commits. The store enforces the
//! referential rules the rest of the system relies on:
//! - a commit belongs to exactly one existing repository
//! - commit ids are unique; recording one twice is [`MetadataError::DuplicateCommit`]
//! - a repository's history only grows by append, and two concurrent
//!   appends are both kept
//! - deleting a repository removes every commit record it owns
//!
//! Two implementations are provided: [`MemoryMetadataStore`] and
//! [`SqliteMetadataStore`].

mod error;
mod memory;
mod model;
mod sqlite;

use async_trait::async_trait;
use lapit_versioning::CommitId;
use std::fmt::Debug;

pub use error::{MetadataError, MetadataResult};
pub use memory::MemoryMetadataStore;
pub use model::{CommitRecord, NewCommit, NewRepository, Repository, RepositoryId, Visibility};
pub use sqlite::SqliteMetadataStore;

/// Repository and commit metadata operations
///
/// Shared between request handlers as `Arc<dyn MetadataStore>`.
#[async_trait]
pub trait MetadataStore: Send + Sync + Debug {
    /// Create a repository
    ///
    /// # Errors
    ///
    /// [`MetadataError::DuplicateRepository`] if the owner already has one with this name.
    async fn create_repository(&self, new: NewRepository) -> MetadataResult<Repository>;

    /// Look a repository up by owner and name
    async fn find_repository(&self, owner_id: &str, name: &str)
        -> MetadataResult<Option<Repository>>;

    /// Fetch a repository with its full history
    async fn get_repository(&self, id: &RepositoryId) -> MetadataResult<Repository>;

    /// Record a commit and append it to its repository's history atomically
    ///
    /// # Errors
    ///
    /// - [`MetadataError::DuplicateCommit`] if the id is already recorded
    /// - [`MetadataError::RepositoryNotFound`] if the repository doesn't exist
    /// - [`MetadataError::Validation`] for blank fields or a manifest that
    ///   doesn't follow the key scheme
    async fn create_commit_record(&self, new: NewCommit) -> MetadataResult<CommitRecord>;

    /// Fetch a commit record
    async fn get_commit(&self, id: &CommitId) -> MetadataResult<Option<CommitRecord>>;

    /// Commit records of a repository in append order
    async fn list_commits(&self, repository_id: &RepositoryId) -> MetadataResult<Vec<CommitRecord>>;

    /// Delete a repository and its commit records, returning the removed records
    async fn delete_repository(&self, id: &RepositoryId) -> MetadataResult<Vec<CommitRecord>>;
}
