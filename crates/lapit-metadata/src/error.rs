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

//! Metadata store errors

use crate::model::RepositoryId;
use lapit_versioning::{CommitId, Error};
use thiserror::Error;

/// Result type alias for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised by a [`MetadataStore`](crate::MetadataStore)
#[derive(Error, Debug)]
pub enum MetadataError {
    /// No repository with this id
    #[error("repository not found: {0}")]
    RepositoryNotFound(RepositoryId),

    /// The commit id is already recorded
    #[error("commit {0} already recorded")]
    DuplicateCommit(CommitId),

    /// The owner already has a repository with this name
    #[error("repository {name:?} already exists for owner {owner_id}")]
    DuplicateRepository {
        /// Owner of the existing repository
        owner_id: String,
        /// Colliding name
        name: String,
    },

    /// Input rejected before touching the store
    #[error("invalid metadata: {0}")]
    Validation(String),

    /// The underlying database failed
    #[error("metadata backend error: {0}")]
    Backend(String),
}

impl MetadataError {
    /// Create a Validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        MetadataError::Validation(msg.into())
    }

    /// Create a Backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        MetadataError::Backend(msg.into())
    }
}

impl From<rusqlite::Error> for MetadataError {
    fn from(err: rusqlite::Error) -> Self {
        MetadataError::Backend(err.to_string())
    }
}

impl From<MetadataError> for Error {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::RepositoryNotFound(id) => Error::NotFound(format!("repository {id}")),
            MetadataError::DuplicateCommit(id) => Error::DuplicateCommit(id),
            dup @ MetadataError::DuplicateRepository { .. } => Error::Conflict(dup.to_string()),
            MetadataError::Validation(msg) => Error::Validation(msg),
            MetadataError::Backend(msg) => Error::MetadataUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapit_versioning::ErrorCode;

    #[test]
    fn test_conversion_codes() {
        let id = CommitId::generate();
        assert_eq!(
            Error::from(MetadataError::DuplicateCommit(id)).code(),
            ErrorCode::Conflict
        );
        assert_eq!(
            Error::from(MetadataError::RepositoryNotFound(RepositoryId::generate())).code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            Error::from(MetadataError::validation("bad")).code(),
            ErrorCode::ValidationError
        );
        let dup = MetadataError::DuplicateRepository {
            owner_id: "u1".into(),
            name: "proj".into(),
        };
        assert_eq!(Error::from(dup).code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_backend_failure_is_unavailable_not_integrity() {
        let err = Error::from(MetadataError::backend("no such table: commits"));
        assert!(matches!(err, Error::MetadataUnavailable(_)));
        assert_eq!(err.code(), ErrorCode::StorageError);
    }
}
