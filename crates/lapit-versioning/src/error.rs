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

//! Error taxonomy shared by the local and remote halves of Lapit
//!
//! Every variant maps to a stable [`ErrorCode`], which is what crosses the
//! transport boundary. Messages are for humans; codes are for programs.

use crate::id::CommitId;
use lapit_storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result alias used throughout the core crates
pub type Result<T> = std::result::Result<T, Error>;

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing file, repository, commit or object
    NotFound,
    /// Duplicate commit id or repository name collision
    Conflict,
    /// Missing field or malformed identifier
    ValidationError,
    /// Blob or metadata store unreachable, or partial upload
    StorageError,
    /// Metadata and blobs disagree
    IntegrityError,
    /// Nothing staged and empty commits are disabled
    EmptyCommit,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::StorageError => "storage_error",
            ErrorCode::IntegrityError => "integrity_error",
            ErrorCode::EmptyCommit => "empty_commit",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by staging, committing and synchronizing
#[derive(Debug, Error)]
pub enum Error {
    /// A local source file, repository or other named entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A blob key does not exist in the object store
    #[error("object not found: {key}")]
    ObjectNotFound {
        /// Full storage key
        key: String,
    },

    /// No commit with this id is available
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// The commit id is already recorded
    #[error("commit {0} already recorded")]
    DuplicateCommit(CommitId),

    /// Any other uniqueness violation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected before any I/O was attempted
    #[error("validation failed: {0}")]
    Validation(String),

    /// `commit` was called with an empty staging area
    #[error("nothing staged to commit")]
    EmptyCommit,

    /// The blob store failed; `failed_keys` lists objects that were not written
    #[error("storage error: {message}")]
    Storage {
        /// Human-readable cause
        message: String,
        /// Keys whose upload failed, empty when the failure is not per-key
        failed_keys: Vec<String>,
    },

    /// Metadata references blobs that are not present, or the reverse
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The metadata database failed or could not be reached
    #[error("metadata store unavailable: {0}")]
    MetadataUnavailable(String),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound(_) | Error::ObjectNotFound { .. } | Error::CommitNotFound(_) => {
                ErrorCode::NotFound
            }
            Error::DuplicateCommit(_) | Error::Conflict(_) => ErrorCode::Conflict,
            Error::Validation(_) => ErrorCode::ValidationError,
            Error::EmptyCommit => ErrorCode::EmptyCommit,
            Error::Storage { .. } | Error::Io(_) | Error::MetadataUnavailable(_) => {
                ErrorCode::StorageError
            }
            Error::Integrity(_) => ErrorCode::IntegrityError,
        }
    }

    /// Create a Validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a Storage error without per-key detail
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Error::Storage {
            message: msg.into(),
            failed_keys: Vec::new(),
        }
    }

    /// Build a Storage error from a backend failure, keeping the full cause chain
    pub fn from_backend(err: &anyhow::Error) -> Self {
        Error::storage(format!("{err:#}"))
    }

    /// Check if this is any kind of not-found error
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Error::ObjectNotFound { key },
            StorageError::InvalidKey(msg) => Error::Validation(msg),
            StorageError::Io(e) => Error::Io(e),
            other => Error::storage(other.to_string()),
        }
    }
}
