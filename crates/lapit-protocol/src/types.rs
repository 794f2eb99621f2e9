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

//! Request and response bodies of the remote API
//!
//! Field names are camelCase on the wire. File contents travel as standard
//! base64.

use chrono::{DateTime, Utc};
use lapit_metadata::{CommitRecord, RepositoryId};
use lapit_versioning::{CommitId, ErrorCode, FileBlob, ManifestEntry};
use serde::{Deserialize, Serialize};

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A file on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WireFile {
    /// Basename
    pub filename: String,
    /// Raw bytes, base64 in JSON
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl From<FileBlob> for WireFile {
    fn from(blob: FileBlob) -> Self {
        Self {
            filename: blob.filename,
            content: blob.content,
        }
    }
}

impl From<WireFile> for FileBlob {
    fn from(file: WireFile) -> Self {
        FileBlob::new(file.filename, file.content)
    }
}

/// A file with its size, as shown by commit details
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DetailFile {
    /// Basename
    pub filename: String,
    /// Raw bytes, base64 in JSON
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// Size in bytes
    pub size: u64,
}

impl From<FileBlob> for DetailFile {
    fn from(blob: FileBlob) -> Self {
        Self {
            size: blob.size(),
            filename: blob.filename,
            content: blob.content,
        }
    }
}

/// Body of `POST /cli/init`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    /// Owner of the repository
    pub user_id: String,
    /// Repository name
    pub repo_name: String,
}

/// Response of `POST /cli/init`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    /// Human-readable outcome
    pub message: String,
    /// Repository id
    pub repository_id: RepositoryId,
    /// Repository name
    pub repo_name: String,
    /// Whether this request created the repository
    #[serde(default)]
    pub created: bool,
}

/// Body of `POST /cli/commit`: record a commit whose blobs were pushed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    /// Owning repository
    pub repository_id: RepositoryId,
    /// Commit id
    pub commit_id: CommitId,
    /// Commit message
    pub message: String,
    /// Author
    pub user_id: String,
    /// Manifest
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
    /// When the commit was made locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
}

/// Body of `POST /cli/push`
///
/// With `repository_id`, `message` and `user_id` set, the server uploads and
/// records in one step. Without them it only uploads the blobs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Commit id
    pub commit_id: CommitId,
    /// Files of the commit
    pub files: Vec<WireFile>,
    /// Owning repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryId>,
    /// Commit message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// When the commit was made locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
}

/// Plain acknowledgement
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
    /// Commit concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<CommitId>,
    /// Whether this request created the commit record
    #[serde(default)]
    pub recorded: bool,
}

/// Response of `GET /cli/pull?commitId=`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Commit id
    pub commit_id: CommitId,
    /// Commit message
    pub message: String,
    /// When the commit was made
    pub committed_at: DateTime<Utc>,
    /// When the commit was recorded
    pub created_at: DateTime<Utc>,
    /// Files of the commit
    pub files: Vec<WireFile>,
}

/// Query of `GET /cli/pull`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullQuery {
    /// Commit to fetch
    pub commit_id: String,
}

/// Response of `GET /repo/{repo_id}/commits`, newest first
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommitListResponse {
    /// Commit records
    pub commits: Vec<CommitRecord>,
}

/// Response of `GET /commit/{commit_id}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommitDetailsResponse {
    /// Commit record
    pub commit: CommitRecord,
    /// Files with sizes
    pub files: Vec<DetailFile>,
}

/// Response of `DELETE /repo/{repo_id}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// Human-readable outcome
    pub message: String,
    /// Commit records removed
    pub deleted_commits: usize,
    /// Blob keys left to the cleanup queue
    pub queued_keys: usize,
}

/// Body of every error response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Stable error code
    pub code: ErrorCode,
}
