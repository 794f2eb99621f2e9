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

//! Repository and commit records

use crate::error::{MetadataError, MetadataResult};
use chrono::{DateTime, Utc};
use lapit_versioning::{commit_key, commit_prefix, validate_filename, CommitId, ManifestEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Repository identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId(Uuid);

impl RepositoryId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        RepositoryId(Uuid::new_v4())
    }
}

impl FromStr for RepositoryId {
    type Err = MetadataError;

    fn from_str(s: &str) -> MetadataResult<Self> {
        Uuid::try_parse(s)
            .map(RepositoryId)
            .map_err(|_| MetadataError::validation(format!("malformed repository id: {s:?}")))
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = MetadataError;

    fn try_from(s: String) -> MetadataResult<Self> {
        s.parse()
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Who can see a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone
    Public,
    /// Owner only
    Private,
}

impl Visibility {
    /// Text stored in the database
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = MetadataError;

    fn from_str(s: &str) -> MetadataResult<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(MetadataError::validation(format!("unknown visibility: {other}"))),
        }
    }
}

/// A repository and its append-only commit history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Repository id
    pub id: RepositoryId,
    /// Name, unique per owner
    pub name: String,
    /// Owning user
    pub owner_id: String,
    /// Free-form description
    pub description: String,
    /// Visibility flag
    pub visibility: Visibility,
    /// Commit ids in the order they were appended
    pub commits: Vec<CommitId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    /// Name, unique per owner
    pub name: String,
    /// Owning user
    pub owner_id: String,
    /// Free-form description
    pub description: String,
    /// Visibility flag
    pub visibility: Visibility,
}

impl NewRepository {
    pub(crate) fn validate(&self) -> MetadataResult<()> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::validation("repository name is required"));
        }
        if self.owner_id.trim().is_empty() {
            return Err(MetadataError::validation("owner id is required"));
        }
        Ok(())
    }

    pub(crate) fn into_repository(self) -> Repository {
        Repository {
            id: RepositoryId::generate(),
            name: self.name,
            owner_id: self.owner_id,
            description: self.description,
            visibility: self.visibility,
            commits: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A recorded commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Commit id
    pub commit_id: CommitId,
    /// Owning repository
    pub repository_id: RepositoryId,
    /// Commit message
    pub message: String,
    /// Author reference
    pub author_id: String,
    /// Files of the commit and their storage keys
    pub files: Vec<ManifestEntry>,
    /// Key prefix holding every blob of the commit
    pub storage_prefix: String,
    /// When the commit was made, as reported by the client
    pub committed_at: DateTime<Utc>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Input for recording a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    /// Owning repository
    pub repository_id: RepositoryId,
    /// Commit id, chosen by the client
    pub commit_id: CommitId,
    /// Commit message
    pub message: String,
    /// Author reference
    pub author_id: String,
    /// Manifest
    pub files: Vec<ManifestEntry>,
    /// Client commit time, defaults to the time of recording
    pub committed_at: Option<DateTime<Utc>>,
}

impl NewCommit {
    /// Check required fields and that every manifest path follows the key scheme
    pub fn validate(&self) -> MetadataResult<()> {
        if self.message.trim().is_empty() {
            return Err(MetadataError::validation("commit message is required"));
        }
        if self.author_id.trim().is_empty() {
            return Err(MetadataError::validation("author id is required"));
        }

        let mut seen = HashSet::new();
        for entry in &self.files {
            validate_filename(&entry.filename)
                .map_err(|e| MetadataError::validation(e.to_string()))?;
            if !seen.insert(entry.filename.as_str()) {
                return Err(MetadataError::validation(format!(
                    "duplicate manifest entry: {}",
                    entry.filename
                )));
            }
            let expected = commit_key(&self.commit_id, &entry.filename);
            if entry.path != expected {
                return Err(MetadataError::validation(format!(
                    "manifest path {:?} does not match {:?}",
                    entry.path, expected
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn into_record(self) -> CommitRecord {
        let now = Utc::now();
        CommitRecord {
            storage_prefix: commit_prefix(&self.commit_id),
            commit_id: self.commit_id,
            repository_id: self.repository_id,
            message: self.message,
            author_id: self.author_id,
            files: self.files,
            committed_at: self.committed_at.unwrap_or(now),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_commit(files: Vec<ManifestEntry>, id: CommitId) -> NewCommit {
        NewCommit {
            repository_id: RepositoryId::generate(),
            commit_id: id,
            message: "msg".into(),
            author_id: "user-1".into(),
            files,
            committed_at: None,
        }
    }

    #[test]
    fn test_repository_id_round_trip() {
        let id = RepositoryId::generate();
        assert_eq!(id.to_string().parse::<RepositoryId>().unwrap(), id);
        assert!("nope".parse::<RepositoryId>().is_err());
    }

    #[test]
    fn test_new_commit_validation() {
        let id = CommitId::generate();
        assert!(new_commit(vec![ManifestEntry::for_commit(&id, "a.txt")], id)
            .validate()
            .is_ok());

        let wrong_path = ManifestEntry {
            filename: "a.txt".into(),
            path: "elsewhere/a.txt".into(),
        };
        assert!(new_commit(vec![wrong_path], id).validate().is_err());

        let dup = vec![
            ManifestEntry::for_commit(&id, "a.txt"),
            ManifestEntry::for_commit(&id, "a.txt"),
        ];
        assert!(new_commit(dup, id).validate().is_err());

        let mut blank = new_commit(vec![], id);
        blank.message = " ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_record_prefix() {
        let id = CommitId::generate();
        let record = new_commit(vec![], id).into_record();
        assert_eq!(record.storage_prefix, format!("commits/{id}/"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let id = CommitId::generate();
        let json = serde_json::to_value(new_commit(vec![], id).into_record()).unwrap();
        assert_eq!(json["commitId"], id.to_string());
        assert!(json.get("storagePrefix").is_some());
    }
}
