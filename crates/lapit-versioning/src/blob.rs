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

//! File blobs, manifest entries and the blob key scheme

use crate::id::CommitId;
use serde::{Deserialize, Serialize};

/// Storage key prefix under which all blobs of `id` live: `commits/{id}/`
pub fn commit_prefix(id: &CommitId) -> String {
    format!("commits/{id}/")
}

/// Storage key of one blob: `commits/{id}/{filename}`
///
/// ```
/// use lapit_versioning::{commit_key, CommitId};
///
/// let id: CommitId = "0b9c2f4e-3f1d-4b8a-9c59-7d2a1e4f6b10".parse().unwrap();
/// assert_eq!(
///     commit_key(&id, "a.txt"),
///     "commits/0b9c2f4e-3f1d-4b8a-9c59-7d2a1e4f6b10/a.txt"
/// );
/// ```
pub fn commit_key(id: &CommitId, filename: &str) -> String {
    format!("commits/{id}/{filename}")
}

/// A file's name and bytes, as staged, committed, pushed or pulled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    /// Basename of the file
    pub filename: String,
    /// Raw content
    pub content: Vec<u8>,
}

impl FileBlob {
    /// Create a new blob
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Content length in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// One line of a commit manifest: a filename and where its blob is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Basename of the file
    pub filename: String,
    /// Full storage key of the blob
    pub path: String,
}

impl ManifestEntry {
    /// Manifest entry for `filename` in commit `id`
    pub fn for_commit(id: &CommitId, filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            path: commit_key(id, filename),
        }
    }
}

/// Build the manifest of a commit from its files, sorted by filename
pub fn manifest_for(id: &CommitId, files: &[FileBlob]) -> Vec<ManifestEntry> {
    let mut entries: Vec<ManifestEntry> = files
        .iter()
        .map(|f| ManifestEntry::for_commit(id, &f.filename))
        .collect();
    entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_key_agree() {
        let id = CommitId::generate();
        let key = commit_key(&id, "b.txt");
        assert!(key.starts_with(&commit_prefix(&id)));
        assert!(!key.starts_with('/'));
        assert_eq!(key.strip_prefix(&commit_prefix(&id)), Some("b.txt"));
    }

    #[test]
    fn test_manifest_sorted() {
        let id = CommitId::generate();
        let files = vec![FileBlob::new("z.txt", "z"), FileBlob::new("a.txt", "a")];
        let manifest = manifest_for(&id, &files);
        assert_eq!(manifest[0].filename, "a.txt");
        assert_eq!(manifest[1].path, commit_key(&id, "z.txt"));
    }
}
