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

//! Commit snapshots and the commit builder
//!
//! A local commit is a directory `commits/<id>/` holding a copy of every
//! staged file plus [`COMMIT_META_FILE`]. The metadata file is written last,
//! through a rename, so its presence is what marks the commit complete. A
//! directory without it is residue from a failed build and is never listed.
//!
//! # Examples
//!
//! ```no_run
//! use lapit_versioning::{CommitBuilder, StagingArea};
//! use std::path::Path;
//!
//! # fn main() -> lapit_versioning::Result<()> {
//! let staging = StagingArea::new(".lapit/staging");
//! staging.stage(Path::new("notes.txt"))?;
//!
//! let id = CommitBuilder::new(&staging, Path::new(".lapit/commits")).build("first")?;
//! println!("created commit {id}");
//! # Ok(())
//! # }
//! ```

use crate::blob::FileBlob;
use crate::error::{Error, Result};
use crate::id::{CommitId, COMMIT_META_FILE};
use crate::staging::StagingArea;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Contents of `commit.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Commit message
    pub message: String,
    /// Creation time, serialized as RFC 3339
    pub date: DateTime<Utc>,
}

impl CommitMeta {
    /// Metadata stamped with the current time
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            date: Utc::now(),
        }
    }

    /// Write `commit.json` into `dir` atomically
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Integrity(format!("cannot encode commit metadata: {e}")))?;
        let tmp = dir.join(format!(".{COMMIT_META_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, dir.join(COMMIT_META_FILE))?;
        Ok(())
    }

    /// Read `commit.json` from `dir`, `None` if the commit is incomplete
    pub fn read_from(dir: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(dir.join(COMMIT_META_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Integrity(format!(
                "corrupt {} in {}: {e}",
                COMMIT_META_FILE,
                dir.display()
            ))
        })?;
        Ok(Some(meta))
    }
}

/// A complete commit as held in the local working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCommit {
    /// Commit id
    pub id: CommitId,
    /// Message and date
    pub meta: CommitMeta,
    /// Files of the snapshot, sorted by name
    pub files: Vec<FileBlob>,
}

/// Packages the staged files into a new immutable commit snapshot
#[derive(Debug)]
pub struct CommitBuilder<'a> {
    staging: &'a StagingArea,
    commits_dir: &'a Path,
    allow_empty: bool,
}

impl<'a> CommitBuilder<'a> {
    /// Builder that reads from `staging` and writes under `commits_dir`
    pub fn new(staging: &'a StagingArea, commits_dir: &'a Path) -> Self {
        Self {
            staging,
            commits_dir,
            allow_empty: false,
        }
    }

    /// Permit a commit with nothing staged (metadata only)
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Create the commit and clear the staging area
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a blank message
    /// - [`Error::EmptyCommit`] when nothing is staged and empty commits are off
    /// - [`Error::Io`] if copying fails; the partial directory is left behind
    ///   without `commit.json` and the returned id must not be used
    pub fn build(self, message: &str) -> Result<CommitId> {
        if message.trim().is_empty() {
            return Err(Error::validation("commit message cannot be empty"));
        }

        let files = self.staging.read_all()?;
        if files.is_empty() && !self.allow_empty {
            return Err(Error::EmptyCommit);
        }

        let id = CommitId::generate();
        let dir = self.commits_dir.join(id.to_string());

        if let Err(e) = write_snapshot(&dir, &files, &CommitMeta::now(message)) {
            warn!(commit_id = %id, error = %e, "Commit build failed, leaving incomplete directory");
            return Err(e);
        }

        self.staging.clear()?;

        info!(commit_id = %id, files = files.len(), "Created commit");
        Ok(id)
    }
}

/// Write a full commit directory; `commit.json` goes last
pub(crate) fn write_snapshot(dir: &Path, files: &[FileBlob], meta: &CommitMeta) -> Result<()> {
    fs::create_dir_all(dir)?;
    for file in files {
        fs::write(dir.join(&file.filename), &file.content)?;
    }
    meta.write_to(dir)
}
