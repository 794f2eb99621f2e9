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

//! The local working copy
//!
//! ```text
//! project/
//!   .lapit/
//!     config.toml      remote and identity settings
//!     staging/         files pending the next commit
//!     commits/<id>/    one directory per local commit, plus commit.json
//!     pushed           ids whose push fully completed, one per line
//!   a.txt              working files; revert writes here
//! ```

use crate::blob::FileBlob;
use crate::commit::{write_snapshot, CommitBuilder, CommitMeta, LocalCommit};
use crate::error::{Error, Result};
use crate::id::{validate_filename, CommitId, COMMIT_META_FILE};
use crate::staging::StagingArea;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the hidden directory holding local state
pub const LAPIT_DIR: &str = ".lapit";

const STAGING_DIR: &str = "staging";
const COMMITS_DIR: &str = "commits";
const PUSHED_LEDGER: &str = "pushed";

/// What `revert` does with working files absent from the target commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RevertPolicy {
    /// Write the commit's files over the working directory and leave
    /// everything else alone
    #[default]
    Overlay,
    /// Additionally remove top-level files that the commit does not contain.
    /// Directories, including `.lapit/`, are never touched.
    Clean,
}

/// Files written and removed by a revert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertOutcome {
    /// Files restored from the commit
    pub written: Vec<String>,
    /// Files removed under [`RevertPolicy::Clean`]
    pub removed: Vec<String>,
}

/// Id and metadata of a local commit, without its file contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Commit id
    pub id: CommitId,
    /// Message and date
    pub meta: CommitMeta,
}

/// A project directory with its `.lapit/` state
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
    lapit_dir: PathBuf,
}

impl WorkingCopy {
    /// Create `.lapit/` with empty staging and commit areas under `root`
    ///
    /// Running it on an existing working copy is harmless.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let wc = Self::at(root.as_ref());
        fs::create_dir_all(wc.lapit_dir.join(STAGING_DIR))?;
        fs::create_dir_all(wc.lapit_dir.join(COMMITS_DIR))?;
        info!(root = %wc.root.display(), "Initialized working copy");
        Ok(wc)
    }

    /// Open the working copy rooted exactly at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let wc = Self::at(root.as_ref());
        if !wc.lapit_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "lapit repository at {}",
                wc.root.display()
            )));
        }
        Ok(wc)
    }

    /// Find the working copy containing `start`, walking up parent directories
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let mut current = start.as_ref().to_path_buf();
        loop {
            if current.join(LAPIT_DIR).is_dir() {
                return Ok(Self::at(&current));
            }
            if !current.pop() {
                return Err(Error::NotFound(
                    "lapit repository (or any parent directory)".to_string(),
                ));
            }
        }
    }

    fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            lapit_dir: root.join(LAPIT_DIR),
        }
    }

    /// Project directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.lapit/` directory
    pub fn lapit_dir(&self) -> &Path {
        &self.lapit_dir
    }

    /// Path of `.lapit/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.lapit_dir.join("config.toml")
    }

    /// Directory holding local commits
    pub fn commits_dir(&self) -> PathBuf {
        self.lapit_dir.join(COMMITS_DIR)
    }

    /// The staging area of this working copy
    pub fn staging(&self) -> StagingArea {
        StagingArea::new(self.lapit_dir.join(STAGING_DIR))
    }

    /// Stage a file for the next commit
    pub fn add(&self, path: &Path) -> Result<String> {
        self.staging().stage(path)
    }

    /// Commit everything staged
    pub fn commit(&self, message: &str, allow_empty: bool) -> Result<CommitId> {
        let staging = self.staging();
        let commits_dir = self.commits_dir();
        CommitBuilder::new(&staging, &commits_dir)
            .allow_empty(allow_empty)
            .build(message)
    }

    /// Whether a complete local commit with this id exists
    pub fn has_commit(&self, id: &CommitId) -> Result<bool> {
        let dir = self.commits_dir().join(id.to_string());
        Ok(CommitMeta::read_from(&dir)?.is_some())
    }

    /// Load a complete local commit with its files
    pub fn load_commit(&self, id: &CommitId) -> Result<LocalCommit> {
        let dir = self.commits_dir().join(id.to_string());
        let meta = CommitMeta::read_from(&dir)?.ok_or(Error::CommitNotFound(*id))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == COMMIT_META_FILE || name.starts_with(&format!(".{COMMIT_META_FILE}")) {
                continue;
            }
            files.push(FileBlob::new(name, fs::read(entry.path())?));
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));

        Ok(LocalCommit { id: *id, meta, files })
    }

    /// Complete local commits, oldest first
    pub fn list_commits(&self) -> Result<Vec<CommitSummary>> {
        let entries = match fs::read_dir(self.commits_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut commits = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(id) = CommitId::parse(&name) else {
                continue;
            };
            match CommitMeta::read_from(&entry.path())? {
                Some(meta) => commits.push(CommitSummary { id, meta }),
                None => debug!(commit_id = %id, "Skipping incomplete commit"),
            }
        }
        commits.sort_by(|a, b| a.meta.date.cmp(&b.meta.date).then(a.id.cmp(&b.id)));
        Ok(commits)
    }

    /// Save a commit obtained from the remote; an existing complete copy is kept
    pub fn store_commit(&self, id: &CommitId, meta: &CommitMeta, files: &[FileBlob]) -> Result<()> {
        if self.has_commit(id)? {
            return Ok(());
        }
        for file in files {
            validate_filename(&file.filename)?;
        }
        write_snapshot(&self.commits_dir().join(id.to_string()), files, meta)
    }

    /// Ids recorded in the push ledger
    pub fn pushed(&self) -> Result<BTreeSet<CommitId>> {
        let text = match fs::read_to_string(self.lapit_dir.join(PUSHED_LEDGER)) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = BTreeSet::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match CommitId::parse(line) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => warn!(line = %line, "Ignoring malformed line in push ledger"),
            }
        }
        Ok(ids)
    }

    /// Record that `id` is fully pushed
    pub fn mark_pushed(&self, id: &CommitId) -> Result<()> {
        if self.pushed()?.contains(id) {
            return Ok(());
        }
        let mut ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.lapit_dir.join(PUSHED_LEDGER))?;
        writeln!(ledger, "{id}")?;
        Ok(())
    }

    /// Complete local commits not yet in the push ledger, oldest first
    pub fn unpushed_commits(&self) -> Result<Vec<CommitSummary>> {
        let pushed = self.pushed()?;
        Ok(self
            .list_commits()?
            .into_iter()
            .filter(|c| !pushed.contains(&c.id))
            .collect())
    }

    /// Write `files` into the project directory according to `policy`
    pub fn materialize(&self, files: &[FileBlob], policy: RevertPolicy) -> Result<RevertOutcome> {
        for file in files {
            validate_filename(&file.filename)?;
        }

        let mut outcome = RevertOutcome::default();

        if policy == RevertPolicy::Clean {
            let keep: BTreeSet<&str> = files.iter().map(|f| f.filename.as_str()).collect();
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if !keep.contains(name.as_str()) {
                    fs::remove_file(entry.path())?;
                    outcome.removed.push(name);
                }
            }
            outcome.removed.sort();
        }

        for file in files {
            fs::write(self.root.join(&file.filename), &file.content)?;
            outcome.written.push(file.filename.clone());
        }

        info!(
            written = outcome.written.len(),
            removed = outcome.removed.len(),
            ?policy,
            "Restored working files"
        );
        Ok(outcome)
    }
}
