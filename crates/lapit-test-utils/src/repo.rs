// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Lapit Contributors

//! Temporary working copies

use crate::cli::LapitCommand;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory driven through the `lapit` binary
///
/// ```ignore
/// use lapit_test_utils::TestRepo;
///
/// let repo = TestRepo::initialized();
/// repo.write_file("a.txt", "hello");
/// repo.add(&["a.txt"]);
/// repo.commit("first");
/// assert_eq!(repo.commit_ids().len(), 1);
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
}

impl TestRepo {
    /// An empty directory, not yet a working copy
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A directory after `lapit init -q`
    pub fn initialized() -> Self {
        let repo = Self::new();
        repo.lapit(&["init", "-q"]).run_success();
        repo
    }

    /// Project directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `.lapit/` inside the project directory
    pub fn lapit_dir(&self) -> PathBuf {
        self.path().join(".lapit")
    }

    /// A `lapit` invocation running in this directory
    pub fn lapit(&self, args: &[&str]) -> LapitCommand {
        LapitCommand::new().in_dir(self.path()).args(args)
    }

    /// Write a file into the project directory
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) {
        fs::write(self.path().join(name), content).expect("Failed to write file");
    }

    /// Read a project file as text
    pub fn read_text_file(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("Failed to read text file")
    }

    /// Whether a project file exists
    pub fn file_exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }

    /// `lapit add` the given paths
    pub fn add(&self, paths: &[&str]) {
        let mut args = vec!["add"];
        args.extend_from_slice(paths);
        self.lapit(&args).run_success();
    }

    /// `lapit commit -m <message>`
    pub fn commit(&self, message: &str) {
        self.lapit(&["commit", "-m", message]).run_success();
    }

    /// Write, stage and commit one file
    pub fn add_and_commit(&self, name: &str, content: &str, message: &str) {
        self.write_file(name, content);
        self.add(&[name]);
        self.commit(message);
    }

    /// Names of the complete commit directories under `.lapit/commits/`
    pub fn commit_ids(&self) -> Vec<String> {
        let dir = self.lapit_dir().join("commits");
        let mut ids: Vec<String> = fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().join("commit.json").is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Files currently staged
    pub fn staged_files(&self) -> Vec<String> {
        let dir = self.lapit_dir().join("staging");
        let mut names: Vec<String> = fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
