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

//! The staging area
//!
//! Staged files are plain copies under `.lapit/staging/`, keyed by basename.
//! Staging the same basename twice replaces the earlier copy.

use crate::blob::FileBlob;
use crate::error::{Error, Result};
use crate::id::validate_filename;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Repository-local holding area for files pending the next commit
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Staging area rooted at `dir`; the directory is created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the staged copies
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the staging area under its basename
    ///
    /// Returns the basename it was staged as.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `source` is missing or not a regular file,
    /// [`Error::Validation`] if it has no usable basename, and
    /// [`Error::Io`] for copy failures (not retried).
    pub fn stage(&self, source: &Path) -> Result<String> {
        let metadata = match fs::metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("file {}", source.display())));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(Error::NotFound(format!(
                "regular file {}",
                source.display()
            )));
        }

        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::validation(format!("unusable filename: {}", source.display())))?
            .to_string();
        validate_filename(&filename)?;

        fs::create_dir_all(&self.dir)?;
        fs::copy(source, self.dir.join(&filename))?;

        debug!(file = %filename, "Staged file");
        Ok(filename)
    }

    /// Basenames currently staged, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read every staged file
    pub fn read_all(&self) -> Result<Vec<FileBlob>> {
        self.list()?
            .into_iter()
            .map(|name| -> Result<FileBlob> {
                let content = fs::read(self.dir.join(&name))?;
                Ok(FileBlob::new(name, content))
            })
            .collect()
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.list()?.is_empty())
    }

    /// Remove every staged file, leaving the directory in place
    pub fn clear(&self) -> Result<()> {
        for name in self.list()? {
            fs::remove_file(self.dir.join(name))?;
        }
        Ok(())
    }
}
