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

//! Versioning core for Lapit
//!
//! This crate holds the pieces of the commit lifecycle that do not depend on
//! a metadata database:
//! - [`StagingArea`]: files marked for the next commit
//! - [`CommitBuilder`]: turns the staging area into an immutable snapshot
//!   under a fresh random [`CommitId`]
//! - [`WorkingCopy`]: the `.lapit/` directory tying staging, local commits,
//!   the push ledger and revert together
//! - [`ObjectStore`]: the blob store adapter, keyed `commits/{id}/{filename}`
//! - [`Error`]: the error taxonomy with stable [`ErrorCode`]s
//!
//! Commits are whole-file snapshots. There is no content addressing, so the
//! same bytes committed twice are stored twice.
//!
//! # Examples
//!
//! ```no_run
//! use lapit_versioning::WorkingCopy;
//! use std::path::Path;
//!
//! # fn main() -> lapit_versioning::Result<()> {
//! let wc = WorkingCopy::init(".")?;
//! wc.add(Path::new("a.txt"))?;
//! let id = wc.commit("first", false)?;
//!
//! let commit = wc.load_commit(&id)?;
//! println!("{} holds {} files", commit.id, commit.files.len());
//! # Ok(())
//! # }
//! ```

mod blob;
mod commit;
mod error;
mod id;
mod objects;
mod staging;
mod workdir;

pub use blob::{commit_key, commit_prefix, manifest_for, FileBlob, ManifestEntry};
pub use commit::{CommitBuilder, CommitMeta, LocalCommit};
pub use error::{Error, ErrorCode, Result};
pub use id::{validate_filename, CommitId, COMMIT_META_FILE};
pub use objects::{DeleteReport, ObjectStore};
pub use staging::StagingArea;
pub use workdir::{CommitSummary, RevertOutcome, RevertPolicy, WorkingCopy, LAPIT_DIR};
