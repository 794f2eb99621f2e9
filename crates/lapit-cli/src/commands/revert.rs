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

use anyhow::{Context, Result};
use clap::Parser;
use lapit_versioning::{CommitId, Error, RevertPolicy};

use crate::commands::pull::fetch_commit;
use crate::output;
use crate::progress::ProgressTracker;
use crate::repo::Workspace;

/// Restore the working directory to a commit
///
/// Every file of the commit is written over the working directory. Files
/// the commit does not contain are left alone unless `--clean` is given (or
/// `[revert] clean = true` is set), in which case top-level files missing
/// from the commit are deleted. `.lapit/` and subdirectories are never
/// touched. A commit not held locally is pulled from the remote first.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Overwrite files from a commit, keep everything else
    lapit revert 0f8fad5b-d9cb-469f-a165-70867728950e

    # Make the top level match the commit exactly
    lapit revert --clean 0f8fad5b-d9cb-469f-a165-70867728950e")]
pub struct RevertCmd {
    /// Commit to restore
    #[arg(value_name = "COMMIT")]
    pub commit: String,

    /// Delete top-level files that are not in the commit
    #[arg(long)]
    pub clean: bool,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,
}

impl RevertCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;
        let id: CommitId = self.commit.parse()?;
        let policy = if self.clean || workspace.config.revert.clean {
            RevertPolicy::Clean
        } else {
            RevertPolicy::Overlay
        };

        if !workspace.wc.has_commit(&id)? {
            if !workspace.has_remote() {
                return Err(Error::CommitNotFound(id).into());
            }
            let client = workspace.client()?;
            let spinner = ProgressTracker::new(self.quiet).spinner(&format!("Fetching {id}"));
            let result = fetch_commit(&client, &workspace.wc, &id).await;
            spinner.finish_and_clear();
            result?;
        }

        let commit = workspace.wc.load_commit(&id)?;
        let outcome = workspace
            .wc
            .materialize(&commit.files, policy)
            .with_context(|| format!("Failed to restore files of commit {id}"))?;

        if !self.quiet {
            output::success(&format!("Reverted to commit {id}"));
            output::detail("Message", &commit.meta.message);
            for name in &outcome.written {
                output::item(&format!("restored {name}"));
            }
            for name in &outcome.removed {
                output::item(&format!("removed {name}"));
            }
        }

        Ok(())
    }
}
