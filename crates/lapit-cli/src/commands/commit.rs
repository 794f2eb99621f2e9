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

use crate::output;
use crate::repo::Workspace;

/// Record the staged files as a new commit
///
/// The staging area is drained into `.lapit/commits/<id>/`. Committing with
/// nothing staged fails unless `--allow-empty` is given or
/// `[commit] allow_empty = true` is set.
#[derive(Parser, Debug)]
pub struct CommitCmd {
    /// Commit message
    #[arg(short, long, value_name = "MESSAGE")]
    pub message: String,

    /// Allow a commit with no files
    #[arg(long)]
    pub allow_empty: bool,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommitCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;
        let allow_empty = self.allow_empty || workspace.config.commit.allow_empty;

        let id = workspace
            .wc
            .commit(&self.message, allow_empty)
            .context("Failed to create commit")?;

        if !self.quiet {
            let files = workspace.wc.load_commit(&id)?.files.len();
            output::success(&format!(
                "Commit {id} created with message: {:?}",
                self.message
            ));
            output::detail("Files", &files.to_string());
        }

        Ok(())
    }
}
