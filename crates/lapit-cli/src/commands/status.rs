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

use anyhow::Result;
use clap::Parser;

use crate::output;
use crate::repo::Workspace;

/// Show staged files and unpushed commits
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Machine-readable output: one `staged <file>` or `unpushed <id>` per line
    #[arg(long)]
    pub porcelain: bool,
}

impl StatusCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;
        let staged = workspace.wc.staging().list()?;
        let unpushed = workspace.wc.unpushed_commits()?;

        if self.porcelain {
            for name in &staged {
                println!("staged {name}");
            }
            for commit in &unpushed {
                println!("unpushed {}", commit.id);
            }
            return Ok(());
        }

        output::header("Repository status");
        match workspace.config.remote_url() {
            Ok(url) => output::detail("Remote", url),
            Err(_) => output::detail("Remote", "(none)"),
        }

        if staged.is_empty() {
            output::info("Nothing staged");
        } else {
            output::info(&format!("Staged files ({}):", staged.len()));
            for name in &staged {
                output::item(name);
            }
        }

        if unpushed.is_empty() {
            output::info("No unpushed commits");
        } else {
            output::warning(&format!("{} unpushed commit(s)", unpushed.len()));
            for commit in &unpushed {
                output::item(&format!(
                    "{} {}",
                    output::short_id(&commit.id),
                    commit.meta.message
                ));
            }
        }

        Ok(())
    }
}
