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
use console::style;

use crate::output;
use crate::repo::Workspace;

/// Show local commits, newest first
#[derive(Parser, Debug)]
pub struct LogCmd {
    /// Limit the number of commits shown
    #[arg(short = 'n', long, value_name = "NUMBER")]
    pub max_count: Option<usize>,

    /// One line per commit
    #[arg(long)]
    pub oneline: bool,
}

impl LogCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;
        let pushed = workspace.wc.pushed()?;
        let commits = workspace.wc.list_commits()?;

        if commits.is_empty() {
            output::info("No commits yet");
            return Ok(());
        }

        let limit = self.max_count.unwrap_or(usize::MAX);
        for commit in commits.iter().rev().take(limit) {
            let state = if pushed.contains(&commit.id) {
                "pushed"
            } else {
                "local"
            };

            if self.oneline {
                println!(
                    "{} {} ({})",
                    style(output::short_id(&commit.id)).yellow(),
                    commit.meta.message,
                    state
                );
                continue;
            }

            println!("{} {}", style("commit").yellow(), style(commit.id).yellow());
            println!("Date:   {}", commit.meta.date.format("%Y-%m-%d %H:%M:%S %Z"));
            println!("State:  {state}");
            println!();
            println!("    {}", commit.meta.message);
            println!();
        }

        Ok(())
    }
}
