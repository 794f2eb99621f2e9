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
use lapit_protocol::{PushRequest, WireFile};
use std::time::Instant;

use crate::output;
use crate::progress::ProgressTracker;
use crate::repo::Workspace;

/// Push local commits to the remote
///
/// Commits not yet in the push ledger are sent oldest first, each with its
/// files and metadata in one request. A commit is marked pushed only after
/// the server has recorded it, so an interrupted push can simply be run
/// again.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Push every unpushed commit
    lapit push

    # Show what would be pushed
    lapit push --dry-run")]
pub struct PushCmd {
    /// List the commits that would be pushed without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,
}

impl PushCmd {
    pub async fn execute(&self) -> Result<()> {
        let start_time = Instant::now();
        let workspace = Workspace::discover()?;
        let pending = workspace.wc.unpushed_commits()?;

        if pending.is_empty() {
            if !self.quiet {
                output::info("Everything up-to-date");
            }
            return Ok(());
        }

        if self.dry_run {
            if !self.quiet {
                output::header(&format!("{} commit(s) would be pushed", pending.len()));
                for commit in &pending {
                    output::item(&format!(
                        "{} {}",
                        output::short_id(&commit.id),
                        commit.meta.message
                    ));
                }
            }
            return Ok(());
        }

        let client = workspace.client()?;
        let repository_id = workspace.repository_id()?;
        let user_id = workspace.user_id()?.to_string();

        if !self.quiet {
            output::header(&format!(
                "Pushing {} commit(s) to {}",
                pending.len(),
                client.base_url()
            ));
        }

        let pb = ProgressTracker::new(self.quiet).commit_bar("Pushing", pending.len() as u64);
        let mut recorded = 0usize;
        let mut files = 0usize;

        for summary in &pending {
            let commit = workspace.wc.load_commit(&summary.id)?;
            files += commit.files.len();

            let request = PushRequest {
                commit_id: commit.id,
                files: commit.files.into_iter().map(WireFile::from).collect(),
                repository_id: Some(repository_id),
                message: Some(commit.meta.message),
                user_id: Some(user_id.clone()),
                committed_at: Some(commit.meta.date),
            };
            let response = match client.push(&request).await {
                Ok(response) => response,
                Err(e) => {
                    pb.abandon();
                    return Err(e).with_context(|| format!("Failed to push commit {}", summary.id));
                }
            };

            workspace.wc.mark_pushed(&summary.id)?;
            if response.recorded {
                recorded += 1;
            }
            tracing::debug!(commit_id = %summary.id, "{}", response.message);
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !self.quiet {
            output::success(&format!("Pushed {} commit(s)", pending.len()));
            output::detail("Recorded", &recorded.to_string());
            output::detail("Already on remote", &(pending.len() - recorded).to_string());
            output::detail("Files", &files.to_string());
            output::detail("Elapsed", &format!("{:.2?}", start_time.elapsed()));
        }

        Ok(())
    }
}
