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
use lapit_protocol::{ProtocolClient, PullResponse};
use lapit_versioning::{CommitId, CommitMeta, FileBlob, WorkingCopy};

use crate::output;
use crate::progress::ProgressTracker;
use crate::repo::Workspace;

/// Fetch commits from the remote into `.lapit/commits/`
///
/// With a commit id, that commit is fetched. Without one, every commit of
/// the configured repository missing locally is fetched. Working files are
/// not touched; use `lapit revert` for that.
#[derive(Parser, Debug)]
pub struct PullCmd {
    /// Commit to fetch
    #[arg(value_name = "COMMIT")]
    pub commit: Option<String>,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,
}

impl PullCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;
        let client = workspace.client()?;
        let progress = ProgressTracker::new(self.quiet);

        if let Some(commit) = &self.commit {
            let id: CommitId = commit.parse()?;
            let spinner = progress.spinner(&format!("Fetching {id}"));
            let result = fetch_commit(&client, &workspace.wc, &id).await;
            spinner.finish_and_clear();
            let files = result?;
            if !self.quiet {
                output::success(&format!("Pulled commit {id}"));
                output::detail("Files", &files.to_string());
            }
            return Ok(());
        }

        let repository_id = workspace.repository_id()?;
        let remote = client
            .list_commits(&repository_id)
            .await
            .context("Failed to list remote commits")?
            .commits;

        let mut missing = Vec::new();
        for record in &remote {
            if !workspace.wc.has_commit(&record.commit_id)? {
                missing.push(record.commit_id);
            }
        }

        if missing.is_empty() {
            if !self.quiet {
                output::info("Already up-to-date");
            }
            return Ok(());
        }

        // Oldest first, matching push order.
        missing.reverse();
        let pb = progress.commit_bar("Pulling", missing.len() as u64);
        for id in &missing {
            if let Err(e) = fetch_commit(&client, &workspace.wc, id).await {
                pb.abandon();
                return Err(e);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !self.quiet {
            output::success(&format!("Pulled {} commit(s)", missing.len()));
            for id in &missing {
                output::item(&id.to_string());
            }
        }
        Ok(())
    }
}

/// Fetch one commit, save it locally and mark it pushed; returns its file count
pub(crate) async fn fetch_commit(
    client: &ProtocolClient,
    wc: &WorkingCopy,
    id: &CommitId,
) -> Result<usize> {
    let PullResponse {
        message,
        committed_at,
        files,
        ..
    } = client
        .pull(id)
        .await
        .with_context(|| format!("Failed to pull commit {id}"))?;

    let files: Vec<FileBlob> = files.into_iter().map(FileBlob::from).collect();
    let meta = CommitMeta {
        message,
        date: committed_at,
    };
    wc.store_commit(id, &meta, &files)
        .with_context(|| format!("Failed to save commit {id}"))?;
    // Already on the remote.
    wc.mark_pushed(id)?;

    tracing::info!(commit_id = %id, files = files.len(), "Pulled commit");
    Ok(files.len())
}
