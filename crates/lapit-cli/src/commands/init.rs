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
use lapit_config::{Validator, WorkspaceConfig};
use lapit_protocol::{InitRequest, ProtocolClient};
use lapit_versioning::WorkingCopy;
use std::fs;
use std::path::{Path, PathBuf};

use crate::output;
use crate::progress::ProgressTracker;

/// Initialize a Lapit working copy
///
/// Creates `.lapit/` with an empty staging area. With `--remote` and
/// `--user` the repository is also created on the server (or found, if the
/// user already has one with this name) and its id is recorded in
/// `.lapit/config.toml`.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Local only
    lapit init

    # Connect to a server
    lapit init --remote http://localhost:3000 --user alice --name notes")]
pub struct InitCmd {
    /// Directory to initialize (defaults to the current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Remote server URL
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// User id on the remote
    #[arg(long, value_name = "ID")]
    pub user: Option<String>,

    /// Repository name on the remote (defaults to the directory name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl InitCmd {
    pub async fn execute(&self) -> Result<()> {
        let root = self.repo_path()?;
        let wc = WorkingCopy::init(&root)
            .with_context(|| format!("Failed to initialize {}", root.display()))?;

        let config_path = wc.config_path();
        let mut config = WorkspaceConfig::load(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        self.apply_options(&mut config, &root);
        config.validate().context("Invalid init options")?;

        let remote = config.remote_url().ok().map(str::to_string);
        let user = config.user_id().ok().map(str::to_string);
        if let (Some(url), Some(user_id)) = (remote, user) {
            let client = ProtocolClient::new(url.as_str());
            let name = config
                .repository
                .name
                .clone()
                .unwrap_or_else(|| directory_name(&root));

            let spinner = ProgressTracker::new(self.quiet).spinner("Contacting remote...");
            let response = client
                .init(&InitRequest {
                    user_id,
                    repo_name: name.clone(),
                })
                .await
                .with_context(|| format!("Failed to create repository {name:?} on {url}"));
            spinner.finish_and_clear();
            let response = response?;

            tracing::info!(
                repository_id = %response.repository_id,
                created = response.created,
                "Remote repository ready"
            );
            config.repository.id = Some(response.repository_id.to_string());
            config.repository.name = Some(response.repo_name);
            if !self.quiet {
                output::info(&response.message);
            }
        }

        config
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        if !self.quiet {
            output::success(&format!(
                "Initialized Lapit repository in {}",
                wc.lapit_dir().display()
            ));
            if let Ok(url) = config.remote_url() {
                output::detail("Remote", url);
            }
            if let Ok(id) = config.repository_id() {
                output::detail("Repository", id);
            }
            if let Some(bucket) = &config.remote.bucket {
                output::detail("Bucket", bucket);
            }
        }

        Ok(())
    }

    fn repo_path(&self) -> Result<PathBuf> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        path.canonicalize().context("Failed to canonicalize path")
    }

    fn apply_options(&self, config: &mut WorkspaceConfig, root: &Path) {
        if let Some(remote) = &self.remote {
            config.remote.url = Some(remote.clone());
        }
        if let Some(user) = &self.user {
            config.user.id = Some(user.clone());
        }
        if let Some(name) = &self.name {
            config.repository.name = Some(name.clone());
        } else if config.repository.name.is_none() {
            config.repository.name = Some(directory_name(root));
        }
        if config.remote.bucket.is_none() {
            config.remote.bucket = std::env::var("LAPIT_BUCKET")
                .or_else(|_| std::env::var("S3_BUCKET"))
                .ok()
                .filter(|b| !b.trim().is_empty());
        }
    }
}

fn directory_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lapit".to_string())
}
