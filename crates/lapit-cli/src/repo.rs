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

//! Locating the working copy and its remote

use anyhow::{Context, Result};
use lapit_config::{EnvOverrides, Validator, WorkspaceConfig};
use lapit_metadata::RepositoryId;
use lapit_protocol::ProtocolClient;
use lapit_versioning::WorkingCopy;

/// An opened working copy with its configuration
#[derive(Debug)]
pub struct Workspace {
    /// `.lapit/` state
    pub wc: WorkingCopy,
    /// `.lapit/config.toml` with environment overrides applied
    pub config: WorkspaceConfig,
}

impl Workspace {
    /// Open the working copy containing the current directory
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let wc = WorkingCopy::discover(&cwd)
            .context("Not a lapit repository (run `lapit init` first)")?;
        let config = load_config(&wc)?;
        Ok(Self { wc, config })
    }

    /// Client for the configured remote
    pub fn client(&self) -> Result<ProtocolClient> {
        let url = self
            .config
            .remote_url()
            .context("No remote configured (use `lapit init --remote <URL>`)")?;
        Ok(ProtocolClient::new(url))
    }

    /// Whether a remote URL is configured
    pub fn has_remote(&self) -> bool {
        self.config.remote_url().is_ok()
    }

    /// The remote repository this working copy pushes to
    pub fn repository_id(&self) -> Result<RepositoryId> {
        let id = self
            .config
            .repository_id()
            .context("No remote repository recorded (run `lapit init --remote <URL>`)")?;
        id.parse().with_context(|| {
            format!("Invalid repository.id in {}", self.wc.config_path().display())
        })
    }

    /// The configured user id
    pub fn user_id(&self) -> Result<&str> {
        self.config
            .user_id()
            .context("No user configured (use `lapit init --user <ID>`)")
    }
}

/// Read `.lapit/config.toml`, apply `LAPIT_*` overrides and validate
pub fn load_config(wc: &WorkingCopy) -> Result<WorkspaceConfig> {
    let path = wc.config_path();
    let mut config = WorkspaceConfig::load(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    config.apply_env_overrides()?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}
