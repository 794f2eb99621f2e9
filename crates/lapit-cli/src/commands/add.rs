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
use std::path::PathBuf;

use crate::output;
use crate::repo::Workspace;

/// Stage files for the next commit
///
/// Each file is copied into `.lapit/staging/` under its base name. Staging
/// a file with the same name again replaces the staged copy.
#[derive(Parser, Debug)]
pub struct AddCmd {
    /// Files to stage
    #[arg(value_name = "PATHS", required = true)]
    pub paths: Vec<PathBuf>,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,
}

impl AddCmd {
    pub async fn execute(&self) -> Result<()> {
        let workspace = Workspace::discover()?;

        for path in &self.paths {
            let name = workspace
                .wc
                .add(path)
                .with_context(|| format!("Failed to stage {}", path.display()))?;
            if !self.quiet {
                output::success(&format!("File {name} added to the staging area"));
            }
        }

        Ok(())
    }
}
