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

mod commands;
mod output;
mod progress;
mod repo;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use lapit_observability::{init_tracing, LogFormat};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lapit")]
#[command(version, about = "Stage, commit and sync small repositories")]
#[command(
    long_about = "Lapit keeps whole-file snapshots of a directory. Files are staged with
`add`, snapshotted with `commit`, sent to a Lapit server with `push` and
fetched back with `pull` or `revert`."
)]
#[command(propagate_version = true)]
#[command(author = "Lapit Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Run as if started in PATH
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a working copy, optionally on a remote too
    Init(InitCmd),

    /// Stage files for the next commit
    Add(AddCmd),

    /// Record the staged files as a commit
    Commit(CommitCmd),

    /// Push local commits to the remote
    Push(PushCmd),

    /// Fetch commits from the remote
    Pull(PullCmd),

    /// Restore the working directory to a commit
    Revert(RevertCmd),

    /// Show staged files and unpushed commits
    Status(StatusCmd),

    /// Show local commits
    Log(LogCmd),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let format = LogFormat::from_env_or(LogFormat::Pretty)?;
    // Logging is best effort for the CLI.
    init_tracing(format, Some(level)).ok();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        "auto" => {}
        other => {
            output::error(&format!("Invalid color option: {other}"));
            std::process::exit(2);
        }
    }

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Cannot change to {}", dir.display()))?;
    }

    let result = match cli.command {
        Commands::Init(cmd) => cmd.execute().await,
        Commands::Add(cmd) => cmd.execute().await,
        Commands::Commit(cmd) => cmd.execute().await,
        Commands::Push(cmd) => cmd.execute().await,
        Commands::Pull(cmd) => cmd.execute().await,
        Commands::Revert(cmd) => cmd.execute().await,
        Commands::Status(cmd) => cmd.execute().await,
        Commands::Log(cmd) => cmd.execute().await,
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "lapit", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("Error: {e:#}"));
        std::process::exit(1);
    }

    Ok(())
}
