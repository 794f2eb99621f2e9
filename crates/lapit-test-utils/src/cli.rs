// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Lapit Contributors

//! Running the `lapit` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

/// A `Command` for the `lapit` binary with colors and remote settings
/// cleared, so tests never reach a developer's server by accident.
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn lapit() -> Command {
    let mut cmd = Command::cargo_bin("lapit").expect("lapit binary not found");
    cmd.env("NO_COLOR", "1")
        .env_remove("LAPIT_REMOTE_URL")
        .env_remove("LAPIT_USER_ID")
        .env_remove("LAPIT_REPOSITORY_ID")
        .env_remove("LAPIT_BUCKET")
        .env_remove("S3_BUCKET");
    cmd
}

/// Fluent wrapper for one `lapit` invocation
pub struct LapitCommand {
    cmd: Command,
}

impl LapitCommand {
    /// Start a new invocation
    pub fn new() -> Self {
        Self { cmd: lapit() }
    }

    /// Run in `dir`
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Append arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Run and assert success
    pub fn run_success(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().success()
    }

    /// Run and assert failure
    pub fn run_failure(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().failure()
    }

    /// Run, assert failure and that stderr mentions `text`
    pub fn fails_with(self, text: &str) -> assert_cmd::assert::Assert {
        self.run_failure()
            .stderr(predicate::str::contains(text.to_string()))
    }

    /// The underlying command
    pub fn into_inner(self) -> Command {
        self.cmd
    }
}

impl Default for LapitCommand {
    fn default() -> Self {
        Self::new()
    }
}
