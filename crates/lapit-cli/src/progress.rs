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

//! Progress bars for network transfers
//!
//! Bars draw on stderr so stdout stays clean for piping, and disappear when
//! stderr is not a terminal.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_CHARS: &str = "█▓░";

/// Creates progress bars, or hidden ones in quiet mode
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    multi: MultiProgress,
    quiet: bool,
}

impl ProgressTracker {
    /// Create a tracker drawing on stderr
    pub fn new(quiet: bool) -> Self {
        let target = if quiet {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            quiet,
        }
    }

    /// Bar counting commits
    pub fn commit_bar(&self, msg: &str, total: u64) -> ProgressBar {
        self.bar(
            msg,
            total,
            "{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} commits",
        )
    }

    /// Spinner for a single request
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn bar(&self, msg: &str, total: u64, template: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style.progress_chars(BAR_CHARS));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
