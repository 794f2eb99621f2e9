// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Lapit Contributors

//! # Lapit Test Utilities
//!
//! Shared helpers for the `lapit` CLI tests:
//! - [`lapit`] and [`LapitCommand`] to run the binary
//! - [`TestRepo`], a temporary working copy removed on drop

pub mod cli;
pub mod repo;

pub use cli::{lapit, LapitCommand};
pub use repo::TestRepo;
