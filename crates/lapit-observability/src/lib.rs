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

//! Structured logging for Lapit binaries
//!
//! Library crates only emit `tracing` events; the `lapit` CLI and
//! `lapit-server` install a subscriber here, in pretty, compact or JSON
//! form. `LAPIT_LOG_FORMAT` picks the format, `RUST_LOG` the filter.

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput, LOG_FORMAT_ENV};
pub use initialization::{init_tracing, init_tracing_with_config};
