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

//! Configuration for Lapit
//!
//! - [`WorkspaceConfig`]: `.lapit/config.toml` of a working copy
//! - [`ServerConfig`]: `lapit-server.{toml,yaml,json}`, read through
//!   [`ConfigLoader`]
//!
//! Both accept environment overrides through [`EnvOverrides`] and are
//! checked by [`Validator`].
//!
//! ```
//! use lapit_config::{ConfigFormat, ConfigLoader, ServerConfig};
//!
//! let config: ServerConfig = ConfigLoader::new()
//!     .load_from_string("port = 4000\n[metadata]\nbackend = \"memory\"\n", ConfigFormat::Toml)
//!     .unwrap();
//! assert_eq!(config.bind_addr(), "127.0.0.1:4000");
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validation::{EnvOverrides, Validator};
