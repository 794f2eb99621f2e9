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

//! Configuration types
//!
//! [`WorkspaceConfig`] is the `.lapit/config.toml` of a working copy.
//! [`ServerConfig`] configures `lapit-server`.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration of a local working copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Remote server and bucket
    pub remote: RemoteSection,
    /// Acting user
    pub user: UserSection,
    /// Remote repository this working copy pushes to
    pub repository: RepositorySection,
    /// Commit behaviour
    pub commit: CommitSection,
    /// Revert behaviour
    pub revert: RevertSection,
}

/// `[remote]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Base URL of the Lapit server, e.g. `http://localhost:3000`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Blob bucket the server stores this repository in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

/// `[user]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    /// Author and owner reference sent to the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `[repository]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySection {
    /// Remote repository id, set by `lapit init --remote`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Repository name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `[commit]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSection {
    /// Permit commits with nothing staged
    pub allow_empty: bool,
}

/// `[revert]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevertSection {
    /// Remove files that are not in the target commit
    pub clean: bool,
}

impl WorkspaceConfig {
    /// Read `path`, or return the default configuration if it doesn't exist
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loaded working copy configuration: {}", path.display());
                Ok(toml::from_str(&content)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the configuration as TOML, replacing `path` atomically
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Remote URL without a trailing slash
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingRequired`] if no remote is configured.
    pub fn remote_url(&self) -> ConfigResult<&str> {
        self.remote
            .url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("remote.url".to_string()))
    }

    /// Configured user id
    pub fn user_id(&self) -> ConfigResult<&str> {
        self.user
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("user.id".to_string()))
    }

    /// Configured remote repository id
    pub fn repository_id(&self) -> ConfigResult<&str> {
        self.repository
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("repository.id".to_string()))
    }
}

/// Configuration of `lapit-server`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Largest accepted request body
    pub body_limit_bytes: usize,
    /// Blob store
    pub storage: StorageConfig,
    /// Metadata store
    pub metadata: MetadataConfig,
    /// Orphaned blob cleanup
    pub cleanup: CleanupSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            body_limit_bytes: 64 * 1024 * 1024,
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
            cleanup: CleanupSettings::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Blob store backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem
    Local {
        /// Directory holding the blobs
        root: PathBuf,
    },
    /// S3 or an S3-compatible service
    S3 {
        /// Bucket name
        bucket: String,
        /// Custom endpoint, e.g. MinIO
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Process memory, lost on restart
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            root: PathBuf::from("lapit-data/objects"),
        }
    }
}

/// Metadata store backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file
    Sqlite {
        /// Database path
        path: PathBuf,
    },
    /// Process memory, lost on restart
    Memory,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig::Sqlite {
            path: PathBuf::from("lapit-data/metadata.sqlite"),
        }
    }
}

/// `[cleanup]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Attempts per orphaned blob, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub retry_delay_ms: u64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_workspace_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = WorkspaceConfig::load(dir.path().join("config.toml")).unwrap();
        assert_eq!(config, WorkspaceConfig::default());
        assert!(matches!(config.remote_url(), Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_workspace_config_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = WorkspaceConfig::default();
        config.remote.url = Some("http://localhost:3000/".into());
        config.remote.bucket = Some("blobs".into());
        config.user.id = Some("user-1".into());
        config.revert.clean = true;
        config.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[remote]"));
        assert!(!text.contains("[repository]\nid"));

        let loaded = WorkspaceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.remote_url().unwrap(), "http://localhost:3000");
        assert_eq!(loaded.user_id().unwrap(), "user-1");
        assert!(loaded.repository_id().is_err());
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert!(matches!(config.storage, StorageConfig::Local { .. }));
        assert!(matches!(config.metadata, MetadataConfig::Sqlite { .. }));
    }
}
