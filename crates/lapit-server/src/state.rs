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
use lapit_config::{MetadataConfig, ServerConfig, StorageConfig};
use lapit_metadata::{MemoryMetadataStore, MetadataStore, SqliteMetadataStore};
use lapit_storage::{mock::MockBackend, LocalBackend, S3Backend, S3Config, StorageBackend};
use lapit_sync::{CleanupConfig, SyncEngine};
use std::sync::Arc;

/// Shared server state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Push, pull and teardown over the configured stores
    pub engine: SyncEngine,
}

impl AppState {
    /// Wrap an existing engine
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// State backed by in-memory stores (for development and tests)
    pub fn in_memory() -> Self {
        Self::new(SyncEngine::new(
            Arc::new(MockBackend::new()),
            Arc::new(MemoryMetadataStore::new()),
            CleanupConfig::default(),
        ))
    }

    /// Open the blob and metadata stores named by the configuration
    ///
    /// Must be called inside a tokio runtime: the cleanup worker is spawned
    /// here.
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.storage {
            StorageConfig::Local { root } => {
                tracing::info!("Blob store: local directory {:?}", root);
                let local = LocalBackend::new(root)
                    .await
                    .with_context(|| format!("Failed to open blob directory {}", root.display()))?;
                Arc::new(local)
            }
            StorageConfig::S3 { bucket, endpoint } => {
                tracing::info!(bucket = %bucket, endpoint = ?endpoint, "Blob store: S3");
                let s3 = S3Backend::with_config(S3Config {
                    bucket: bucket.clone(),
                    endpoint: endpoint.clone(),
                    ..Default::default()
                })
                .await
                .with_context(|| format!("Failed to connect to S3 bucket {bucket}"))?;
                Arc::new(s3)
            }
            StorageConfig::Memory => {
                tracing::warn!("Blob store: in memory, nothing survives a restart");
                Arc::new(MockBackend::new())
            }
        };

        let metadata: Arc<dyn MetadataStore> = match &config.metadata {
            MetadataConfig::Sqlite { path } => {
                tracing::info!("Metadata store: sqlite {:?}", path);
                let store = SqliteMetadataStore::open(path).with_context(|| {
                    format!("Failed to open metadata database {}", path.display())
                })?;
                Arc::new(store)
            }
            MetadataConfig::Memory => {
                tracing::warn!("Metadata store: in memory, nothing survives a restart");
                Arc::new(MemoryMetadataStore::new())
            }
        };

        let cleanup = CleanupConfig {
            max_attempts: config.cleanup.max_attempts,
            retry_delay_ms: config.cleanup.retry_delay_ms,
        };

        Ok(Self::new(SyncEngine::new(backend, metadata, cleanup)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_local_and_sqlite() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            storage: StorageConfig::Local {
                root: dir.path().join("objects"),
            },
            metadata: MetadataConfig::Sqlite {
                path: dir.path().join("meta/lapit.sqlite"),
            },
            ..Default::default()
        };

        let state = AppState::from_config(&config).await.unwrap();
        let (repo, created) = state.engine.init_repository("u1", "proj").await.unwrap();
        assert!(created);
        assert_eq!(repo.name, "proj");
        assert!(dir.path().join("meta/lapit.sqlite").exists());
    }
}
