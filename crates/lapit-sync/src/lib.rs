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

//! Synchronization between a blob store and a metadata store
//!
//! A commit moves through `Staged -> Committed-Local -> Pushed -> Available`.
//! The local half lives in `lapit-versioning`; this crate owns the remote
//! half:
//!
//! - [`SyncEngine::push`] uploads every blob and only then records metadata
//! - [`SyncEngine::pull`] serves recorded commits only
//! - [`SyncEngine::delete_repository`] removes metadata first and hands blob
//!   deletions that fail to the [`CleanupQueue`]
//!
//! ```no_run
//! use lapit_metadata::MemoryMetadataStore;
//! use lapit_storage::mock::MockBackend;
//! use lapit_sync::{CleanupConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> lapit_versioning::Result<()> {
//! let engine = SyncEngine::new(
//!     Arc::new(MockBackend::new()),
//!     Arc::new(MemoryMetadataStore::new()),
//!     CleanupConfig::default(),
//! );
//! let (repo, created) = engine.init_repository("user-1", "photos").await?;
//! assert!(created);
//! assert!(engine.list_commits(&repo.id).await?.is_empty());
//! # Ok(())
//! # }
//! ```

mod cleanup;
mod engine;

pub use cleanup::{CleanupConfig, CleanupJob, CleanupQueue, CleanupStats};
pub use engine::{
    DeletedRepository, PulledCommit, PushCommit, PushOutcome, SyncEngine, UploadOutcome,
};
