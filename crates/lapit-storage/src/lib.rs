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

//! Storage abstraction layer for Lapit
//!
//! This crate provides the flat key/value object store that holds commit
//! content. Three backends implement it:
//! - Local filesystem ([`LocalBackend`])
//! - AWS S3 and S3-compatible services ([`S3Backend`])
//! - In-memory with fault injection for tests ([`mock::MockBackend`])
//!
//! # Core Concepts
//!
//! - **Keys**: slash-separated strings such as `commits/<id>/notes.txt`
//! - **Objects**: arbitrary bytes stored under a key
//! - **Prefixes**: plain string prefixes used for listing
//!
//! # Examples
//!
//! ```no_run
//! use lapit_storage::{StorageBackend, mock::MockBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = MockBackend::new();
//!
//!     storage.put("commits/abc/a.txt", b"hello").await?;
//!     assert_eq!(storage.get("commits/abc/a.txt").await?, b"hello");
//!
//!     let keys = storage.list_objects("commits/abc/").await?;
//!     assert_eq!(keys, vec!["commits/abc/a.txt".to_string()]);
//!
//!     storage.delete("commits/abc/a.txt").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Implementation Guide
//!
//! When implementing `StorageBackend`:
//!
//! 1. Use `#[async_trait]` on the impl block
//! 2. Report a missing key from `get` as [`StorageError::NotFound`]
//! 3. Reject empty keys
//! 4. Return listings sorted
//! 5. Treat deletion of a missing key as success

pub mod error;
pub mod local;
pub mod mock;
pub mod s3;

use async_trait::async_trait;
use std::fmt::Debug;

pub use error::{is_not_found, StorageError, StorageResult};
pub use local::LocalBackend;
pub use s3::{S3Backend, S3Config};

/// Storage backend trait for object storage operations
///
/// Implementations must be `Send + Sync + Debug` so a single handle can be
/// shared as `Arc<dyn StorageBackend>` between request handlers and
/// background workers.
///
/// # Errors
///
/// All operations return `anyhow::Result<T>`. Operations should return `Err` for:
/// - `get`: key doesn't exist (as [`StorageError::NotFound`])
/// - `put`: permission denied, quota exceeded, or I/O errors
/// - `exists`: only I/O or permission errors
/// - `delete`: I/O or permission errors, never for a missing key
/// - `list_objects`: permission denied or I/O errors
///
/// ```rust,no_run
/// # use lapit_storage::{StorageBackend, mock::MockBackend};
/// # use std::sync::Arc;
/// #[tokio::main]
/// async fn example() -> anyhow::Result<()> {
///     let backend: Arc<dyn StorageBackend> = Arc::new(MockBackend::new());
///
///     backend.put("my_key", b"my_data").await?;
///     assert_eq!(backend.get("my_key").await?, b"my_data");
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Retrieve an object by its key
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key doesn't exist, or an
    /// error if the key is empty or the backend fails.
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;

    /// Store an object under the given key, overwriting any previous value
    ///
    /// Readers never observe a partially written object.
    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Delete an object
    ///
    /// Deleting a non-existent object succeeds.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// List every key starting with `prefix`, sorted
    ///
    /// An empty prefix lists everything. No matches is an empty vec, not an error.
    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _check_object_safe(_: &dyn StorageBackend) {}
    }
}
