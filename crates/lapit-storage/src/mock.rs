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

//! In-memory storage backend with fault injection
//!
//! Provides a thread-safe, in-memory implementation of [`StorageBackend`](crate::StorageBackend)
//! using `Arc<RwLock<HashMap>>`. Besides serving as the `memory` backend of
//! the server, it can be told to fail writes, deletes or listings for keys
//! containing a pattern, which is how partial-upload and teardown failures
//! are tested.
//!
//! # Examples
//!
//! ```rust,no_run
//! use lapit_storage::{StorageBackend, mock::MockBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = MockBackend::new();
//!     storage.fail_puts_matching("b.txt").await;
//!
//!     storage.put("commits/x/a.txt", b"A").await?;
//!     assert!(storage.put("commits/x/b.txt", b"B").await.is_err());
//!     Ok(())
//! }
//! ```

use crate::error::{validate_key, StorageError};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage backend
///
/// Clones share state, so a test can keep one handle for inspection while
/// the code under test owns another.
#[derive(Clone)]
pub struct MockBackend {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    put_failures: Arc<RwLock<HashSet<String>>>,
    delete_failures: Arc<RwLock<HashSet<String>>>,
    list_failures: Arc<RwLock<HashSet<String>>>,
    put_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new empty mock storage backend
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Create a mock storage backend with initial data
    pub fn with_data(initial_data: HashMap<String, Vec<u8>>) -> Self {
        MockBackend {
            store: Arc::new(RwLock::new(initial_data)),
            put_failures: Arc::new(RwLock::new(HashSet::new())),
            delete_failures: Arc::new(RwLock::new(HashSet::new())),
            list_failures: Arc::new(RwLock::new(HashSet::new())),
            put_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every `put` whose key contains `pattern` fail
    pub async fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.put_failures.write().await.insert(pattern.into());
    }

    /// Make every `delete` whose key contains `pattern` fail
    pub async fn fail_deletes_matching(&self, pattern: impl Into<String>) {
        self.delete_failures.write().await.insert(pattern.into());
    }

    /// Make every `list_objects` whose prefix contains `pattern` fail
    pub async fn fail_lists_matching(&self, pattern: impl Into<String>) {
        self.list_failures.write().await.insert(pattern.into());
    }

    /// Remove all injected failures
    pub async fn heal(&self) {
        self.put_failures.write().await.clear();
        self.delete_failures.write().await.clear();
        self.list_failures.write().await.clear();
    }

    /// Number of `put` calls attempted so far, failed ones included
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Get the current number of objects stored
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Check if the storage is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Get a sorted copy of all stored keys
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.store.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn injected(set: &RwLock<HashSet<String>>, key: &str) -> bool {
        set.read().await.iter().any(|pattern| key.contains(pattern.as_str()))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend").finish()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        validate_key(key)?;

        let store = self.store.read().await;
        store
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key).into())
    }

    async fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        validate_key(key)?;
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        if Self::injected(&self.put_failures, key).await {
            return Err(StorageError::Injected(format!("put {key}")).into());
        }

        let mut store = self.store.write().await;
        store.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        validate_key(key)?;

        let store = self.store.read().await;
        Ok(store.contains_key(key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        validate_key(key)?;

        if Self::injected(&self.delete_failures, key).await {
            return Err(StorageError::Injected(format!("delete {key}")).into());
        }

        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        if Self::injected(&self.list_failures, prefix).await {
            return Err(StorageError::Injected(format!("list {prefix}")).into());
        }

        let store = self.store.read().await;
        let mut results: Vec<String> = store
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_not_found;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MockBackend::new();

        backend.put("key1", b"test data").await.unwrap();
        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.get("key1").await.unwrap(), b"test data");
    }

    #[tokio::test]
    async fn test_get_nonexistent_is_not_found() {
        let backend = MockBackend::new();
        let err = backend.get("nonexistent").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_empty_key_operations() {
        let backend = MockBackend::new();

        assert!(backend.put("", b"data").await.is_err());
        assert!(backend.get("").await.is_err());
        assert!(backend.exists("").await.is_err());
        assert!(backend.delete("").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MockBackend::new();

        backend.put("key1", b"data").await.unwrap();
        backend.delete("key1").await.unwrap();
        assert!(!backend.exists("key1").await.unwrap());
        backend.delete("key1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_objects_by_prefix() {
        let backend = MockBackend::new();

        backend.put("commits/b/x.txt", b"1").await.unwrap();
        backend.put("commits/a/y.txt", b"2").await.unwrap();
        backend.put("other/z.txt", b"3").await.unwrap();

        let commits = backend.list_objects("commits/").await.unwrap();
        assert_eq!(commits, vec!["commits/a/y.txt", "commits/b/x.txt"]);
        assert!(backend.list_objects("nope/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let backend = MockBackend::new();
        backend.fail_puts_matching("b.txt").await;

        backend.put("commits/c/a.txt", b"A").await.unwrap();
        assert!(backend.put("commits/c/b.txt", b"B").await.is_err());
        assert_eq!(backend.put_calls(), 2);
        assert_eq!(backend.keys().await, vec!["commits/c/a.txt"]);

        backend.heal().await;
        backend.put("commits/c/b.txt", b"B").await.unwrap();
        assert_eq!(backend.len().await, 2);
    }

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let backend = MockBackend::new();
        backend.put("commits/c/a.txt", b"A").await.unwrap();
        backend.fail_deletes_matching("commits/c/").await;

        assert!(backend.delete("commits/c/a.txt").await.is_err());
        assert!(backend.exists("commits/c/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_list_failure() {
        let backend = MockBackend::new();
        backend.put("commits/c/a.txt", b"A").await.unwrap();
        backend.fail_lists_matching("commits/c/").await;

        assert!(backend.list_objects("commits/c/").await.is_err());
        assert_eq!(backend.list_objects("commits/").await.unwrap().len(), 1);

        backend.heal().await;
        assert_eq!(
            backend.list_objects("commits/c/").await.unwrap(),
            vec!["commits/c/a.txt"]
        );
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let backend1 = MockBackend::new();
        backend1.put("key1", b"data").await.unwrap();

        let backend2 = backend1.clone();
        backend2.put("key2", b"data").await.unwrap();
        assert_eq!(backend1.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let backend = MockBackend::new();

        let mut handles = Vec::new();
        for task in 0..4 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    let key = format!("task{task}_key{i}");
                    backend.put(&key, b"data").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(backend.len().await, 40);
    }
}
