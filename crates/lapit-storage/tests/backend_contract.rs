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

//! Behaviour every backend must share, run against the in-memory and
//! filesystem implementations.

use lapit_storage::mock::MockBackend;
use lapit_storage::{is_not_found, LocalBackend, StorageBackend};
use std::sync::Arc;
use tempfile::TempDir;

async fn exercise(backend: Arc<dyn StorageBackend>) {
    backend.put("commits/one/a.txt", b"alpha").await.unwrap();
    backend.put("commits/one/b.txt", b"").await.unwrap();
    backend.put("commits/two/a.txt", b"beta").await.unwrap();

    assert_eq!(backend.get("commits/one/a.txt").await.unwrap(), b"alpha");
    assert!(backend.get("commits/one/b.txt").await.unwrap().is_empty());

    let missing = backend.get("commits/one/zzz.txt").await.unwrap_err();
    assert!(is_not_found(&missing));

    assert_eq!(
        backend.list_objects("commits/one/").await.unwrap(),
        vec!["commits/one/a.txt", "commits/one/b.txt"]
    );
    // Plain string prefix: "commits/one" must not match "commits/two".
    assert_eq!(backend.list_objects("commits/t").await.unwrap().len(), 1);

    backend.delete("commits/one/a.txt").await.unwrap();
    backend.delete("commits/one/a.txt").await.unwrap();
    assert!(!backend.exists("commits/one/a.txt").await.unwrap());
    assert!(backend.exists("commits/two/a.txt").await.unwrap());
}

#[tokio::test]
async fn mock_backend_honours_contract() {
    exercise(Arc::new(MockBackend::new())).await;
}

#[tokio::test]
async fn local_backend_honours_contract() {
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path()).await.unwrap();
    exercise(Arc::new(backend)).await;
}
