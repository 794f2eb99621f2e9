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

//! Push, pull, revert and teardown against an in-memory blob store.

use lapit_metadata::{MemoryMetadataStore, MetadataStore, NewCommit, RepositoryId};
use lapit_storage::mock::MockBackend;
use lapit_storage::StorageBackend;
use lapit_sync::{CleanupConfig, PushCommit, PushOutcome, SyncEngine, UploadOutcome};
use lapit_versioning::{
    commit_key, commit_prefix, manifest_for, CommitId, Error, ErrorCode, FileBlob, RevertPolicy,
    WorkingCopy,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    backend: MockBackend,
    metadata: Arc<MemoryMetadataStore>,
    engine: SyncEngine,
}

fn harness() -> Harness {
    let backend = MockBackend::new();
    let metadata = Arc::new(MemoryMetadataStore::new());
    let engine = SyncEngine::new(
        Arc::new(backend.clone()),
        metadata.clone(),
        CleanupConfig {
            max_attempts: 2,
            retry_delay_ms: 1,
        },
    );
    Harness {
        backend,
        metadata,
        engine,
    }
}

fn push_of(repository_id: RepositoryId, commit_id: CommitId, files: Vec<FileBlob>) -> PushCommit {
    PushCommit {
        repository_id,
        commit_id,
        message: "first".to_string(),
        author_id: "user-1".to_string(),
        files,
        committed_at: None,
    }
}

fn sorted(mut files: Vec<FileBlob>) -> Vec<FileBlob> {
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    files
}

#[tokio::test]
async fn staged_files_survive_push_and_pull() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();

    let dir = TempDir::new().unwrap();
    let wc = WorkingCopy::init(dir.path()).unwrap();
    std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("b.txt"), "world").unwrap();
    wc.add(&dir.path().join("a.txt")).unwrap();
    wc.add(&dir.path().join("b.txt")).unwrap();
    let id = wc.commit("first", false).unwrap();

    let local = wc.load_commit(&id).unwrap();
    let outcome = h
        .engine
        .push(push_of(repo.id, id, local.files.clone()))
        .await
        .unwrap();
    assert!(outcome.is_new());

    let pulled = h.engine.pull(&id).await.unwrap();
    assert_eq!(
        sorted(pulled.files),
        vec![FileBlob::new("a.txt", "hello"), FileBlob::new("b.txt", "world")]
    );
    assert_eq!(pulled.record.message, "first");
    assert_eq!(pulled.record.storage_prefix, format!("commits/{id}/"));
}

#[tokio::test]
async fn repeated_push_is_a_no_op() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    let files = vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")];

    h.engine.push(push_of(repo.id, id, files.clone())).await.unwrap();
    let puts = h.backend.put_calls();
    assert_eq!(puts, 2);

    let again = h.engine.push(push_of(repo.id, id, files.clone())).await.unwrap();
    assert!(matches!(again, PushOutcome::AlreadyRecorded(_)));
    assert_eq!(h.backend.put_calls(), puts);

    let upload = h.engine.upload(&id, &files).await.unwrap();
    assert_eq!(upload, UploadOutcome::AlreadyRecorded);
    assert_eq!(h.backend.put_calls(), puts);

    assert_eq!(h.metadata.list_commits(&repo.id).await.unwrap().len(), 1);
    assert_eq!(h.backend.len().await, 2);
}

#[tokio::test]
async fn failed_upload_records_nothing() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    h.backend.fail_puts_matching("b.txt").await;

    let err = h
        .engine
        .push(push_of(
            repo.id,
            id,
            vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")],
        ))
        .await
        .unwrap_err();
    match &err {
        Error::Storage { failed_keys, .. } => {
            assert_eq!(failed_keys, &vec![commit_key(&id, "b.txt")])
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(h.metadata.get_commit(&id).await.unwrap().is_none());
    let err = h.engine.pull(&id).await.unwrap_err();
    assert!(matches!(err, Error::CommitNotFound(missing) if missing == id));
    assert_eq!(err.code(), ErrorCode::NotFound);

    // The whole push succeeds once the store recovers.
    h.backend.heal().await;
    let outcome = h
        .engine
        .push(push_of(
            repo.id,
            id,
            vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")],
        ))
        .await
        .unwrap();
    assert!(outcome.is_new());
    assert_eq!(h.engine.pull(&id).await.unwrap().files.len(), 2);
}

#[tokio::test]
async fn push_to_unknown_repository_writes_no_blobs() {
    let h = harness();
    let err = h
        .engine
        .push(push_of(
            RepositoryId::generate(),
            CommitId::generate(),
            vec![FileBlob::new("a.txt", "A")],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(h.backend.put_calls(), 0);
}

#[tokio::test]
async fn record_requires_every_blob() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    let files = vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")];
    let new = NewCommit {
        repository_id: repo.id,
        commit_id: id,
        message: "first".into(),
        author_id: "user-1".into(),
        files: manifest_for(&id, &files),
        committed_at: None,
    };

    h.engine.upload(&id, &files[..1]).await.unwrap();
    let err = h.engine.record(new.clone()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::IntegrityError);
    assert!(h.metadata.get_commit(&id).await.unwrap().is_none());

    h.engine.upload(&id, &files).await.unwrap();
    let outcome = h.engine.record(new.clone()).await.unwrap();
    assert!(outcome.is_new());
    assert!(!h.engine.record(new).await.unwrap().is_new());
}

#[tokio::test]
async fn pull_reports_missing_blob_as_integrity_error() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    h.engine
        .push(push_of(repo.id, id, vec![FileBlob::new("a.txt", "A")]))
        .await
        .unwrap();

    h.backend.delete(&commit_key(&id, "a.txt")).await.unwrap();
    let err = h.engine.pull(&id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::IntegrityError);
}

#[tokio::test]
async fn init_repository_is_idempotent() {
    let h = harness();
    let (first, created) = h.engine.init_repository("user-1", "proj").await.unwrap();
    assert!(created);
    assert_eq!(first.description, "Repository proj created via CLI");

    let (second, created) = h.engine.init_repository("user-1", "proj").await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);

    let err = h.engine.init_repository("user-1", " ").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn list_commits_newest_first() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let older = CommitId::generate();
    let newer = CommitId::generate();
    h.engine
        .push(push_of(repo.id, older, vec![FileBlob::new("a.txt", "1")]))
        .await
        .unwrap();
    h.engine
        .push(push_of(repo.id, newer, vec![FileBlob::new("a.txt", "2")]))
        .await
        .unwrap();

    let ids: Vec<CommitId> = h
        .engine
        .list_commits(&repo.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.commit_id)
        .collect();
    assert_eq!(ids, vec![newer, older]);
}

#[tokio::test]
async fn concurrent_pushes_to_one_repository_are_all_kept() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let engine = h.engine.clone();
        let push = push_of(
            repo.id,
            CommitId::generate(),
            vec![FileBlob::new("n.txt", format!("{n}"))],
        );
        handles.push(tokio::spawn(async move { engine.push(push).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.engine.list_commits(&repo.id).await.unwrap().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_pushes_of_one_id_never_touch_recorded_blobs() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();

    let mut handles = Vec::new();
    for n in 0..8 {
        let engine = h.engine.clone();
        let push = push_of(repo.id, id, vec![FileBlob::new(format!("{n}.txt"), "x")]);
        handles.push(tokio::spawn(async move { engine.push(push).await }));
    }
    let mut recorded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) if outcome.is_new() => recorded += 1,
            Ok(_) => {}
            Err(e) => assert_eq!(e.code(), ErrorCode::Conflict),
        }
    }
    assert_eq!(recorded, 1);

    // Only the recorded push wrote blobs.
    let record = h.metadata.get_commit(&id).await.unwrap().unwrap();
    let manifest: Vec<String> = record.files.iter().map(|e| e.path.clone()).collect();
    assert_eq!(h.backend.keys().await, manifest);
}

#[tokio::test]
async fn delete_repository_survives_blob_failures() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "doomed").await.unwrap();
    let (keep, _) = h.engine.init_repository("user-1", "keep").await.unwrap();
    let one = CommitId::generate();
    let two = CommitId::generate();
    let kept = CommitId::generate();
    h.engine
        .push(push_of(repo.id, one, vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")]))
        .await
        .unwrap();
    h.engine
        .push(push_of(repo.id, two, vec![FileBlob::new("c.txt", "C")]))
        .await
        .unwrap();
    h.engine
        .push(push_of(keep.id, kept, vec![FileBlob::new("k.txt", "K")]))
        .await
        .unwrap();

    h.backend.fail_deletes_matching(commit_key(&one, "b.txt")).await;
    let outcome = h.engine.delete_repository(&repo.id).await.unwrap();
    assert_eq!(outcome.deleted_commits, 2);
    assert_eq!(outcome.queued_keys, 1);

    // All metadata is gone even though one blob is stuck.
    assert!(h.metadata.get_commit(&one).await.unwrap().is_none());
    assert!(h.metadata.get_commit(&two).await.unwrap().is_none());
    assert!(h.metadata.get_commit(&kept).await.unwrap().is_some());
    assert_eq!(h.engine.pull(&one).await.unwrap_err().code(), ErrorCode::NotFound);

    h.engine.cleanup().wait_idle().await;
    assert_eq!(h.engine.cleanup().stats().abandoned, 1);
    let mut expected = vec![commit_key(&one, "b.txt"), commit_key(&kept, "k.txt")];
    expected.sort();
    assert_eq!(h.backend.keys().await, expected);

    let err = h.engine.delete_repository(&repo.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn queued_cleanup_finishes_once_store_recovers() {
    let backend = MockBackend::new();
    let engine = SyncEngine::new(
        Arc::new(backend.clone()),
        Arc::new(MemoryMetadataStore::new()),
        CleanupConfig {
            max_attempts: 100,
            retry_delay_ms: 5,
        },
    );
    let (repo, _) = engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    engine
        .push(push_of(repo.id, id, vec![FileBlob::new("a.txt", "A")]))
        .await
        .unwrap();

    backend.fail_deletes_matching("a.txt").await;
    engine.delete_repository(&repo.id).await.unwrap();
    backend.heal().await;
    engine.cleanup().wait_idle().await;

    assert!(backend.is_empty().await);
    assert_eq!(engine.cleanup().stats().abandoned, 0);
}

#[tokio::test]
async fn delete_repository_queues_unlistable_commit_prefix() {
    let backend = MockBackend::new();
    let metadata = Arc::new(MemoryMetadataStore::new());
    let engine = SyncEngine::new(
        Arc::new(backend.clone()),
        metadata.clone(),
        CleanupConfig {
            max_attempts: 100,
            retry_delay_ms: 5,
        },
    );
    let (repo, _) = engine.init_repository("user-1", "doomed").await.unwrap();
    let (keep, _) = engine.init_repository("user-1", "keep").await.unwrap();
    let gone = CommitId::generate();
    let kept = CommitId::generate();
    engine
        .push(push_of(
            repo.id,
            gone,
            vec![FileBlob::new("a.txt", "A"), FileBlob::new("b.txt", "B")],
        ))
        .await
        .unwrap();
    engine
        .push(push_of(keep.id, kept, vec![FileBlob::new("k.txt", "K")]))
        .await
        .unwrap();

    backend.fail_lists_matching(commit_prefix(&gone)).await;
    let outcome = engine.delete_repository(&repo.id).await.unwrap();
    assert_eq!(outcome.deleted_commits, 1);
    assert_eq!(outcome.queued_keys, 0);
    assert_eq!(outcome.queued_prefixes, 1);

    // Metadata is gone while the blobs are still unreachable.
    assert!(metadata.get_commit(&gone).await.unwrap().is_none());
    assert_eq!(engine.pull(&gone).await.unwrap_err().code(), ErrorCode::NotFound);
    assert_eq!(backend.len().await, 3);

    backend.heal().await;
    engine.cleanup().wait_idle().await;

    assert_eq!(backend.keys().await, vec![commit_key(&kept, "k.txt")]);
    let stats = engine.cleanup().stats();
    assert_eq!(stats.deleted, 2);
    assert_eq!(stats.abandoned, 0);
}

#[tokio::test]
async fn revert_restores_pulled_commit() {
    let h = harness();
    let (repo, _) = h.engine.init_repository("user-1", "proj").await.unwrap();
    let id = CommitId::generate();
    h.engine
        .push(push_of(
            repo.id,
            id,
            vec![FileBlob::new("a.txt", "old a"), FileBlob::new("b.txt", "old b")],
        ))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let wc = WorkingCopy::init(dir.path()).unwrap();
    std::fs::write(dir.path().join("a.txt"), "edited").unwrap();
    std::fs::write(dir.path().join("extra.txt"), "local only").unwrap();
    wc.add(&dir.path().join("a.txt")).unwrap();

    let pulled = h.engine.pull(&id).await.unwrap();
    wc.materialize(&pulled.files, RevertPolicy::Overlay).unwrap();

    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "old a");
    assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "old b");
    assert!(dir.path().join("extra.txt").exists());
}
