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

//! CLI tests against an in-process server

use lapit_server::{create_router, AppState};
use lapit_test_utils::TestRepo;
use predicates::prelude::*;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start_test_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(Arc::new(AppState::in_memory()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn connect(repo: &TestRepo, url: &str) {
    repo.lapit(&[
        "init", "-q", "--remote", url, "--user", "alice", "--name", "notes",
    ])
    .run_success();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_push_pull_revert_between_working_copies() {
    let url = start_test_server().await;

    tokio::task::spawn_blocking(move || {
        let alice = TestRepo::new();
        connect(&alice, &url);
        let config = std::fs::read_to_string(alice.lapit_dir().join("config.toml")).unwrap();
        assert!(config.contains(&url));
        assert!(config.contains("notes"));

        alice.write_file("a.txt", "hello");
        alice.write_file("b.txt", "world");
        alice.add(&["a.txt", "b.txt"]);
        alice.commit("first");
        let id = alice.commit_ids().remove(0);

        alice
            .lapit(&["push"])
            .run_success()
            .stdout(predicate::str::contains("Pushed 1 commit(s)"));
        alice
            .lapit(&["push"])
            .run_success()
            .stdout(predicate::str::contains("Everything up-to-date"));
        alice
            .lapit(&["log", "--oneline"])
            .run_success()
            .stdout(predicate::str::contains("(pushed)"));

        let bob = TestRepo::new();
        connect(&bob, &url);
        bob.lapit(&["pull"])
            .run_success()
            .stdout(predicate::str::contains("Pulled 1 commit(s)"));
        assert_eq!(bob.commit_ids(), vec![id.clone()]);
        bob.lapit(&["pull"])
            .run_success()
            .stdout(predicate::str::contains("Already up-to-date"));

        bob.lapit(&["revert", &id]).run_success();
        assert_eq!(bob.read_text_file("a.txt"), "hello");
        assert_eq!(bob.read_text_file("b.txt"), "world");

        // Pulled commits are never pushed back.
        bob.lapit(&["status", "--porcelain"])
            .run_success()
            .stdout(predicate::str::contains("unpushed").not());
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_revert_fetches_missing_commit() {
    let url = start_test_server().await;

    tokio::task::spawn_blocking(move || {
        let alice = TestRepo::new();
        connect(&alice, &url);
        alice.add_and_commit("notes.md", "# v1", "first");
        let id = alice.commit_ids().remove(0);
        alice.lapit(&["push", "-q"]).run_success();

        let carol = TestRepo::new();
        connect(&carol, &url);
        carol.write_file("scratch.txt", "temporary");
        carol.lapit(&["revert", "--clean", &id]).run_success();

        assert_eq!(carol.read_text_file("notes.md"), "# v1");
        assert!(!carol.file_exists("scratch.txt"));
        assert_eq!(carol.commit_ids(), vec![id]);
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pull_unknown_commit_fails() {
    let url = start_test_server().await;

    tokio::task::spawn_blocking(move || {
        let repo = TestRepo::new();
        connect(&repo, &url);
        repo.lapit(&["pull", "0f8fad5b-d9cb-469f-a165-70867728950e"])
            .fails_with("commit not found");
        assert!(repo.commit_ids().is_empty());
    })
    .await
    .unwrap();
}
