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

//! CLI tests that never contact a server

use lapit_test_utils::{lapit, TestRepo};
use predicates::prelude::*;

#[test]
fn test_init_creates_lapit_dir() {
    let repo = TestRepo::new();
    repo.lapit(&["init"])
        .run_success()
        .stdout(predicate::str::contains("Initialized Lapit repository"));

    assert!(repo.lapit_dir().join("staging").is_dir());
    assert!(repo.lapit_dir().join("commits").is_dir());
    assert!(repo.lapit_dir().join("config.toml").is_file());

    // Running it again is harmless.
    repo.lapit(&["init", "-q"]).run_success();
}

#[test]
fn test_commands_outside_a_repository_fail() {
    let repo = TestRepo::new();
    repo.lapit(&["status"]).fails_with("Not a lapit repository");
    repo.lapit(&["log"]).fails_with("Not a lapit repository");
}

#[test]
fn test_add_missing_file_fails() {
    let repo = TestRepo::initialized();
    repo.lapit(&["add", "nope.txt"]).fails_with("not found");
    assert!(repo.staged_files().is_empty());
}

#[test]
fn test_add_and_commit() {
    let repo = TestRepo::initialized();
    repo.write_file("a.txt", "hello");
    repo.write_file("b.txt", "world");

    repo.lapit(&["add", "a.txt", "b.txt"])
        .run_success()
        .stdout(predicate::str::contains("a.txt added to the staging area"));
    assert_eq!(repo.staged_files(), vec!["a.txt", "b.txt"]);

    repo.lapit(&["commit", "-m", "first"])
        .run_success()
        .stdout(predicate::str::contains("created with message"));

    let ids = repo.commit_ids();
    assert_eq!(ids.len(), 1);
    assert!(repo.staged_files().is_empty());

    let commit_dir = repo.lapit_dir().join("commits").join(&ids[0]);
    assert_eq!(std::fs::read_to_string(commit_dir.join("a.txt")).unwrap(), "hello");
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(commit_dir.join("commit.json")).unwrap()).unwrap();
    assert_eq!(meta["message"], "first");
    assert!(meta["date"].is_string());
}

#[test]
fn test_empty_commit_is_rejected_by_default() {
    let repo = TestRepo::initialized();
    repo.lapit(&["commit", "-m", "nothing"])
        .fails_with("nothing staged");
    assert!(repo.commit_ids().is_empty());

    repo.lapit(&["commit", "-m", "marker", "--allow-empty"])
        .run_success();
    assert_eq!(repo.commit_ids().len(), 1);
}

#[test]
fn test_blank_message_is_rejected() {
    let repo = TestRepo::initialized();
    repo.write_file("a.txt", "hello");
    repo.add(&["a.txt"]);
    repo.lapit(&["commit", "-m", "  "]).fails_with("message");
    assert_eq!(repo.staged_files(), vec!["a.txt"]);
}

#[test]
fn test_status_lists_staged_and_unpushed() {
    let repo = TestRepo::initialized();
    repo.add_and_commit("a.txt", "hello", "first");
    repo.write_file("b.txt", "world");
    repo.add(&["b.txt"]);

    let id = repo.commit_ids().remove(0);
    repo.lapit(&["status", "--porcelain"])
        .run_success()
        .stdout(predicate::str::contains("staged b.txt"))
        .stdout(predicate::str::contains(format!("unpushed {id}")));
}

#[test]
fn test_log_newest_first() {
    let repo = TestRepo::initialized();
    repo.add_and_commit("a.txt", "1", "first change");
    std::thread::sleep(std::time::Duration::from_millis(20));
    repo.add_and_commit("a.txt", "2", "second change");

    let output = repo.lapit(&["log", "--oneline"]).run_success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    let first = text.find("first change").unwrap();
    let second = text.find("second change").unwrap();
    assert!(second < first);
    assert!(text.contains("(local)"));

    repo.lapit(&["log", "-n", "1"])
        .run_success()
        .stdout(predicate::str::contains("second change"))
        .stdout(predicate::str::contains("first change").not());
}

#[test]
fn test_revert_overlay_keeps_extra_files() {
    let repo = TestRepo::initialized();
    repo.add_and_commit("a.txt", "v1", "first");
    let id = repo.commit_ids().remove(0);

    repo.write_file("a.txt", "v2");
    repo.write_file("extra.txt", "keep me");

    repo.lapit(&["revert", &id])
        .run_success()
        .stdout(predicate::str::contains("restored a.txt"));
    assert_eq!(repo.read_text_file("a.txt"), "v1");
    assert_eq!(repo.read_text_file("extra.txt"), "keep me");
}

#[test]
fn test_revert_clean_removes_extra_files() {
    let repo = TestRepo::initialized();
    repo.add_and_commit("a.txt", "v1", "first");
    let id = repo.commit_ids().remove(0);

    repo.write_file("a.txt", "v2");
    repo.write_file("extra.txt", "remove me");

    repo.lapit(&["revert", "--clean", &id])
        .run_success()
        .stdout(predicate::str::contains("removed extra.txt"));
    assert_eq!(repo.read_text_file("a.txt"), "v1");
    assert!(!repo.file_exists("extra.txt"));
    assert!(repo.lapit_dir().join("config.toml").is_file());
}

#[test]
fn test_revert_unknown_commit_offline() {
    let repo = TestRepo::initialized();
    repo.lapit(&["revert", "0f8fad5b-d9cb-469f-a165-70867728950e"])
        .fails_with("commit not found");
    repo.lapit(&["revert", "HEAD~1"]).fails_with("malformed commit id");
}

#[test]
fn test_push_needs_a_remote() {
    let repo = TestRepo::initialized();
    repo.lapit(&["push"])
        .run_success()
        .stdout(predicate::str::contains("Everything up-to-date"));

    repo.add_and_commit("a.txt", "hello", "first");
    repo.lapit(&["push", "--dry-run"])
        .run_success()
        .stdout(predicate::str::contains("1 commit(s) would be pushed"));
    repo.lapit(&["push"]).fails_with("No remote configured");
}

#[test]
fn test_directory_flag() {
    let repo = TestRepo::initialized();
    repo.write_file("a.txt", "hello");

    let dir = repo.path().to_str().unwrap().to_string();
    lapit()
        .args(["-C", dir.as_str(), "add", "a.txt"])
        .assert()
        .success();
    assert_eq!(repo.staged_files(), vec!["a.txt"]);
}

#[test]
fn test_completions() {
    lapit()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lapit"));
}
