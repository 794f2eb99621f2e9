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

//! Property tests for the staging → commit transition

use lapit_versioning::{FileBlob, WorkingCopy};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn filename() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}\\.(txt|bin|md)"
}

fn file_set() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(filename(), prop::collection::vec(any::<u8>(), 0..512), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The commit holds exactly the staged basenames with identical bytes.
    #[test]
    fn commit_manifest_matches_staged_files(files in file_set()) {
        let dir = TempDir::new().unwrap();
        let wc = WorkingCopy::init(dir.path()).unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        for (name, content) in &files {
            let path = src.join(name);
            fs::write(&path, content).unwrap();
            wc.add(&path).unwrap();
        }

        let id = wc.commit("property", false).unwrap();
        let commit = wc.load_commit(&id).unwrap();

        let expected: Vec<FileBlob> = files
            .iter()
            .map(|(name, content)| FileBlob::new(name.clone(), content.clone()))
            .collect();
        prop_assert_eq!(commit.files, expected);
        prop_assert!(wc.staging().is_empty().unwrap());
    }

    /// Later stagings of the same basename win.
    #[test]
    fn restaging_replaces_content(first in any::<Vec<u8>>(), second in any::<Vec<u8>>()) {
        let dir = TempDir::new().unwrap();
        let wc = WorkingCopy::init(dir.path()).unwrap();
        let path = dir.path().join("same.bin");

        fs::write(&path, &first).unwrap();
        wc.add(&path).unwrap();
        fs::write(&path, &second).unwrap();
        wc.add(&path).unwrap();

        let id = wc.commit("restage", false).unwrap();
        let commit = wc.load_commit(&id).unwrap();
        prop_assert_eq!(commit.files, vec![FileBlob::new("same.bin", second)]);
    }
}
