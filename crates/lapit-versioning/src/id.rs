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

//! Commit identifiers and filename rules

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque commit identifier
///
/// A random 128-bit UUID v4, never derived from content: committing the
/// same files twice yields two ids. Displays as lowercase hyphenated text,
/// which is also the form used in storage keys.
///
/// ```
/// use lapit_versioning::CommitId;
///
/// let a = CommitId::generate();
/// let b = CommitId::generate();
/// assert_ne!(a, b);
///
/// let parsed: CommitId = a.to_string().parse().unwrap();
/// assert_eq!(parsed, a);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(Uuid);

impl CommitId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        CommitId(Uuid::new_v4())
    }

    /// Parse and validate an id received from a caller
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl FromStr for CommitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::try_parse(s)
            .map_err(|_| Error::validation(format!("malformed commit id: {s:?}")))?;
        // Only the canonical text form is accepted so ids map to one key prefix.
        if uuid.hyphenated().to_string() != s {
            return Err(Error::validation(format!(
                "commit id must be lowercase hyphenated: {s:?}"
            )));
        }
        Ok(CommitId(uuid))
    }
}

impl TryFrom<String> for CommitId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Name of the per-commit metadata file in a local commit directory
pub const COMMIT_META_FILE: &str = "commit.json";

/// Check that `name` is a single path component usable as a blob filename
///
/// [`COMMIT_META_FILE`] and names starting with `.commit.json`, used for its
/// scratch copy, are reserved.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("filename cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(Error::validation(format!("invalid filename: {name:?}")));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(Error::validation(format!(
            "filename must be a single path component: {name:?}"
        )));
    }
    if name == COMMIT_META_FILE || name.starts_with(&format!(".{COMMIT_META_FILE}")) {
        return Err(Error::validation(format!("{name:?} is a reserved filename")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_canonical() {
        let id = CommitId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(CommitId::parse(&text).unwrap(), id);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(CommitId::parse("").is_err());
        assert!(CommitId::parse("not-a-uuid").is_err());
        assert!(CommitId::parse("../../etc").is_err());

        let upper = CommitId::generate().to_string().to_uppercase();
        assert!(CommitId::parse(&upper).is_err());

        let simple = CommitId::generate().to_string().replace('-', "");
        assert!(CommitId::parse(&simple).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let id = CommitId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: CommitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<CommitId>("\"nope\"").is_err());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("a.txt").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("dir/a.txt").is_err());
        assert!(validate_filename("dir\\a.txt").is_err());
        assert!(validate_filename(COMMIT_META_FILE).is_err());
        assert!(validate_filename(".commit.json.tmp").is_err());
        assert!(validate_filename(".commit.json").is_err());
        assert!(validate_filename("commit.json.bak").is_ok());
    }
}
