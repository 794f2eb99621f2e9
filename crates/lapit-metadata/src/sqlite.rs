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

//! SQLite-backed metadata store
//!
//! A repository's history is the set of rows in `commits` for that
//! repository, ordered by the autoincrement `seq` column. Recording a commit
//! is a single `INSERT` inside an immediate transaction, so concurrent
//! appends are serialized by SQLite and neither can be lost. Deleting a
//! repository removes its commit rows in the same transaction.

use crate::error::{MetadataError, MetadataResult};
use crate::model::{CommitRecord, NewCommit, NewRepository, Repository, RepositoryId, Visibility};
use crate::MetadataStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapit_versioning::{CommitId, ManifestEntry};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS repositories (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    description TEXT NOT NULL,
    visibility  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (owner_id, name)
);
CREATE TABLE IF NOT EXISTS commits (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    commit_id      TEXT NOT NULL UNIQUE,
    repository_id  TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    message        TEXT NOT NULL,
    author_id      TEXT NOT NULL,
    files          TEXT NOT NULL,
    storage_prefix TEXT NOT NULL,
    committed_at   TEXT NOT NULL,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS commits_by_repository ON commits (repository_id, seq);
";

const COMMIT_COLUMNS: &str = "commit_id, repository_id, message, author_id, files, \
                              storage_prefix, committed_at, created_at";

fn open_db(path: Option<&Path>) -> MetadataResult<Connection> {
    let conn = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MetadataError::backend(format!("{}: {e}", parent.display())))?;
            }
            Connection::open(path)?
        }
        None => Connection::open_in_memory()?,
    };
    // In-memory databases answer "memory" here, which is fine.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn conversion<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_time(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion(column, e))
}

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<CommitRecord> {
    let commit_id: String = row.get(0)?;
    let repository_id: String = row.get(1)?;
    let files: String = row.get(4)?;
    let committed_at: String = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(CommitRecord {
        commit_id: commit_id.parse().map_err(|e| conversion(0, e))?,
        repository_id: repository_id.parse().map_err(|e| conversion(1, e))?,
        message: row.get(2)?,
        author_id: row.get(3)?,
        files: serde_json::from_str::<Vec<ManifestEntry>>(&files).map_err(|e| conversion(4, e))?,
        storage_prefix: row.get(5)?,
        committed_at: parse_time(6, &committed_at)?,
        created_at: parse_time(7, &created_at)?,
    })
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let id: String = row.get(0)?;
    let visibility: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(Repository {
        id: id.parse().map_err(|e| conversion(0, e))?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        description: row.get(3)?,
        visibility: visibility.parse::<Visibility>().map_err(|e| conversion(4, e))?,
        commits: Vec::new(),
        created_at: parse_time(5, &created_at)?,
    })
}

fn load_history(conn: &Connection, repo: &mut Repository) -> MetadataResult<()> {
    let mut stmt =
        conn.prepare_cached("SELECT commit_id FROM commits WHERE repository_id = ?1 ORDER BY seq")?;
    let ids = stmt
        .query_map(params![repo.id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    repo.commits = ids
        .iter()
        .map(|id| id.parse::<CommitId>())
        .collect::<Result<_, _>>()
        .map_err(|e| MetadataError::backend(format!("corrupt commit id in history: {e}")))?;
    Ok(())
}

fn query_repository(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> MetadataResult<Option<Repository>> {
    let repo = conn
        .query_row(sql, params, repository_from_row)
        .optional()?;
    match repo {
        Some(mut repo) => {
            load_history(conn, &mut repo)?;
            Ok(Some(repo))
        }
        None => Ok(None),
    }
}

const REPOSITORY_COLUMNS: &str = "id, name, owner_id, description, visibility, created_at";

/// Metadata store persisted in a SQLite database file
#[derive(Clone)]
pub struct SqliteMetadataStore {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(Some(&path))?;
        debug!(path = %path.display(), "Opened metadata database");
        Ok(Self {
            path: Some(path),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A private in-memory database
    pub fn in_memory() -> MetadataResult<Self> {
        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(open_db(None)?)),
        })
    }

    /// Run `f` on the connection from the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> MetadataResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> MetadataResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| MetadataError::backend("metadata connection poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| MetadataError::backend(format!("metadata task failed: {e}")))?
    }
}

impl fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteMetadataStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create_repository(&self, new: NewRepository) -> MetadataResult<Repository> {
        new.validate()?;
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM repositories WHERE owner_id = ?1 AND name = ?2)",
                params![new.owner_id, new.name],
                |row| row.get(0),
            )?;
            if taken {
                return Err(MetadataError::DuplicateRepository {
                    owner_id: new.owner_id,
                    name: new.name,
                });
            }

            let repo = new.into_repository();
            tx.execute(
                "INSERT INTO repositories (id, name, owner_id, description, visibility, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    repo.id.to_string(),
                    repo.name,
                    repo.owner_id,
                    repo.description,
                    repo.visibility.as_str(),
                    repo.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(repo)
        })
        .await
    }

    async fn find_repository(
        &self,
        owner_id: &str,
        name: &str,
    ) -> MetadataResult<Option<Repository>> {
        let owner_id = owner_id.to_string();
        let name = name.to_string();
        self.with_conn(move |conn| {
            query_repository(
                conn,
                &format!(
                    "SELECT {REPOSITORY_COLUMNS} FROM repositories \
                     WHERE owner_id = ?1 AND name = ?2"
                ),
                params![owner_id, name],
            )
        })
        .await
    }

    async fn get_repository(&self, id: &RepositoryId) -> MetadataResult<Repository> {
        let id = *id;
        self.with_conn(move |conn| {
            query_repository(
                conn,
                &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
                params![id.to_string()],
            )?
            .ok_or(MetadataError::RepositoryNotFound(id))
        })
        .await
    }

    async fn create_commit_record(&self, new: NewCommit) -> MetadataResult<CommitRecord> {
        new.validate()?;
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let duplicate: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM commits WHERE commit_id = ?1)",
                params![new.commit_id.to_string()],
                |row| row.get(0),
            )?;
            if duplicate {
                return Err(MetadataError::DuplicateCommit(new.commit_id));
            }

            let repo_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM repositories WHERE id = ?1)",
                params![new.repository_id.to_string()],
                |row| row.get(0),
            )?;
            if !repo_exists {
                return Err(MetadataError::RepositoryNotFound(new.repository_id));
            }

            let record = new.into_record();
            let files = serde_json::to_string(&record.files)
                .map_err(|e| MetadataError::backend(format!("cannot encode manifest: {e}")))?;
            tx.execute(
                &format!(
                    "INSERT INTO commits ({COMMIT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    record.commit_id.to_string(),
                    record.repository_id.to_string(),
                    record.message,
                    record.author_id,
                    files,
                    record.storage_prefix,
                    record.committed_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn get_commit(&self, id: &CommitId) -> MetadataResult<Option<CommitRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE commit_id = ?1"),
                    params![id],
                    commit_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn list_commits(
        &self,
        repository_id: &RepositoryId,
    ) -> MetadataResult<Vec<CommitRecord>> {
        let repository_id = *repository_id;
        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM repositories WHERE id = ?1)",
                params![repository_id.to_string()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(MetadataError::RepositoryNotFound(repository_id));
            }

            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {COMMIT_COLUMNS} FROM commits WHERE repository_id = ?1 ORDER BY seq"
            ))?;
            let records = stmt
                .query_map(params![repository_id.to_string()], commit_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn delete_repository(&self, id: &RepositoryId) -> MetadataResult<Vec<CommitRecord>> {
        let id = *id;
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let records = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COMMIT_COLUMNS} FROM commits WHERE repository_id = ?1 ORDER BY seq"
                ))?;
                let rows = stmt
                    .query_map(params![id.to_string()], commit_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };

            let removed = tx.execute(
                "DELETE FROM repositories WHERE id = ?1",
                params![id.to_string()],
            )?;
            if removed == 0 {
                return Err(MetadataError::RepositoryNotFound(id));
            }
            // Cascades through the foreign key; explicit for databases opened
            // without foreign_keys enforcement.
            tx.execute(
                "DELETE FROM commits WHERE repository_id = ?1",
                params![id.to_string()],
            )?;
            tx.commit()?;
            Ok(records)
        })
        .await
    }
}
