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

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use lapit_metadata::{NewCommit, RepositoryId};
use lapit_protocol::{
    CommitDetailsResponse, CommitListResponse, CommitRequest, DeleteResponse, DetailFile,
    InitRequest, InitResponse, MessageResponse, PullQuery, PullResponse, PushRequest, WireFile,
};
use lapit_sync::{PushCommit, UploadOutcome};
use lapit_versioning::{CommitId, Error, FileBlob};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

fn message(text: &str, commit_id: CommitId, recorded: bool) -> MessageResponse {
    MessageResponse {
        message: text.to_string(),
        commit_id: Some(commit_id),
        recorded,
    }
}

/// POST /cli/init - Find or create a repository for a user
pub async fn init_repository(
    State(state): State<Arc<AppState>>,
    body: Result<Json<InitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InitResponse>)> {
    let Json(request) = body?;
    tracing::info!(user_id = %request.user_id, "POST /cli/init {}", request.repo_name);

    let (repository, created) = state
        .engine
        .init_repository(&request.user_id, &request.repo_name)
        .await?;

    let (status, text) = if created {
        (StatusCode::CREATED, "Repository initialized via CLI")
    } else {
        (StatusCode::OK, "Repository already exists")
    };
    Ok((
        status,
        Json(InitResponse {
            message: text.to_string(),
            repository_id: repository.id,
            repo_name: repository.name,
            created,
        }),
    ))
}

/// POST /cli/commit - Record a commit whose blobs were pushed
pub async fn record_commit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CommitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = body?;
    let commit_id = request.commit_id;
    tracing::info!(commit_id = %commit_id, "POST /cli/commit");

    let outcome = state
        .engine
        .record(NewCommit {
            repository_id: request.repository_id,
            commit_id,
            message: request.message,
            author_id: request.user_id,
            files: request.files,
            committed_at: request.committed_at,
        })
        .await?;

    if outcome.is_new() {
        Ok((
            StatusCode::CREATED,
            Json(message("Commit saved successfully", commit_id, true)),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(message("Commit already recorded", commit_id, false)),
        ))
    }
}

/// POST /cli/push - Upload a commit's files, recording it when metadata is sent
pub async fn push(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PushRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = body?;
    let commit_id = request.commit_id;
    tracing::info!(
        commit_id = %commit_id,
        files = request.files.len(),
        "POST /cli/push"
    );

    let files: Vec<FileBlob> = request.files.into_iter().map(FileBlob::from).collect();

    match (request.repository_id, request.message, request.user_id) {
        (Some(repository_id), Some(text), Some(author_id)) => {
            let outcome = state
                .engine
                .push(PushCommit {
                    repository_id,
                    commit_id,
                    message: text,
                    author_id,
                    files,
                    committed_at: request.committed_at,
                })
                .await?;
            if outcome.is_new() {
                Ok((
                    StatusCode::CREATED,
                    Json(message("Commit pushed successfully", commit_id, true)),
                ))
            } else {
                Ok((
                    StatusCode::OK,
                    Json(message("Commit already recorded", commit_id, false)),
                ))
            }
        }
        (None, None, None) => match state.engine.upload(&commit_id, &files).await? {
            UploadOutcome::Uploaded { .. } => Ok((
                StatusCode::OK,
                Json(message("Files pushed successfully", commit_id, false)),
            )),
            UploadOutcome::AlreadyRecorded => Ok((
                StatusCode::OK,
                Json(message("Commit already recorded", commit_id, false)),
            )),
        },
        _ => Err(Error::validation(
            "repositoryId, message and userId must be sent together",
        )
        .into()),
    }
}

/// GET /cli/pull?commitId= - Fetch a recorded commit with its files
pub async fn pull(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PullQuery>, QueryRejection>,
) -> ApiResult<Json<PullResponse>> {
    let Query(query) = query?;
    let commit_id: CommitId = query.commit_id.parse()?;
    tracing::info!(commit_id = %commit_id, "GET /cli/pull");

    let pulled = state.engine.pull(&commit_id).await?;
    Ok(Json(PullResponse {
        commit_id,
        message: pulled.record.message,
        committed_at: pulled.record.committed_at,
        created_at: pulled.record.created_at,
        files: pulled.files.into_iter().map(WireFile::from).collect(),
    }))
}

/// GET /repo/{repo_id}/commits - Commit records, newest first
pub async fn list_commits(
    Path(repo_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CommitListResponse>> {
    let repository_id: RepositoryId = repo_id.parse()?;
    tracing::info!("GET /repo/{}/commits", repository_id);

    let commits = state.engine.list_commits(&repository_id).await?;
    Ok(Json(CommitListResponse { commits }))
}

/// GET /commit/{commit_id} - Commit record with file contents and sizes
pub async fn commit_details(
    Path(commit_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CommitDetailsResponse>> {
    let commit_id: CommitId = commit_id.parse()?;
    tracing::info!("GET /commit/{}", commit_id);

    let pulled = state.engine.pull(&commit_id).await?;
    Ok(Json(CommitDetailsResponse {
        commit: pulled.record,
        files: pulled.files.into_iter().map(DetailFile::from).collect(),
    }))
}

/// DELETE /repo/{repo_id} - Delete a repository with its commits and blobs
pub async fn delete_repository(
    Path(repo_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DeleteResponse>> {
    let repository_id: RepositoryId = repo_id.parse()?;
    tracing::info!("DELETE /repo/{}", repository_id);

    let deleted = state.engine.delete_repository(&repository_id).await?;
    if deleted.queued_keys > 0 || deleted.queued_prefixes > 0 {
        tracing::warn!(
            keys = deleted.queued_keys,
            prefixes = deleted.queued_prefixes,
            "Repository deleted, some blobs left to cleanup"
        );
    }

    Ok(Json(DeleteResponse {
        message: "Repository deleted".to_string(),
        deleted_commits: deleted.deleted_commits,
        queued_keys: deleted.queued_keys,
    }))
}
