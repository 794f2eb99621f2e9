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

use anyhow::{Context, Result};
use lapit_metadata::RepositoryId;
use lapit_versioning::{CommitId, ErrorCode};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
    CommitDetailsResponse, CommitListResponse, CommitRequest, DeleteResponse, ErrorBody,
    InitRequest, InitResponse, MessageResponse, PullResponse, PushRequest,
};

/// A non-success response from the server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{method} {path} failed ({status}): {message}")]
pub struct RemoteError {
    /// Request method
    pub method: String,
    /// Request path
    pub path: String,
    /// HTTP status
    pub status: u16,
    /// Error code from the body, if the server sent one
    pub code: Option<ErrorCode>,
    /// Error message from the body, or the status text
    pub message: String,
}

impl RemoteError {
    /// Check if the server reported a missing commit, repository or object
    pub fn is_not_found(&self) -> bool {
        self.code == Some(ErrorCode::NotFound) || self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

/// HTTP client for the Lapit remote API
#[derive(Debug, Clone)]
pub struct ProtocolClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProtocolClient {
    /// Create a client for a server, e.g. `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client that reuses an existing `reqwest::Client`
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Find or create a repository
    pub async fn init(&self, request: &InitRequest) -> Result<InitResponse> {
        let path = "/cli/init";
        let builder = self.request(Method::POST, path).json(request);
        self.send(Method::POST, path, builder).await
    }

    /// Record a commit whose blobs were pushed
    pub async fn record_commit(&self, request: &CommitRequest) -> Result<MessageResponse> {
        let path = "/cli/commit";
        let builder = self.request(Method::POST, path).json(request);
        self.send(Method::POST, path, builder).await
    }

    /// Upload a commit's files, recording it too when the request carries metadata
    pub async fn push(&self, request: &PushRequest) -> Result<MessageResponse> {
        let path = "/cli/push";
        tracing::debug!(
            commit_id = %request.commit_id,
            files = request.files.len(),
            "POST {}",
            path
        );
        let builder = self.request(Method::POST, path).json(request);
        self.send(Method::POST, path, builder).await
    }

    /// Fetch a recorded commit with its files
    pub async fn pull(&self, commit_id: &CommitId) -> Result<PullResponse> {
        let path = "/cli/pull";
        let builder = self
            .request(Method::GET, path)
            .query(&[("commitId", commit_id.to_string())]);
        self.send(Method::GET, path, builder).await
    }

    /// Commit records of a repository, newest first
    pub async fn list_commits(&self, repository_id: &RepositoryId) -> Result<CommitListResponse> {
        let path = format!("/repo/{repository_id}/commits");
        let builder = self.request(Method::GET, &path);
        self.send(Method::GET, &path, builder).await
    }

    /// Commit record with file contents and sizes
    pub async fn commit_details(&self, commit_id: &CommitId) -> Result<CommitDetailsResponse> {
        let path = format!("/commit/{commit_id}");
        let builder = self.request(Method::GET, &path);
        self.send(Method::GET, &path, builder).await
    }

    /// Delete a repository with its commits and blobs
    pub async fn delete_repository(&self, repository_id: &RepositoryId) -> Result<DeleteResponse> {
        let path = format!("/repo/{repository_id}");
        let builder = self.request(Method::DELETE, &path);
        self.send(Method::DELETE, &path, builder).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send {method} {path} to {}", self.base_url))?;

        if !response.status().is_success() {
            return Err(remote_error(method, path, response).await.into());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {method} {path} response"))
    }
}

async fn remote_error(method: Method, path: &str, response: Response) -> RemoteError {
    let status = response.status();
    let (code, message) = match response.json::<ErrorBody>().await {
        Ok(body) => (Some(body.code), body.error),
        Err(_) => (
            None,
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        ),
    };
    RemoteError {
        method: method.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ProtocolClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_remote_error_not_found() {
        let err = RemoteError {
            method: "GET".into(),
            path: "/cli/pull".into(),
            status: 404,
            code: Some(ErrorCode::NotFound),
            message: "commit not found".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "GET /cli/pull failed (404): commit not found"
        );
    }
}
