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

//! Mapping of core errors onto HTTP responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lapit_metadata::MetadataError;
use lapit_protocol::ErrorBody;
use lapit_versioning::{Error, ErrorCode};

/// HTTP status for an error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ValidationError | ErrorCode::EmptyCommit => StatusCode::BAD_REQUEST,
        ErrorCode::StorageError => StatusCode::BAD_GATEWAY,
        ErrorCode::IntegrityError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An error answered as `{"error": .., "code": ..}`
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Message safe to send to the client
    ///
    /// Storage and metadata failures carry backend error chains, database
    /// text and local paths; those stay in the log.
    fn public_message(&self) -> String {
        match &self.0 {
            Error::Storage { failed_keys, .. } if !failed_keys.is_empty() => {
                format!("failed to store {} object(s)", failed_keys.len())
            }
            Error::Storage { .. } | Error::Io(_) => "blob store unavailable".to_string(),
            Error::MetadataUnavailable(_) => "metadata store unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        ApiError(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::error!(code = %code, error = %self.0, "Request failed");
        } else {
            tracing::debug!(code = %code, error = %self.0, "Request rejected");
        }

        let body = ErrorBody {
            error: self.public_message(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
