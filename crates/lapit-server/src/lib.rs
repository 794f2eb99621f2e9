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

//! HTTP surface of the Lapit remote
//!
//! Routes and bodies are listed in [`lapit_protocol`]. Every handler goes
//! through the [`SyncEngine`](lapit_sync::SyncEngine) held in [`AppState`],
//! and every failure is answered as an [`ErrorBody`](lapit_protocol::ErrorBody)
//! by [`ApiError`].

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{status_for, ApiError};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Default request body limit (64 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Create the axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with_limit(state, DEFAULT_BODY_LIMIT)
}

/// Create the router with a custom request body limit
pub fn create_router_with_limit(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/cli/init", post(handlers::init_repository))
        .route("/cli/commit", post(handlers::record_commit))
        .route("/cli/push", post(handlers::push))
        .route("/cli/pull", get(handlers::pull))
        .route("/repo/{repo_id}/commits", get(handlers::list_commits))
        .route("/repo/{repo_id}", delete(handlers::delete_repository))
        .route("/commit/{commit_id}", get(handlers::commit_details))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_malformed_commit_id_is_bad_request() {
        let app = create_router(Arc::new(AppState::in_memory()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/commit/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_repo_name_is_bad_request() {
        let app = create_router(Arc::new(AppState::in_memory()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cli/init")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"userId": "u1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_repository_routes_reach_their_handlers() {
        let repo_id = lapit_metadata::RepositoryId::generate();
        for (method, uri) in [
            ("GET", format!("/repo/{repo_id}/commits")),
            ("DELETE", format!("/repo/{repo_id}")),
        ] {
            let app = create_router(Arc::new(AppState::in_memory()));
            let response = app
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);

            // A handler answered, not the router fallback.
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["code"], "not_found");
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_router(Arc::new(AppState::in_memory()));
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
