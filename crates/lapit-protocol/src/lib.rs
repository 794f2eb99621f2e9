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

//! Lapit remote API
//!
//! | route | body / query | response |
//! |---|---|---|
//! | `POST /cli/init` | [`InitRequest`] | [`InitResponse`] |
//! | `POST /cli/commit` | [`CommitRequest`] | [`MessageResponse`] |
//! | `POST /cli/push` | [`PushRequest`] | [`MessageResponse`] |
//! | `GET /cli/pull?commitId=` | [`PullQuery`] | [`PullResponse`] |
//! | `GET /repo/{repo_id}/commits` | | [`CommitListResponse`] |
//! | `GET /commit/{commit_id}` | | [`CommitDetailsResponse`] |
//! | `DELETE /repo/{repo_id}` | | [`DeleteResponse`] |
//!
//! Failures answer with an [`ErrorBody`]; [`ProtocolClient`] turns those
//! into [`RemoteError`].

pub mod client;
pub mod types;

pub use client::{ProtocolClient, RemoteError};
pub use types::{
    CommitDetailsResponse, CommitListResponse, CommitRequest, DeleteResponse, DetailFile,
    ErrorBody, InitRequest, InitResponse, MessageResponse, PullQuery, PullResponse, PushRequest,
    WireFile,
};
