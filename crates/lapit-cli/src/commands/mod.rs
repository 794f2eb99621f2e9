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

// Command modules for the lapit CLI
pub mod add;
pub mod commit;
pub mod init;
pub mod log;
pub mod pull;
pub mod push;
pub mod revert;
pub mod status;

pub use add::AddCmd;
pub use commit::CommitCmd;
pub use init::InitCmd;
pub use log::LogCmd;
pub use pull::PullCmd;
pub use push::PushCmd;
pub use revert::RevertCmd;
pub use status::StatusCmd;
