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
use clap::Parser;
use lapit_config::{ConfigLoader, EnvOverrides, ServerConfig, Validator};
use lapit_observability::{init_tracing, LogFormat};
use std::path::PathBuf;
use std::sync::Arc;

use lapit_server::{create_router_with_limit, AppState};

/// Lapit remote server
#[derive(Parser, Debug)]
#[command(name = "lapit-server", version, about)]
struct Args {
    /// Configuration file (.toml, .yaml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter, e.g. `debug` or `lapit_sync=trace`
    #[arg(long)]
    log_level: Option<String>,
}

async fn load_config(path: Option<&PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => ConfigLoader::new()
            .load_with_overrides(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let mut config = ServerConfig::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let format = LogFormat::from_env_or(LogFormat::Compact)?;
    init_tracing(format, args.log_level.as_deref())?;

    let config = load_config(args.config.as_ref()).await?;
    tracing::info!("Server configuration: {:?}", config);

    let state = Arc::new(AppState::from_config(&config).await?);
    let app = create_router_with_limit(state, config.body_limit_bytes);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("Lapit server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
