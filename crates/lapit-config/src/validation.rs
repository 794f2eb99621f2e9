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

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

/// Environment variable overrides
pub trait EnvOverrides {
    /// Apply overrides, reading variables through `lookup`
    fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>;

    /// Apply overrides from the process environment
    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }
}

fn validate_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(
            field,
            format!("must start with http:// or https://, got {url:?}"),
        ))
    }
}

impl Validator for WorkspaceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = &self.remote.url {
            validate_url("remote.url", url)?;
        }
        if matches!(&self.remote.bucket, Some(b) if b.trim().is_empty()) {
            return Err(ConfigError::invalid_value("remote.bucket", "must not be empty"));
        }
        if matches!(&self.repository.id, Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::invalid_value("repository.id", "must not be empty"));
        }
        Ok(())
    }
}

impl EnvOverrides for WorkspaceConfig {
    fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LAPIT_REMOTE_URL") {
            self.remote.url = Some(value);
        }
        if let Some(value) = lookup("LAPIT_BUCKET") {
            self.remote.bucket = Some(value);
        }
        if let Some(value) = lookup("LAPIT_USER_ID") {
            self.user.id = Some(value);
        }
        if let Some(value) = lookup("LAPIT_REPOSITORY_ID") {
            self.repository.id = Some(value);
        }
        Ok(())
    }
}

impl Validator for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingRequired("host".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid_value(
                "port",
                "port must be between 1 and 65535",
            ));
        }
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "body_limit_bytes",
                "must be greater than 0",
            ));
        }
        self.storage.validate()?;
        self.metadata.validate()?;
        self.cleanup.validate()
    }
}

impl Validator for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            StorageConfig::Local { root } if root.as_os_str().is_empty() => {
                Err(ConfigError::MissingRequired("storage.root".to_string()))
            }
            StorageConfig::S3 { bucket, .. } if bucket.trim().is_empty() => {
                Err(ConfigError::MissingRequired("storage.bucket".to_string()))
            }
            StorageConfig::S3 {
                endpoint: Some(endpoint),
                ..
            } => validate_url("storage.endpoint", endpoint),
            _ => Ok(()),
        }
    }
}

impl Validator for MetadataConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            MetadataConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::MissingRequired("metadata.path".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl Validator for CleanupSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid_value(
                "cleanup.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl EnvOverrides for ServerConfig {
    fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LAPIT_HOST") {
            self.host = value;
        }
        if let Some(value) = lookup("LAPIT_PORT") {
            self.port = value.parse().map_err(|_| {
                ConfigError::env_var_parsing_error(
                    "LAPIT_PORT",
                    &value,
                    "expected valid port number (1-65535)",
                )
            })?;
        }

        // A bucket selects S3, keeping any configured endpoint.
        if let Some(bucket) = lookup("LAPIT_BUCKET") {
            let endpoint = match &self.storage {
                StorageConfig::S3 { endpoint, .. } => endpoint.clone(),
                _ => None,
            };
            self.storage = StorageConfig::S3 { bucket, endpoint };
        }
        if let Some(value) = lookup("LAPIT_S3_ENDPOINT") {
            match &mut self.storage {
                StorageConfig::S3 { endpoint, .. } => *endpoint = Some(value),
                _ => {
                    return Err(ConfigError::env_var_parsing_error(
                        "LAPIT_S3_ENDPOINT",
                        &value,
                        "requires the s3 storage backend (set LAPIT_BUCKET)",
                    ))
                }
            }
        }

        if let Some(value) = lookup("LAPIT_METADATA_PATH") {
            self.metadata = MetadataConfig::Sqlite { path: value.into() };
        }
        Ok(())
    }
}
