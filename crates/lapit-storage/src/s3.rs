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

//! AWS S3 storage backend
//!
//! Provides a `StorageBackend` implementation for S3 and S3-compatible
//! services (MinIO, LocalStack) with:
//! - The AWS SDK credential chain (environment, IAM, profiles)
//! - An optional custom endpoint with path-style addressing
//! - Exponential backoff retry on transient failures
//! - Paginated listing
//!
//! # Examples
//!
//! ```rust,no_run
//! use lapit_storage::{StorageBackend, s3::{S3Backend, S3Config}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = S3Backend::with_config(S3Config {
//!         bucket: "lapit-commits".to_string(),
//!         endpoint: Some("http://localhost:9000".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     storage.put("commits/abc/a.txt", b"hello").await?;
//!     Ok(())
//! }
//! ```

use crate::error::{validate_key, StorageError};
use crate::StorageBackend;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the S3 backend
#[derive(Clone, Debug)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// Optional custom S3 endpoint (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,

    /// Maximum number of attempts for a failed operation (default: 3)
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (default: 100ms)
    pub initial_retry_delay_ms: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        S3Config {
            bucket: String::new(),
            endpoint: None,
            max_retries: 3,
            initial_retry_delay_ms: 100,
        }
    }
}

type RetryFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// AWS S3 storage backend
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    config: Arc<S3Config>,
}

impl S3Backend {
    /// Create a new S3 backend with the given bucket name and default settings
    pub async fn new(bucket: impl Into<String>) -> Result<Self> {
        Self::with_config(S3Config {
            bucket: bucket.into(),
            ..Default::default()
        })
        .await
    }

    /// Create a new S3 backend with custom configuration
    ///
    /// # Errors
    ///
    /// Fails if the bucket name is empty or the bucket cannot be reached.
    pub async fn with_config(config: S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::backend("S3 bucket name is empty").into());
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let client = if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint.clone())
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        client
            .head_bucket()
            .bucket(&config.bucket)
            .send()
            .await
            .context(format!(
                "Failed to verify S3 bucket access: {}",
                config.bucket
            ))?;

        debug!(
            bucket = %config.bucket,
            region = ?sdk_config.region(),
            "Connected to S3 bucket"
        );

        Ok(S3Backend {
            client,
            config: Arc::new(config),
        })
    }

    /// Bucket this backend writes to
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Run `operation` with exponential backoff.
    ///
    /// A missing key is final and returned without retrying.
    async fn with_retry<F, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> RetryFuture<T>,
    {
        let mut attempt = 0;
        let mut delay_ms = self.config.initial_retry_delay_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if crate::is_not_found(&e) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        return Err(e).context(format!("Failed after {} attempts", attempt));
                    }

                    warn!(
                        "S3 operation failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, self.config.max_retries, delay_ms, e
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(10_000);
                }
            }
        }
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.config.bucket)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key.clone();

            Box::pin(async move {
                debug!("Getting object from S3: {}", key);

                let response = match client.get_object().bucket(&bucket).key(&key).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        let missing = e
                            .as_service_error()
                            .is_some_and(|se| se.is_no_such_key());
                        if missing {
                            return Err(anyhow::Error::from(StorageError::not_found(key)));
                        }
                        return Err(anyhow!("Failed to get object {}: {}", key, e));
                    }
                };

                let body = response
                    .body
                    .collect()
                    .await
                    .map_err(|e| anyhow!("Failed to read object body: {}", e))?;

                Ok::<_, anyhow::Error>(body.into_bytes().to_vec())
            })
        })
        .await
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        debug!("Putting object to S3: {} ({} bytes)", key, data.len());

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key = key.to_string();
        let data = Bytes::copy_from_slice(data);

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key.clone();
            let data = data.clone();

            Box::pin(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .body(data.into())
                    .send()
                    .await
                    .map_err(|e| anyhow!("Failed to put object {}: {}", key, e))?;
                Ok::<_, anyhow::Error>(())
            })
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key.clone();

            Box::pin(async move {
                match client.head_object().bucket(&bucket).key(&key).send().await {
                    Ok(_) => Ok::<_, anyhow::Error>(true),
                    Err(e) => {
                        let missing = e.as_service_error().is_some_and(|se| se.is_not_found())
                            || e.raw_response().map(|r| r.status().as_u16()) == Some(404);
                        if missing {
                            Ok(false)
                        } else {
                            Err(anyhow!("Failed to check object existence: {}", e))
                        }
                    }
                }
            })
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key.clone();

            Box::pin(async move {
                debug!("Deleting object from S3: {}", key);
                client
                    .delete_object()
                    .bucket(&bucket)
                    .key(&key)
                    .send()
                    .await
                    .map_err(|e| anyhow!("Failed to delete object {}: {}", key, e))?;
                Ok::<_, anyhow::Error>(())
            })
        })
        .await
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let prefix = prefix.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let prefix = prefix.clone();

            Box::pin(async move {
                let mut result = vec![];
                let mut continuation_token: Option<String> = None;

                loop {
                    let mut request = client.list_objects_v2().bucket(&bucket);
                    if !prefix.is_empty() {
                        request = request.prefix(&prefix);
                    }
                    if let Some(token) = continuation_token {
                        request = request.continuation_token(token);
                    }

                    let response = request
                        .send()
                        .await
                        .map_err(|e| anyhow!("Failed to list objects: {}", e))?;

                    result.extend(
                        response
                            .contents()
                            .iter()
                            .filter_map(|obj| obj.key().map(str::to_string)),
                    );

                    if response.is_truncated() == Some(true) {
                        continuation_token =
                            response.next_continuation_token().map(str::to_string);
                    } else {
                        break;
                    }
                }

                result.sort();
                debug!("Found {} objects with prefix: '{}'", result.len(), prefix);
                Ok::<_, anyhow::Error>(result)
            })
        })
        .await
    }
}
