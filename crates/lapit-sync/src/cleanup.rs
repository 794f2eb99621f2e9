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

//! Background deletion of orphaned blobs
//!
//! Repository teardown deletes metadata first and blobs second. Blob
//! deletions that fail are handed to a [`CleanupQueue`], whose worker retries
//! them with a fixed delay and counts what it finally deletes or abandons.

use lapit_versioning::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Retry settings for the cleanup worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Attempts per job, including the first
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 500,
        }
    }
}

/// Work for the cleanup worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupJob {
    /// Delete these keys
    Keys(Vec<String>),
    /// Delete everything under this prefix
    Prefix(String),
}

/// Counters of the cleanup worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStats {
    /// Jobs queued or in progress
    pub pending: usize,
    /// Keys deleted by the worker
    pub deleted: u64,
    /// Keys given up on after the last attempt
    pub abandoned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    deleted: AtomicU64,
    abandoned: AtomicU64,
}

/// Handle to the cleanup worker
///
/// Cloning the handle shares the worker.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<CleanupJob>,
    pending: Arc<watch::Sender<usize>>,
    counters: Arc<Counters>,
}

impl CleanupQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(objects: ObjectStore, config: CleanupConfig) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CleanupJob>();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            objects,
            config,
            counters: Arc::clone(&counters),
        };
        let worker_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                worker.run(job).await;
                worker_pending.send_modify(|n| *n = n.saturating_sub(1));
            }
            debug!("Cleanup queue closed");
        });

        Self {
            tx,
            pending,
            counters,
        }
    }

    /// Queue a job
    pub fn enqueue(&self, job: CleanupJob) {
        if matches!(&job, CleanupJob::Keys(keys) if keys.is_empty()) {
            return;
        }
        self.pending.send_modify(|n| *n += 1);
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            warn!(?job, "Cleanup worker is gone, job dropped");
        }
    }

    /// Current counters
    pub fn stats(&self) -> CleanupStats {
        CleanupStats {
            pending: *self.pending.borrow(),
            deleted: self.counters.deleted.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Wait until every queued job has finished
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

struct Worker {
    objects: ObjectStore,
    config: CleanupConfig,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(&self, job: CleanupJob) {
        let attempts = self.config.max_attempts.max(1);
        let delay = Duration::from_millis(self.config.retry_delay_ms);

        let mut remaining = match job {
            CleanupJob::Keys(keys) => keys,
            CleanupJob::Prefix(prefix) => {
                match self.list_with_retry(&prefix, attempts, delay).await {
                    Some(keys) => keys,
                    None => return,
                }
            }
        };

        for attempt in 1..=attempts {
            let report = self.objects.delete_objects(&remaining).await;
            self.counters
                .deleted
                .fetch_add(report.deleted.len() as u64, Ordering::Relaxed);
            remaining = report.failed;

            if remaining.is_empty() {
                return;
            }
            if attempt < attempts {
                debug!(attempt, keys = remaining.len(), "Retrying blob cleanup");
                tokio::time::sleep(delay).await;
            }
        }

        self.counters
            .abandoned
            .fetch_add(remaining.len() as u64, Ordering::Relaxed);
        warn!(keys = ?remaining, attempts, "Abandoned orphaned blobs");
    }

    async fn list_with_retry(
        &self,
        prefix: &str,
        attempts: u32,
        delay: Duration,
    ) -> Option<Vec<String>> {
        for attempt in 1..=attempts {
            match self.objects.list_objects(prefix).await {
                Ok(keys) => return Some(keys),
                Err(e) if attempt < attempts => {
                    debug!(prefix, attempt, error = %e, "Listing for cleanup failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(prefix, error = %e, "Gave up listing orphaned blobs");
                }
            }
        }
        info!(prefix, "Prefix left for garbage collection");
        None
    }
}
