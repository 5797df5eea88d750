// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that expires old processed-event records.
//!
//! Dedup records only need to outlive the broker's redelivery horizon; rows
//! older than the retention window are deleted in batches each tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::store::DedupStore;

/// Configuration for the dedup cleanup worker.
#[derive(Debug, Clone)]
pub struct DedupCleanupConfig {
    /// How often to run cleanup.
    pub poll_interval: Duration,
    /// How long processed-event records are kept.
    pub retention: Duration,
}

impl Default for DedupCleanupConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3600),
            retention: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Background worker that purges expired dedup records.
pub struct DedupCleanupWorker {
    dedup: Arc<dyn DedupStore>,
    config: DedupCleanupConfig,
    shutdown: Arc<Notify>,
}

impl DedupCleanupWorker {
    /// Create a new cleanup worker.
    pub fn new(dedup: Arc<dyn DedupStore>, config: DedupCleanupConfig) -> Self {
        Self {
            dedup,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the cleanup loop until shutdown is signaled.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            retention_days = self.config.retention.as_secs() / 86400,
            "Dedup cleanup worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Dedup cleanup worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Failed to purge expired dedup records");
                    }
                }
            }
        }

        info!("Dedup cleanup worker stopped");
    }

    /// Purge records older than the retention window.
    pub async fn tick(&self) -> Result<()> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.retention).unwrap_or(chrono::Duration::days(7));
        let purged = self.dedup.purge_expired(cutoff).await?;
        if purged > 0 {
            info!(purged, "Purged expired dedup records");
        } else {
            debug!("No expired dedup records");
        }
        Ok(())
    }
}
