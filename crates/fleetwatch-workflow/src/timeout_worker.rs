// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that fires state timeouts.
//!
//! Each tick scans for instances whose `timeout_at` has elapsed and
//! synthesizes a `timeout` trigger per instance. A failed instance stays
//! eligible: its deadline is only cleared or reset when a transition commits,
//! so the next tick offers it again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info};

use crate::engine::WorkflowEngine;
use crate::error::Result;
use crate::store::InstanceStore;

/// Configuration for the timeout worker.
#[derive(Debug, Clone)]
pub struct TimeoutWorkerConfig {
    /// How often to scan for elapsed deadlines.
    pub interval: Duration,
    /// Maximum instances processed per tick.
    pub batch_size: i64,
}

impl Default for TimeoutWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch_size: 50,
        }
    }
}

/// Background worker that drives timed-out instances forward.
pub struct TimeoutWorker {
    store: Arc<dyn InstanceStore>,
    engine: Arc<WorkflowEngine>,
    config: TimeoutWorkerConfig,
    shutdown: Arc<Notify>,
}

impl TimeoutWorker {
    /// Create a new timeout worker.
    pub fn new(
        store: Arc<dyn InstanceStore>,
        engine: Arc<WorkflowEngine>,
        config: TimeoutWorkerConfig,
    ) -> Self {
        Self {
            store,
            engine,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the worker loop until shutdown is signaled.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Timeout worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Timeout worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.interval) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Failed to process timeouts");
                    }
                }
            }
        }

        info!("Timeout worker stopped");
    }

    /// Process one batch of elapsed deadlines.
    pub async fn tick(&self) -> Result<()> {
        let instances = self
            .store
            .find_pending_timeouts(self.config.batch_size)
            .await?;

        if instances.is_empty() {
            return Ok(());
        }

        info!(count = instances.len(), "Processing timeout instances");

        for instance in instances {
            match self.engine.process_timeout(&instance.id).await {
                Ok(updated) => {
                    info!(
                        instance_id = %instance.id,
                        workflow = %instance.workflow_name,
                        from = %instance.current_state,
                        to = %updated.current_state,
                        "Processed timeout for instance"
                    );
                }
                Err(e) => {
                    error!(
                        instance_id = %instance.id,
                        workflow = %instance.workflow_name,
                        error = %e,
                        "Failed to process timeout for instance"
                    );
                }
            }
        }

        Ok(())
    }
}
