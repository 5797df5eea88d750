// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that drains the transactional outbox.
//!
//! Each tick claims a batch of pending rows in `created_at` order and
//! publishes them one by one, keyed by aggregate id so the broker preserves
//! per-aggregate ordering. A row is acked only after a successful publish;
//! rows that exhaust their retries stay pending for the next tick, so nothing
//! is ever dropped. Publish attempts run retry-inside-breaker.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_messaging::{topics, EventPublisher};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use crate::error::{Result, VehicleError};
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::store::OutboxStore;

/// Configuration for the outbox relay.
#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    /// How often to scan for pending events.
    pub poll_interval: Duration,
    /// Maximum events claimed per tick.
    pub batch_size: i64,
    /// Total publish attempts per event per tick.
    pub retry_max_attempts: u32,
    /// Initial retry backoff; doubles per attempt.
    pub retry_backoff: Duration,
    /// Retry backoff cap.
    pub retry_max_backoff: Duration,
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: u32,
    /// Consecutive half-open successes before the breaker closes.
    pub breaker_success_threshold: u32,
    /// How long the breaker stays open before probing.
    pub breaker_timeout: Duration,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            retry_max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
            retry_max_backoff: Duration::from_secs(2),
            breaker_failure_threshold: 5,
            breaker_success_threshold: 2,
            breaker_timeout: Duration::from_secs(30),
        }
    }
}

/// Background worker that publishes pending outbox events.
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxStore>,
    publisher: Arc<dyn EventPublisher>,
    config: OutboxRelayConfig,
    retry: RetryPolicy,
    breaker: Mutex<CircuitBreaker>,
    shutdown: Arc<Notify>,
}

impl OutboxRelay {
    /// Create a new relay.
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        publisher: Arc<dyn EventPublisher>,
        config: OutboxRelayConfig,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.retry_max_attempts,
            config.retry_backoff,
            config.retry_max_backoff,
        );
        let breaker = Mutex::new(CircuitBreaker::new(
            config.breaker_failure_threshold,
            config.breaker_success_threshold,
            config.breaker_timeout,
        ));
        Self {
            outbox,
            publisher,
            config,
            retry,
            breaker,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the relay loop until shutdown is signaled.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Outbox relay received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Failed to process pending outbox events");
                    }
                }
            }
        }

        info!("Outbox relay stopped");
    }

    /// Process one batch of pending events.
    pub async fn tick(&self) -> Result<()> {
        let events = self.outbox.get_pending(self.config.batch_size).await?;
        if events.is_empty() {
            return Ok(());
        }

        debug!(count = events.len(), "Processing pending outbox events");

        let mut breaker = self.breaker.lock().await;
        for record in events {
            let topic = topics::topic_for_event(&record.event_type);
            let published = breaker
                .execute(|| {
                    self.retry.execute(|| async {
                        self.publisher
                            .publish(topic, &record.aggregate_id, &record.payload)
                            .await
                            .map_err(VehicleError::from)
                    })
                })
                .await;

            match published {
                Ok(()) => {
                    if let Err(e) = self.outbox.mark_published(record.id).await {
                        error!(
                            event_id = %record.id,
                            error = %e,
                            "Failed to mark event as published"
                        );
                    }
                }
                Err(e) => {
                    // Row stays pending; the next tick picks it up again.
                    warn!(
                        event_id = %record.id,
                        topic = %topic,
                        error = %e,
                        "Failed to publish event"
                    );
                }
            }
        }

        Ok(())
    }
}
