// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ingress event consumer.
//!
//! Reads the ingress topic sequentially per partition and never advances the
//! offset past a message until either the engine succeeded or the
//! dead-letter write succeeded:
//!
//! - duplicate event id → skip and commit,
//! - engine success → record the event id, commit,
//! - retriable failure (optimistic-lock conflict, store/broker outage) →
//!   rewind and reprocess after a pause,
//! - permanent failure (malformed envelope, no instance, invalid transition)
//!   → write to the DLQ with error headers, then commit; if the DLQ write
//!   itself fails, rewind instead of committing.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_messaging::broker::{Header, Message, Subscription};
use fleetwatch_messaging::{EventPublisher, IncomingEvent};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::engine::WorkflowEngine;
use crate::error::{Result, WorkflowError};
use crate::store::DedupStore;

/// Configuration for the ingress consumer.
#[derive(Debug, Clone)]
pub struct EventConsumerConfig {
    /// Topic receiving messages the engine could not process.
    pub dlq_topic: String,
    /// Pause before reprocessing after a retriable failure.
    pub retry_pause: Duration,
}

impl Default for EventConsumerConfig {
    fn default() -> Self {
        Self {
            dlq_topic: "workflow.dlq".to_string(),
            retry_pause: Duration::from_millis(100),
        }
    }
}

/// Background worker consuming the ingress topic.
pub struct EventConsumer {
    subscription: Subscription,
    dlq: Arc<dyn EventPublisher>,
    engine: Arc<WorkflowEngine>,
    dedup: Arc<dyn DedupStore>,
    config: EventConsumerConfig,
    shutdown: Arc<Notify>,
}

impl EventConsumer {
    /// Create a consumer over a subscription.
    ///
    /// `dlq` is the publish handle used for dead-letter writes; it is usually
    /// the same broker the subscription came from.
    pub fn new(
        subscription: Subscription,
        dlq: Arc<dyn EventPublisher>,
        engine: Arc<WorkflowEngine>,
        dedup: Arc<dyn DedupStore>,
        config: EventConsumerConfig,
    ) -> Self {
        Self {
            subscription,
            dlq,
            engine,
            dedup,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the consume loop until shutdown is signaled or the broker closes.
    pub async fn run(&mut self) {
        info!(dlq_topic = %self.config.dlq_topic, "Event consumer started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Event consumer received shutdown signal");
                    break;
                }

                fetched = self.subscription.fetch() => {
                    match fetched {
                        Ok(message) => self.handle_message(message).await,
                        Err(e) => {
                            error!(error = %e, "Failed to fetch message, stopping consumer");
                            break;
                        }
                    }
                }
            }
        }

        info!("Event consumer stopped");
    }

    /// Process one fetched message and decide its offset fate.
    pub async fn handle_message(&mut self, message: Message) {
        match self.process(&message).await {
            Ok(()) => self.commit(&message),
            Err(err) if err.is_retriable() => {
                warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %err,
                    "Retriable failure, message will be reprocessed"
                );
                self.subscription.rewind(&message);
                tokio::time::sleep(self.config.retry_pause).await;
            }
            Err(err) => {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %err,
                    "Failed to process message"
                );
                match self.send_to_dlq(&message, &err).await {
                    Ok(()) => self.commit(&message),
                    Err(dlq_err) => {
                        // No offset advance without a successful DLQ write.
                        error!(error = %dlq_err, "Failed to send message to DLQ");
                        self.subscription.rewind(&message);
                        tokio::time::sleep(self.config.retry_pause).await;
                    }
                }
            }
        }
    }

    async fn process(&self, message: &Message) -> Result<()> {
        let event: IncomingEvent =
            serde_json::from_slice(&message.payload).map_err(|e| WorkflowError::MalformedEvent {
                reason: e.to_string(),
            })?;

        // An empty event id disables deduplication for this message.
        if !event.event_id.is_empty() && self.dedup.is_processed(&event.event_id).await? {
            info!(event_id = %event.event_id, "Event already processed, skipping");
            return Ok(());
        }

        let instance = self
            .engine
            .process_event(&event.correlation_id, &event.event_type, event.payload.clone())
            .await?;

        if !event.event_id.is_empty() {
            match self.dedup.mark_processed(&event.event_id, &instance.id).await {
                Ok(()) => {}
                // A parallel consumer won the race; the transition itself
                // happened exactly once under the instance's optimistic lock.
                Err(WorkflowError::DuplicateEvent { .. }) => {
                    debug!(event_id = %event.event_id, "Event marked processed concurrently");
                }
                Err(e) => {
                    warn!(event_id = %event.event_id, error = %e, "Failed to mark event as processed");
                }
            }
        }

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            correlation_id = %event.correlation_id,
            instance_id = %instance.id,
            "Successfully processed event"
        );

        Ok(())
    }

    async fn send_to_dlq(&self, message: &Message, processing_err: &WorkflowError) -> Result<()> {
        let mut headers = message.headers.clone();
        headers.push(Header::new("error", processing_err.to_string()));
        headers.push(Header::new("original_topic", message.topic.clone()));
        headers.push(Header::new(
            "original_partition",
            message.partition.to_string(),
        ));

        self.dlq
            .publish_with_headers(&self.config.dlq_topic, &message.key, &message.payload, headers)
            .await?;
        Ok(())
    }

    fn commit(&self, message: &Message) {
        if let Err(e) = self.subscription.commit(message) {
            error!(
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to commit message"
            );
        }
    }
}
