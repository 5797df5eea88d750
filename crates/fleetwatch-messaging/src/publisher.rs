// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Publish-side broker contract.

use async_trait::async_trait;
use tracing::debug;

use crate::broker::Header;
use crate::error::Result;

/// Broker publish contract.
///
/// The message key drives partition assignment: messages with the same key
/// are delivered in publish order. Implementations must be safe to share
/// across tasks.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a message to `topic`, partitioned by `key`.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        self.publish_with_headers(topic, key, payload, Vec::new())
            .await
    }

    /// Publish a message with additional headers (used for DLQ annotations).
    async fn publish_with_headers(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        headers: Vec<Header>,
    ) -> Result<()>;

    /// Release broker resources. Publishing after close returns `Closed`.
    async fn close(&self) {}
}

/// Publisher that drops every message.
///
/// Used by tests and by deployments that disable external event propagation.
#[derive(Debug, Clone, Default)]
pub struct NoopPublisher;

impl NoopPublisher {
    /// Create a new no-op publisher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish_with_headers(
        &self,
        topic: &str,
        _key: &str,
        payload: &[u8],
        _headers: Vec<Header>,
    ) -> Result<()> {
        debug!(topic = %topic, bytes = payload.len(), "Dropping event (noop publisher)");
        Ok(())
    }
}
