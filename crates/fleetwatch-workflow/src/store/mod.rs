// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Store interfaces and backends for the workflow service.
//!
//! The instance store serializes concurrent transitions with an
//! optimistic-locked update; the dedup store records processed event ids so
//! at-least-once delivery becomes at-most-once processing. Both have a
//! PostgreSQL backend and an in-memory backend for tests and embedded
//! deployments.

pub mod memory;
pub mod postgres;

pub use self::memory::{MemoryDedupStore, MemoryInstanceStore};
pub use self::postgres::{PostgresDedupStore, PostgresInstanceStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::instance::{InstanceFilter, WorkflowInstance};

/// Durable workflow-instance storage.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert a new instance. Sets `version = 1` and both timestamps on the
    /// passed instance. A duplicate correlation id fails with
    /// `DuplicateInstance`.
    async fn create(&self, instance: &mut WorkflowInstance) -> Result<()>;

    /// Conditionally update `current_state`, `context`, `history`,
    /// `updated_at`, and `timeout_at`, predicated on `version`, incrementing
    /// it. No match fails with `ConcurrentModification`; on success the
    /// passed instance's version and `updated_at` are advanced.
    async fn update(&self, instance: &mut WorkflowInstance) -> Result<()>;

    /// Point lookup by instance id; missing ⇒ `InstanceNotFound`.
    async fn find_by_id(&self, id: &str) -> Result<WorkflowInstance>;

    /// Point lookup by correlation id; missing ⇒ `InstanceNotFound`.
    async fn find_by_correlation_id(&self, correlation_id: &str) -> Result<WorkflowInstance>;

    /// Exact-match filtered listing, newest first.
    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>>;

    /// Instances whose deadline has elapsed, oldest deadline first.
    async fn find_pending_timeouts(&self, limit: i64) -> Result<Vec<WorkflowInstance>>;
}

/// Processed-event records with TTL-based expiry.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether this event id was already processed.
    async fn is_processed(&self, event_id: &str) -> Result<bool>;

    /// Record an event id as processed. A duplicate insert fails with
    /// `DuplicateEvent`.
    async fn mark_processed(&self, event_id: &str, instance_id: &str) -> Result<()>;

    /// Delete records processed before `older_than`. Returns the number of
    /// rows removed.
    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64>;
}
