// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Store interfaces and backends for the vehicle service.
//!
//! Two stores back the write side: the vehicle store (conditional upserts
//! keyed on the aggregate version) and the outbox store (append-only pending
//! event log drained by the relay). Both have a PostgreSQL backend and an
//! in-memory backend for tests and embedded deployments.

pub mod memory;
pub mod postgres;

pub use self::memory::{MemoryOutboxStore, MemoryVehicleStore};
pub use self::postgres::{PostgresOutboxStore, PostgresVehicleStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Vehicle, VehicleEvent, VehicleId};
use crate::error::Result;

/// A row in the transactional outbox.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    /// Unique event id, generated at append time.
    pub id: Uuid,
    /// Id of the aggregate the event belongs to; used as the partition key.
    pub aggregate_id: String,
    /// Stable event type tag (see the messaging topic registry).
    pub event_type: String,
    /// Canonical JSON payload bytes.
    pub payload: Vec<u8>,
    /// When the row was appended.
    pub created_at: DateTime<Utc>,
    /// When the row was acked by the relay; pending while absent.
    pub published_at: Option<DateTime<Utc>>,
}

/// Vehicle aggregate storage with optimistic concurrency.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Conditionally upsert the aggregate, predicated on `version - 1`.
    ///
    /// Fails with `ConcurrencyConflict` when a concurrent writer advanced the
    /// row; the caller must re-read, re-apply, and re-save.
    async fn save(&self, vehicle: &Vehicle) -> Result<()>;

    /// Load a vehicle by id; missing ⇒ `VehicleNotFound`.
    async fn find_by_id(&self, id: &VehicleId) -> Result<Vehicle>;

    /// List vehicles with pagination.
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<Vehicle>>;

    /// Whether a vehicle with this VIN exists.
    async fn exists_by_vin(&self, vin: &str) -> Result<bool>;

    /// Remove a vehicle; missing ⇒ `VehicleNotFound`.
    async fn delete(&self, id: &VehicleId) -> Result<()>;
}

/// Append-only pending-event log with claim/ack semantics.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Serialize the event and insert a pending row with a fresh event id.
    async fn append(&self, aggregate_id: &str, event: &VehicleEvent) -> Result<()>;

    /// Up to `limit` pending rows, ordered by `created_at` ascending.
    async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxRecord>>;

    /// Ack a row as published. Re-marking an already-published row is a
    /// no-op success; a missing row is `OutboxEventNotFound`.
    async fn mark_published(&self, event_id: Uuid) -> Result<()>;
}
