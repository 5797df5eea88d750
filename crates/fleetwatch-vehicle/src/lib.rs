// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fleetwatch Vehicle - aggregate write side and transactional outbox.
//!
//! Every state change on a vehicle becomes exactly one published external
//! event, despite crashes and broker outages:
//!
//! ```text
//! command ──▶ aggregate (version+1, buffer event)
//!                │ save (conditional upsert on version-1)
//!                ▼
//!            vehicles table          outbox table (pending row)
//!                                        │  relay tick (5s)
//!                                        ▼
//!                                     broker topic (keyed by vehicle id)
//! ```
//!
//! The aggregate save and the outbox append are two separate writes. The
//! window where the save lands and the append does not is recovered by
//! command retry: mutators no-op on equal values, so a retry re-appends an
//! event only if it actually advances the version. Downstream consumers
//! deduplicate, so relay re-publishes after a crash are harmless.
//!
//! # Modules
//!
//! - [`command`]: per-request write path (validate → load → mutate → save → outbox)
//! - [`config`]: service configuration from environment variables
//! - [`domain`]: the vehicle aggregate, value objects, and domain events
//! - [`error`]: error types
//! - [`migrations`]: embedded PostgreSQL migrations
//! - [`relay`]: background worker draining the outbox to the broker
//! - [`resilience`]: retry policy and circuit breaker used by the relay
//! - [`store`]: vehicle and outbox store traits with Postgres and in-memory backends

/// Per-request command handling.
pub mod command;

/// Service configuration from environment variables.
pub mod config;

/// Vehicle domain model.
pub mod domain;

/// Error types for vehicle operations.
pub mod error;

/// Embedded PostgreSQL migrations.
pub mod migrations;

/// Outbox relay background worker.
pub mod relay;

/// Retry and circuit-breaker primitives.
pub mod resilience;

/// Store traits and backends.
pub mod store;

pub use command::CommandPipeline;
pub use error::{Result, VehicleError};
pub use relay::{OutboxRelay, OutboxRelayConfig};
