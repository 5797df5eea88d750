// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Messaging primitives shared by the fleetwatch services.
//!
//! The platform moves every state change through an ordered, partitioned,
//! at-least-once broker. This crate defines the pieces both services agree on:
//!
//! - [`publisher::EventPublisher`]: the publish-side contract. Production
//!   deployments back it with an external broker; tests and single-node
//!   deployments use the in-process broker below; deployments that disable
//!   propagation use [`publisher::NoopPublisher`].
//! - [`broker::InMemoryBroker`]: an in-process broker with per-key
//!   partitioning, consumer groups, and manual offset commit. Messages are
//!   ordered within a partition; a fetched-but-uncommitted message is
//!   redelivered after a resubscribe or an explicit rewind.
//! - [`envelope`]: the JSON wire envelopes (`IncomingEvent` on the ingress
//!   topic, `TransitionEvent` on `workflow.transitions`).
//! - [`topics`]: the fixed event-tag → topic registry.
//!
//! Partitioning is by message key: all messages sharing a key land on the
//! same partition and are therefore totally ordered relative to each other.
//! Services key vehicle events by aggregate id and transition events by
//! correlation id.

#![deny(missing_docs)]

/// In-process partitioned broker with consumer groups.
pub mod broker;

/// JSON wire envelopes for ingress and transition events.
pub mod envelope;

/// Broker error types.
pub mod error;

/// Publish-side broker contract and the no-op implementation.
pub mod publisher;

/// Event-tag → topic registry.
pub mod topics;

pub use broker::{Header, InMemoryBroker, Message, Subscription};
pub use envelope::{IncomingEvent, TransitionEvent};
pub use error::{BrokerError, Result};
pub use publisher::{EventPublisher, NoopPublisher};
