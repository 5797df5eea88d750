// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the vehicle service.

use fleetwatch_messaging::BrokerError;
use thiserror::Error;

/// Vehicle service errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VehicleError {
    /// Input validation failed before any store I/O.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// Vehicle was not found in the store.
    #[error("vehicle '{vehicle_id}' not found")]
    VehicleNotFound {
        /// The vehicle id that was not found.
        vehicle_id: String,
    },

    /// A vehicle with this VIN already exists.
    #[error("vehicle with vin '{vin}' already exists")]
    DuplicateVin {
        /// The conflicting VIN.
        vin: String,
    },

    /// Outbox row was not found.
    #[error("outbox event '{event_id}' not found")]
    OutboxEventNotFound {
        /// The outbox event id.
        event_id: String,
    },

    /// A concurrent writer advanced the aggregate; re-read and retry.
    #[error("concurrency conflict on vehicle '{vehicle_id}': version mismatch")]
    ConcurrencyConflict {
        /// The vehicle whose version predicate failed.
        vehicle_id: String,
    },

    /// The circuit breaker is open; the call was rejected without executing.
    #[error("circuit breaker is open, request rejected")]
    CircuitOpen,

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Event payload (de)serialization failed.
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Broker publish failed.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

impl VehicleError {
    /// Whether the caller may retry after re-reading the aggregate.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. }
                | Self::CircuitOpen
                | Self::Store(_)
                | Self::Broker(_)
        )
    }
}

/// Result type using VehicleError.
pub type Result<T> = std::result::Result<T, VehicleError>;
