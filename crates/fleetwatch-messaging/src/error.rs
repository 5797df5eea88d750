// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for broker operations.

use thiserror::Error;

/// Broker errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BrokerError {
    /// The broker rejected or failed an I/O operation. Retriable.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The publisher or subscription has been closed.
    #[error("broker connection closed")]
    Closed,

    /// A message payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type using BrokerError.
pub type Result<T> = std::result::Result<T, BrokerError>;
