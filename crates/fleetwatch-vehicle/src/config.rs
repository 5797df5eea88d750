// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

/// Vehicle service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// How often the outbox relay scans for pending events.
    pub relay_poll_interval: Duration,
    /// Maximum pending events claimed per relay tick.
    pub relay_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `FLEETWATCH_DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional (with defaults):
    /// - `FLEETWATCH_RELAY_POLL_INTERVAL_SECS`: relay poll interval (default: 5)
    /// - `FLEETWATCH_RELAY_BATCH_SIZE`: events per relay tick (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("FLEETWATCH_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("FLEETWATCH_DATABASE_URL"))?;

        let relay_poll_interval_secs: u64 = std::env::var("FLEETWATCH_RELAY_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "FLEETWATCH_RELAY_POLL_INTERVAL_SECS",
                    "must be a positive integer",
                )
            })?;

        let relay_batch_size: i64 = std::env::var("FLEETWATCH_RELAY_BATCH_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("FLEETWATCH_RELAY_BATCH_SIZE", "must be a positive integer")
            })?;

        Ok(Self {
            database_url,
            relay_poll_interval: Duration::from_secs(relay_poll_interval_secs),
            relay_batch_size,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
