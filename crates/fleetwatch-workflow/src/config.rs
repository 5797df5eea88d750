// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Workflow service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Directory holding workflow definition YAML files.
    pub workflow_dir: String,
    /// HTTP API bind address.
    pub http_addr: SocketAddr,
    /// Topic the consumer reads ingress events from.
    pub ingress_topic: String,
    /// Consumer group id.
    pub consumer_group: String,
    /// Dead-letter topic for unprocessable messages.
    pub dlq_topic: String,
    /// How often the timeout worker scans for elapsed deadlines.
    pub timeout_interval: Duration,
    /// Instances per timeout-worker tick.
    pub timeout_batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `FLEETWATCH_DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional (with defaults):
    /// - `FLEETWATCH_WORKFLOW_DIR`: definition directory (default: `./workflows`)
    /// - `FLEETWATCH_HTTP_PORT`: HTTP API port (default: 8084)
    /// - `FLEETWATCH_INGRESS_TOPIC`: ingress topic (default: `vehicle.events`)
    /// - `FLEETWATCH_CONSUMER_GROUP`: consumer group id (default: `workflow-engine`)
    /// - `FLEETWATCH_DLQ_TOPIC`: dead-letter topic (default: `workflow.dlq`)
    /// - `FLEETWATCH_TIMEOUT_INTERVAL_SECS`: timeout scan interval (default: 30)
    /// - `FLEETWATCH_TIMEOUT_BATCH_SIZE`: instances per scan (default: 50)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("FLEETWATCH_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("FLEETWATCH_DATABASE_URL"))?;

        let workflow_dir =
            std::env::var("FLEETWATCH_WORKFLOW_DIR").unwrap_or_else(|_| "./workflows".to_string());

        let http_port: u16 = std::env::var("FLEETWATCH_HTTP_PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("FLEETWATCH_HTTP_PORT", "must be a valid port"))?;

        let ingress_topic = std::env::var("FLEETWATCH_INGRESS_TOPIC")
            .unwrap_or_else(|_| "vehicle.events".to_string());

        let consumer_group = std::env::var("FLEETWATCH_CONSUMER_GROUP")
            .unwrap_or_else(|_| "workflow-engine".to_string());

        let dlq_topic =
            std::env::var("FLEETWATCH_DLQ_TOPIC").unwrap_or_else(|_| "workflow.dlq".to_string());

        let timeout_interval_secs: u64 = std::env::var("FLEETWATCH_TIMEOUT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "FLEETWATCH_TIMEOUT_INTERVAL_SECS",
                    "must be a positive integer",
                )
            })?;

        let timeout_batch_size: i64 = std::env::var("FLEETWATCH_TIMEOUT_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("FLEETWATCH_TIMEOUT_BATCH_SIZE", "must be a positive integer")
            })?;

        Ok(Self {
            database_url,
            workflow_dir,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            ingress_topic,
            consumer_group,
            dlq_topic,
            timeout_interval: Duration::from_secs(timeout_interval_secs),
            timeout_batch_size,
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
