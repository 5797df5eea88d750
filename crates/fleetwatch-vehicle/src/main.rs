// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fleetwatch Vehicle service binary.
//!
//! Runs the outbox relay against the configured database. The publisher
//! defaults to the no-op implementation; deployments with an external broker
//! plug their adapter in here.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use fleetwatch_messaging::NoopPublisher;
use fleetwatch_vehicle::config::Config;
use fleetwatch_vehicle::store::PostgresOutboxStore;
use fleetwatch_vehicle::{migrations, OutboxRelay, OutboxRelayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleetwatch_vehicle=info".parse().unwrap()),
        )
        .init();

    info!("Starting Fleetwatch Vehicle");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Running database migrations...");
    migrations::run_postgres(&pool).await?;
    info!("Migrations completed");

    let outbox = Arc::new(PostgresOutboxStore::new(pool.clone()));
    let publisher = Arc::new(NoopPublisher::new());

    let relay = Arc::new(OutboxRelay::new(
        outbox,
        publisher,
        OutboxRelayConfig {
            poll_interval: config.relay_poll_interval,
            batch_size: config.relay_batch_size,
            ..OutboxRelayConfig::default()
        },
    ));
    let relay_shutdown = relay.shutdown_handle();
    let relay_handle = tokio::spawn({
        let relay = relay.clone();
        async move { relay.run().await }
    });

    info!("Fleetwatch Vehicle initialized");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    relay_shutdown.notify_one();
    let _ = relay_handle.await;

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}
