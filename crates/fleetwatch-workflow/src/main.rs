// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fleetwatch Workflow service binary.
//!
//! Wires the registry, engine, ingress consumer, timeout worker, dedup
//! cleanup worker, and HTTP API. The in-process broker serves deployments
//! without an external broker; adapters for one plug in where the broker
//! handle is created.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use fleetwatch_messaging::{EventPublisher, InMemoryBroker};
use fleetwatch_workflow::api;
use fleetwatch_workflow::cleanup_worker::{DedupCleanupConfig, DedupCleanupWorker};
use fleetwatch_workflow::config::Config;
use fleetwatch_workflow::consumer::{EventConsumer, EventConsumerConfig};
use fleetwatch_workflow::loader::YamlLoader;
use fleetwatch_workflow::migrations;
use fleetwatch_workflow::publisher::TransitionPublisher;
use fleetwatch_workflow::store::{PostgresDedupStore, PostgresInstanceStore};
use fleetwatch_workflow::timeout_worker::{TimeoutWorker, TimeoutWorkerConfig};
use fleetwatch_workflow::{DefinitionRegistry, WorkflowEngine};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleetwatch_workflow=info".parse().unwrap()),
        )
        .init();

    info!("Starting Fleetwatch Workflow");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        workflow_dir = %config.workflow_dir,
        http_addr = %config.http_addr,
        ingress_topic = %config.ingress_topic,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Running database migrations...");
    migrations::run_postgres(&pool).await?;
    info!("Migrations completed");

    // Definitions must load and validate or startup fails.
    let registry = Arc::new(DefinitionRegistry::new(YamlLoader::new(&config.workflow_dir)));
    registry.initialize()?;

    let instances = Arc::new(PostgresInstanceStore::new(pool.clone()));
    let dedup = Arc::new(PostgresDedupStore::new(pool.clone()));

    let broker = InMemoryBroker::new();
    let publisher: Arc<dyn EventPublisher> = Arc::new(broker.clone());
    let transition_publisher = Arc::new(TransitionPublisher::new(publisher.clone()));

    let engine = Arc::new(WorkflowEngine::new(
        registry.clone(),
        instances.clone(),
        Some(transition_publisher),
    ));

    let mut consumer = EventConsumer::new(
        broker.subscribe(config.ingress_topic.as_str(), config.consumer_group.as_str()),
        publisher.clone(),
        engine.clone(),
        dedup.clone(),
        EventConsumerConfig {
            dlq_topic: config.dlq_topic.clone(),
            ..EventConsumerConfig::default()
        },
    );
    let consumer_shutdown = consumer.shutdown_handle();
    let consumer_handle = tokio::spawn(async move { consumer.run().await });

    let timeout_worker = Arc::new(TimeoutWorker::new(
        instances.clone(),
        engine.clone(),
        TimeoutWorkerConfig {
            interval: config.timeout_interval,
            batch_size: config.timeout_batch_size,
        },
    ));
    let timeout_shutdown = timeout_worker.shutdown_handle();
    let timeout_handle = tokio::spawn({
        let worker = timeout_worker.clone();
        async move { worker.run().await }
    });

    let cleanup_worker = Arc::new(DedupCleanupWorker::new(
        dedup.clone(),
        DedupCleanupConfig::default(),
    ));
    let cleanup_shutdown = cleanup_worker.shutdown_handle();
    let cleanup_handle = tokio::spawn({
        let worker = cleanup_worker.clone();
        async move { worker.run().await }
    });

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP API listening");
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api::router(engine)).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("Fleetwatch Workflow initialized");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    consumer_shutdown.notify_one();
    timeout_shutdown.notify_one();
    cleanup_shutdown.notify_one();
    http_handle.abort();

    let _ = consumer_handle.await;
    let _ = timeout_handle.await;
    let _ = cleanup_handle.await;

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}
