// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Consumer integration tests: dedup, dead-lettering, offset discipline.

mod common;

use std::sync::Arc;

use common::*;
use serde_json::json;

use fleetwatch_messaging::{EventPublisher, InMemoryBroker};
use fleetwatch_workflow::consumer::{EventConsumer, EventConsumerConfig};
use fleetwatch_workflow::store::InstanceStore;

const INGRESS: &str = "vehicle.events";
const GROUP: &str = "workflow-engine";
const DLQ: &str = "workflow.dlq";

struct RunningConsumer {
    shutdown: Arc<tokio::sync::Notify>,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningConsumer {
    async fn stop(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }
}

fn spawn_consumer(broker: &InMemoryBroker, test: &TestEngine) -> RunningConsumer {
    let mut consumer = EventConsumer::new(
        broker.subscribe(INGRESS, GROUP),
        Arc::new(broker.clone()),
        test.engine.clone(),
        test.dedup.clone(),
        EventConsumerConfig {
            dlq_topic: DLQ.to_string(),
            retry_pause: std::time::Duration::from_millis(10),
        },
    );
    let shutdown = consumer.shutdown_handle();
    let handle = tokio::spawn(async move { consumer.run().await });
    RunningConsumer { shutdown, handle }
}

async fn publish_event(
    broker: &InMemoryBroker,
    event_id: &str,
    event_type: &str,
    correlation_id: &str,
) {
    let envelope = json!({
        "event_id": event_id,
        "event_type": event_type,
        "correlation_id": correlation_id,
        "payload": {},
        "timestamp": "2025-06-01T12:00:00Z",
    });
    broker
        .publish(INGRESS, correlation_id, &serde_json::to_vec(&envelope).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn events_advance_the_instance_through_its_workflow() {
    let broker = InMemoryBroker::new();
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Default::default())
        .await
        .unwrap();

    let running = spawn_consumer(&broker, &test);
    publish_event(&broker, "e1", "activate", "v1").await;
    wait_for_state(&test.store, &instance.id, "active").await;

    publish_event(&broker, "e2", "retire", "v1").await;
    wait_for_state(&test.store, &instance.id, "retired").await;

    let stored = test.store.find_by_id(&instance.id).await.unwrap();
    assert_eq!(stored.history.len(), 2);
    running.stop().await;
}

#[tokio::test]
async fn duplicate_event_ids_are_processed_at_most_once() {
    let broker = InMemoryBroker::new();
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Default::default())
        .await
        .unwrap();

    let running = spawn_consumer(&broker, &test);
    publish_event(&broker, "e1", "activate", "v1").await;
    wait_for_state(&test.store, &instance.id, "active").await;

    // Redelivery of the same event id: skipped, history unchanged, no DLQ.
    publish_event(&broker, "e1", "activate", "v1").await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let stored = test.store.find_by_id(&instance.id).await.unwrap();
    assert_eq!(stored.current_state, "active");
    assert_eq!(stored.history.len(), 1);
    assert!(broker.topic_messages(DLQ).is_empty());
    running.stop().await;
}

#[tokio::test]
async fn malformed_messages_go_to_the_dlq_with_headers() {
    let broker = InMemoryBroker::new();
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);

    let running = spawn_consumer(&broker, &test);
    broker
        .publish(INGRESS, "v1", b"{not json at all")
        .await
        .unwrap();

    wait_until("DLQ message", || !broker.topic_messages(DLQ).is_empty()).await;
    let dlq = broker.topic_messages(DLQ);
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].payload, b"{not json at all");

    let header = |name: &str| {
        dlq[0]
            .headers
            .iter()
            .find(|h| h.key == name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .value
            .clone()
    };
    assert!(!header("error").is_empty());
    assert_eq!(header("original_topic"), INGRESS.as_bytes());
    assert!(!header("original_partition").is_empty());

    // The poison message does not block the partition.
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Default::default())
        .await
        .unwrap();
    publish_event(&broker, "e1", "activate", "v1").await;
    wait_for_state(&test.store, &instance.id, "active").await;
    running.stop().await;
}

#[tokio::test]
async fn engine_failures_are_dead_lettered_and_do_not_stall() {
    let broker = InMemoryBroker::new();
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);

    let running = spawn_consumer(&broker, &test);

    // No instance for this correlation id.
    publish_event(&broker, "e1", "activate", "ghost").await;
    wait_until("DLQ message", || !broker.topic_messages(DLQ).is_empty()).await;

    // An unmatched trigger is also permanent: straight to the DLQ.
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Default::default())
        .await
        .unwrap();
    publish_event(&broker, "e2", "retire", "v1").await;
    wait_until("second DLQ message", || {
        broker.topic_messages(DLQ).len() == 2
    })
    .await;

    // The instance is untouched and the consumer keeps going.
    publish_event(&broker, "e3", "activate", "v1").await;
    wait_for_state(&test.store, &instance.id, "active").await;
    running.stop().await;
}

#[tokio::test]
async fn missing_event_id_disables_dedup() {
    let broker = InMemoryBroker::new();
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Default::default())
        .await
        .unwrap();

    let running = spawn_consumer(&broker, &test);
    publish_event(&broker, "", "activate", "v1").await;
    wait_for_state(&test.store, &instance.id, "active").await;
    publish_event(&broker, "", "retire", "v1").await;
    wait_for_state(&test.store, &instance.id, "retired").await;
    running.stop().await;
}
