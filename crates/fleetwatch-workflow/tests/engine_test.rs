// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine integration tests against in-memory stores.

mod common;

use std::sync::Arc;

use common::*;
use serde_json::{json, Map, Value};

use fleetwatch_workflow::WorkflowError;

fn ctx(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn start_then_events_drive_instance_to_terminal_state() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);

    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();
    assert_eq!(instance.current_state, "new");
    assert_eq!(instance.version, 1);
    assert!(instance.history.is_empty());

    let instance = test
        .engine
        .process_event("v1", "activate", Map::new())
        .await
        .unwrap();
    assert_eq!(instance.current_state, "active");
    assert_eq!(instance.history.len(), 1);
    assert_eq!(instance.version, 2);

    let instance = test
        .engine
        .process_event("v1", "retire", Map::new())
        .await
        .unwrap();
    assert_eq!(instance.current_state, "retired");
    assert_eq!(instance.history.len(), 2);
    assert_eq!(instance.history[1].from_state, "active");
    assert_eq!(instance.history[1].to_state, "retired");
}

#[tokio::test]
async fn updated_at_strictly_increases_across_transitions() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let started = test
        .engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let after_first = test
        .engine
        .process_event("v1", "activate", Map::new())
        .await
        .unwrap();
    assert!(after_first.updated_at > started.updated_at);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let after_second = test
        .engine
        .process_event("v1", "retire", Map::new())
        .await
        .unwrap();
    assert!(after_second.updated_at > after_first.updated_at);
}

#[tokio::test]
async fn starting_the_same_correlation_id_twice_fails() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    test.engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();

    let result = test
        .engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await;
    assert!(matches!(
        result,
        Err(WorkflowError::DuplicateInstance { .. })
    ));
}

#[tokio::test]
async fn unknown_workflow_fails_start() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let result = test.engine.start("no_such_workflow", "v1", Map::new()).await;
    assert!(matches!(result, Err(WorkflowError::WorkflowNotFound { .. })));
}

#[tokio::test]
async fn unmatched_trigger_is_an_invalid_transition() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    test.engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();

    // No edge from `new` for `retire`.
    let result = test.engine.process_event("v1", "retire", Map::new()).await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidTransition { ref state, .. }) if state == "new"
    ));

    // State and history are untouched.
    use fleetwatch_workflow::store::InstanceStore;
    let instance = test.store.find_by_correlation_id("v1").await.unwrap();
    assert_eq!(instance.current_state, "new");
    assert!(instance.history.is_empty());
}

#[tokio::test]
async fn event_for_unknown_correlation_id_is_not_found() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let result = test
        .engine
        .process_event("missing", "activate", Map::new())
        .await;
    assert!(matches!(result, Err(WorkflowError::InstanceNotFound { .. })));
}

#[tokio::test]
async fn trigger_context_merges_into_instance_context() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    test.engine
        .start(
            "vehicle_lifecycle",
            "v1",
            ctx(&[("driver", json!("kim")), ("depot", json!("north"))]),
        )
        .await
        .unwrap();

    let instance = test
        .engine
        .process_event(
            "v1",
            "activate",
            ctx(&[("depot", json!("south")), ("speed", json!(88))]),
        )
        .await
        .unwrap();

    // Key-wise overwrite into the accumulated context.
    assert_eq!(instance.context["driver"], "kim");
    assert_eq!(instance.context["depot"], "south");
    assert_eq!(instance.context["speed"], 88);

    // The history entry records only the trigger's delta.
    let recorded = &instance.history[0].context;
    assert_eq!(recorded.len(), 2);
    assert!(!recorded.contains_key("driver"));
}

#[tokio::test]
async fn actions_resolve_by_instance_id() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();
    test.engine
        .process_event("v1", "activate", Map::new())
        .await
        .unwrap();

    let updated = test
        .engine
        .process_action(&instance.id, "force_retire", Map::new())
        .await
        .unwrap();
    assert_eq!(updated.current_state, "retired");
    assert_eq!(
        updated.history[1].trigger.trigger_type,
        fleetwatch_workflow::instance::TriggerType::Action
    );
}

#[tokio::test]
async fn first_declared_transition_wins_ties() {
    let ambiguous = r#"
name: ambiguous
states:
  a:
    type: initial
  b:
    type: intermediate
  c:
    type: terminal
transitions:
  - from: a
    to: b
    event: go
  - from: a
    to: c
    event: go
"#;
    let test = engine_with(&[ambiguous], None);
    test.engine.start("ambiguous", "x1", Map::new()).await.unwrap();

    let instance = test.engine.process_event("x1", "go", Map::new()).await.unwrap();
    assert_eq!(instance.current_state, "b");
}

#[tokio::test]
async fn transition_handler_sees_every_transition() {
    let handler = Arc::new(RecordingHandler::default());
    let test = engine_with(&[VEHICLE_LIFECYCLE], Some(handler.clone()));

    let instance = test
        .engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();
    test.engine
        .process_event("v1", "activate", Map::new())
        .await
        .unwrap();
    test.engine
        .process_event("v1", "retire", Map::new())
        .await
        .unwrap();

    let seen = handler.seen.lock().clone();
    assert_eq!(
        seen,
        vec![
            (instance.id.clone(), "new".to_string(), "active".to_string()),
            (instance.id.clone(), "active".to_string(), "retired".to_string()),
        ]
    );
}

#[tokio::test]
async fn handler_failure_does_not_fail_the_transition() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], Some(Arc::new(FailingHandler)));
    test.engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();

    let instance = test
        .engine
        .process_event("v1", "activate", Map::new())
        .await
        .unwrap();
    assert_eq!(instance.current_state, "active");

    // The durable state advanced despite the failing handler.
    use fleetwatch_workflow::store::InstanceStore;
    let stored = test.store.find_by_correlation_id("v1").await.unwrap();
    assert_eq!(stored.current_state, "active");
}

#[tokio::test]
async fn list_instances_filters_by_workflow_state_and_correlation() {
    let test = engine_with(&[VEHICLE_LIFECYCLE], None);
    test.engine
        .start("vehicle_lifecycle", "v1", Map::new())
        .await
        .unwrap();
    test.engine
        .start("vehicle_lifecycle", "v2", Map::new())
        .await
        .unwrap();
    test.engine
        .process_event("v2", "activate", Map::new())
        .await
        .unwrap();

    use fleetwatch_workflow::instance::InstanceFilter;
    let all = test
        .engine
        .list_instances(&InstanceFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let active = test
        .engine
        .list_instances(&InstanceFilter {
            state: Some("active".to_string()),
            ..InstanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].correlation_id, "v2");

    let by_correlation = test
        .engine
        .list_instances(&InstanceFilter {
            correlation_id: Some("v1".to_string()),
            ..InstanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_correlation.len(), 1);
}

#[tokio::test]
async fn shipped_vehicle_lifecycle_definition_loads_and_runs() {
    let shipped = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../workflows/vehicle_lifecycle.yaml"
    ))
    .expect("shipped definition readable");
    let test = engine_with(&[&shipped], None);

    test.engine
        .start("vehicle_lifecycle", "fleet-1", Map::new())
        .await
        .unwrap();
    let instance = test
        .engine
        .process_event("fleet-1", "activate", Map::new())
        .await
        .unwrap();
    let instance = test
        .engine
        .process_event(
            &instance.correlation_id,
            "maintenance_required",
            Map::new(),
        )
        .await
        .unwrap();
    assert_eq!(instance.current_state, "maintenance");
    // The maintenance state carries a timeout deadline.
    assert!(instance.timeout_at.is_some());
}
