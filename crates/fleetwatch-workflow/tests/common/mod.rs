// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for workflow integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fleetwatch_workflow::engine::TransitionHandler;
use fleetwatch_workflow::instance::{StateTransition, WorkflowInstance};
use fleetwatch_workflow::loader::YamlLoader;
use fleetwatch_workflow::store::{InstanceStore, MemoryDedupStore, MemoryInstanceStore};
use fleetwatch_workflow::{DefinitionRegistry, Result, WorkflowEngine};

/// The lifecycle workflow used by most scenarios.
pub const VEHICLE_LIFECYCLE: &str = r#"
name: vehicle_lifecycle
version: "1.0"
states:
  new:
    type: initial
  active:
    type: intermediate
  retired:
    type: terminal
transitions:
  - from: new
    to: active
    event: activate
  - from: active
    to: retired
    event: retire
  - from: active
    to: retired
    action: force_retire
"#;

/// Engine wired to in-memory stores over definitions written to a temp dir.
pub struct TestEngine {
    pub engine: Arc<WorkflowEngine>,
    pub store: Arc<MemoryInstanceStore>,
    pub dedup: Arc<MemoryDedupStore>,
    pub registry: Arc<DefinitionRegistry>,
    _workflow_dir: tempfile::TempDir,
}

/// Build an engine over the given YAML definitions.
pub fn engine_with(
    definitions: &[&str],
    handler: Option<Arc<dyn TransitionHandler>>,
) -> TestEngine {
    let workflow_dir = tempfile::tempdir().expect("tempdir");
    for (i, definition) in definitions.iter().enumerate() {
        std::fs::write(workflow_dir.path().join(format!("wf{i}.yaml")), definition)
            .expect("write definition");
    }

    let registry = Arc::new(DefinitionRegistry::new(YamlLoader::new(workflow_dir.path())));
    registry.initialize().expect("registry init");

    let store = Arc::new(MemoryInstanceStore::new());
    let dedup = Arc::new(MemoryDedupStore::new());
    let engine = Arc::new(WorkflowEngine::new(registry.clone(), store.clone(), handler));

    TestEngine {
        engine,
        store,
        dedup,
        registry,
        _workflow_dir: workflow_dir,
    }
}

/// Transition handler that records every invocation.
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl TransitionHandler for RecordingHandler {
    async fn on_transition(
        &self,
        instance: &WorkflowInstance,
        transition: &StateTransition,
    ) -> Result<()> {
        self.seen.lock().push((
            instance.id.clone(),
            transition.from_state.clone(),
            transition.to_state.clone(),
        ));
        Ok(())
    }
}

/// Transition handler that always fails.
pub struct FailingHandler;

#[async_trait]
impl TransitionHandler for FailingHandler {
    async fn on_transition(
        &self,
        _instance: &WorkflowInstance,
        _transition: &StateTransition,
    ) -> Result<()> {
        Err(fleetwatch_workflow::WorkflowError::Broker(
            fleetwatch_messaging::BrokerError::Unavailable("handler down".to_string()),
        ))
    }
}

/// Poll until the instance reaches `state` or the deadline passes.
pub async fn wait_for_state(store: &MemoryInstanceStore, instance_id: &str, state: &str) {
    for _ in 0..250 {
        if let Ok(instance) = store.find_by_id(instance_id).await {
            if instance.current_state == state {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("instance {instance_id} never reached state {state}");
}

/// Poll until `check` returns true or the deadline passes.
pub async fn wait_until<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..250 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
