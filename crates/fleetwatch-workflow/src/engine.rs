// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The workflow engine.
//!
//! Locates an instance (by correlation id for events, by id for actions and
//! timeouts), scans the definition's transitions in declaration order for the
//! first edge matching the current state and trigger, applies it, and commits
//! through the instance store's optimistic lock. A `ConcurrentModification`
//! from the store propagates to the caller, which leaves the triggering
//! message uncommitted (consumer) or retries next tick (timeout worker).
//!
//! The post-transition handler runs after the durable update; its failures
//! are logged but do not fail the transition — the state in the store has
//! already advanced and is not rolled back for a publish failure.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::definition::WorkflowDefinition;
use crate::error::{Result, WorkflowError};
use crate::instance::{InstanceFilter, StateTransition, Trigger, TriggerType, WorkflowInstance};
use crate::registry::DefinitionRegistry;
use crate::store::InstanceStore;

/// Hook invoked after every committed transition.
#[async_trait]
pub trait TransitionHandler: Send + Sync {
    /// Called with the updated instance and the transition just recorded.
    async fn on_transition(
        &self,
        instance: &WorkflowInstance,
        transition: &StateTransition,
    ) -> Result<()>;
}

/// Drives workflow instances through their definitions.
pub struct WorkflowEngine {
    registry: Arc<DefinitionRegistry>,
    store: Arc<dyn InstanceStore>,
    transition_handler: Option<Arc<dyn TransitionHandler>>,
}

impl WorkflowEngine {
    /// Create an engine over a registry and instance store.
    pub fn new(
        registry: Arc<DefinitionRegistry>,
        store: Arc<dyn InstanceStore>,
        transition_handler: Option<Arc<dyn TransitionHandler>>,
    ) -> Self {
        Self {
            registry,
            store,
            transition_handler,
        }
    }

    /// Start a new instance of `workflow_name` in its initial state.
    ///
    /// `correlation_id` must not already have a live instance; the store's
    /// uniqueness index rejects a second start with `DuplicateInstance`.
    pub async fn start(
        &self,
        workflow_name: &str,
        correlation_id: &str,
        context: Map<String, Value>,
    ) -> Result<WorkflowInstance> {
        let definition = self.registry.get(workflow_name)?;
        let initial = definition
            .initial_state()
            .ok_or_else(|| WorkflowError::MissingInitialState {
                workflow: workflow_name.to_string(),
            })?;

        let now = chrono::Utc::now();
        let mut instance = WorkflowInstance {
            id: Uuid::new_v4().to_string(),
            workflow_name: workflow_name.to_string(),
            correlation_id: correlation_id.to_string(),
            current_state: initial.name.clone(),
            context,
            history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            timeout_at: initial
                .timeout
                .map(|t| now + chrono::Duration::from_std(t).unwrap_or(chrono::Duration::zero())),
        };

        self.store.create(&mut instance).await?;

        info!(
            instance_id = %instance.id,
            workflow = %workflow_name,
            correlation_id = %correlation_id,
            initial_state = %instance.current_state,
            "Started workflow instance"
        );

        Ok(instance)
    }

    /// Apply an ingress event to the instance with this correlation id.
    pub async fn process_event(
        &self,
        correlation_id: &str,
        event_name: &str,
        context: Map<String, Value>,
    ) -> Result<WorkflowInstance> {
        let instance = self.store.find_by_correlation_id(correlation_id).await?;
        self.process_transition(
            instance,
            Trigger {
                trigger_type: TriggerType::Event,
                name: event_name.to_string(),
            },
            context,
        )
        .await
    }

    /// Apply an explicit action to the instance with this id.
    pub async fn process_action(
        &self,
        instance_id: &str,
        action_name: &str,
        context: Map<String, Value>,
    ) -> Result<WorkflowInstance> {
        let instance = self.store.find_by_id(instance_id).await?;
        self.process_transition(
            instance,
            Trigger {
                trigger_type: TriggerType::Action,
                name: action_name.to_string(),
            },
            context,
        )
        .await
    }

    /// Apply a state-expiry trigger to the instance with this id.
    ///
    /// Used by the timeout worker; resolves by instance id, never by
    /// correlation id.
    pub async fn process_timeout(&self, instance_id: &str) -> Result<WorkflowInstance> {
        let instance = self.store.find_by_id(instance_id).await?;
        self.process_transition(
            instance,
            Trigger {
                trigger_type: TriggerType::Timeout,
                name: "timeout".to_string(),
            },
            Map::new(),
        )
        .await
    }

    async fn process_transition(
        &self,
        mut instance: WorkflowInstance,
        trigger: Trigger,
        context: Map<String, Value>,
    ) -> Result<WorkflowInstance> {
        let definition = self.registry.get(&instance.workflow_name)?;

        // First declared edge out of the current state matching the trigger.
        let matched = definition.transitions.iter().find(|t| {
            if t.from != instance.current_state {
                return false;
            }
            match trigger.trigger_type {
                TriggerType::Event => t.event.as_deref() == Some(trigger.name.as_str()),
                TriggerType::Action => t.action.as_deref() == Some(trigger.name.as_str()),
                TriggerType::Timeout => t.event.as_deref() == Some("timeout"),
            }
        });

        let Some(edge) = matched else {
            return Err(WorkflowError::InvalidTransition {
                state: instance.current_state.clone(),
                trigger_type: trigger.trigger_type.as_str(),
                trigger_name: trigger.name.clone(),
            });
        };

        // Merge the trigger context into the instance context, key-wise.
        for (key, value) in &context {
            instance.context.insert(key.clone(), value.clone());
        }

        let transition = StateTransition {
            from_state: instance.current_state.clone(),
            to_state: edge.to.clone(),
            trigger: trigger.clone(),
            context,
            timestamp: chrono::Utc::now(),
        };
        instance.history.push(transition.clone());
        instance.current_state = edge.to.clone();
        instance.timeout_at = definition
            .state(&edge.to)
            .and_then(|s| s.timeout)
            .map(|t| {
                chrono::Utc::now() + chrono::Duration::from_std(t).unwrap_or(chrono::Duration::zero())
            });

        self.store.update(&mut instance).await?;

        if let Some(handler) = &self.transition_handler {
            // The durable state is already advanced; a handler failure is a
            // known trade-off, not a rollback.
            if let Err(e) = handler.on_transition(&instance, &transition).await {
                error!(
                    instance_id = %instance.id,
                    error = %e,
                    "Transition handler failed"
                );
            }
        }

        info!(
            instance_id = %instance.id,
            workflow = %instance.workflow_name,
            from = %transition.from_state,
            to = %transition.to_state,
            trigger_type = %trigger.trigger_type,
            trigger_name = %trigger.name,
            "Processed transition"
        );

        Ok(instance)
    }

    /// Look up an instance by id.
    pub async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance> {
        self.store.find_by_id(instance_id).await
    }

    /// List instances matching the filter, newest first.
    pub async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>> {
        self.store.list(filter).await
    }

    /// Look up a workflow definition by name.
    pub fn workflow(&self, name: &str) -> Result<Arc<WorkflowDefinition>> {
        self.registry.get(name)
    }

    /// Snapshot of all registered definitions.
    pub fn list_workflows(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.registry.list()
    }

    /// Atomically reload definitions from disk.
    pub fn reload_workflows(&self) -> Result<()> {
        self.registry.reload()
    }
}
