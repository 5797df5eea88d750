// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transition event publishing.

use std::sync::Arc;

use async_trait::async_trait;
use fleetwatch_messaging::{topics, EventPublisher, TransitionEvent};
use tracing::info;

use crate::engine::TransitionHandler;
use crate::error::Result;
use crate::instance::{StateTransition, WorkflowInstance};

/// Publishes every committed transition to `workflow.transitions`, keyed by
/// correlation id so all transitions of one instance share a partition.
pub struct TransitionPublisher {
    publisher: Arc<dyn EventPublisher>,
}

impl TransitionPublisher {
    /// Create a publisher over a broker handle.
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl TransitionHandler for TransitionPublisher {
    async fn on_transition(
        &self,
        instance: &WorkflowInstance,
        transition: &StateTransition,
    ) -> Result<()> {
        let event = TransitionEvent {
            instance_id: instance.id.clone(),
            workflow_name: instance.workflow_name.clone(),
            correlation_id: instance.correlation_id.clone(),
            from_state: transition.from_state.clone(),
            to_state: transition.to_state.clone(),
            trigger_type: transition.trigger.trigger_type.as_str().to_string(),
            trigger_name: transition.trigger.name.clone(),
            context: transition.context.clone(),
        };

        let payload = serde_json::to_vec(&event)?;
        self.publisher
            .publish(topics::WORKFLOW_TRANSITIONS, &event.correlation_id, &payload)
            .await?;

        info!(
            instance_id = %event.instance_id,
            workflow = %event.workflow_name,
            from = %event.from_state,
            to = %event.to_state,
            "Published transition event"
        );

        Ok(())
    }
}
