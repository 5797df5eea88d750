// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON wire envelopes.
//!
//! `IncomingEvent` is what the workflow service reads off the ingress topic;
//! `TransitionEvent` is what the engine emits on `workflow.transitions` after
//! every successful state change. Field names are snake_case on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An event consumed from the ingress topic.
///
/// `event_id` is optional on the wire; an empty id disables deduplication for
/// that message. `correlation_id` links the event to a workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Producer-assigned unique id, used for exactly-once processing.
    #[serde(default)]
    pub event_id: String,
    /// Event name matched against workflow transition triggers.
    pub event_type: String,
    /// External key locating the target workflow instance.
    pub correlation_id: String,
    /// Free-form payload merged into the instance context on transition.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Producer timestamp (RFC 3339).
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// An event published to `workflow.transitions` after a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Workflow instance that transitioned.
    pub instance_id: String,
    /// Name of the workflow definition.
    pub workflow_name: String,
    /// External key of the instance.
    pub correlation_id: String,
    /// State the instance left.
    pub from_state: String,
    /// State the instance entered.
    pub to_state: String,
    /// What caused the transition: "event", "action", or "timeout".
    pub trigger_type: String,
    /// Name of the triggering event or action.
    pub trigger_name: String,
    /// Context delta that accompanied the trigger.
    pub context: Map<String, Value>,
}
