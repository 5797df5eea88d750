// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Durable workflow instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A running (or finished) execution of a workflow definition.
///
/// `version` is the optimistic-lock counter: the store's conditional update
/// is predicated on it, so two concurrent transitions race and exactly one
/// commits. `correlation_id` is the external key ingress events use to find
/// the instance without knowing its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance id.
    pub id: String,
    /// Name of the definition this instance executes.
    pub workflow_name: String,
    /// External key linking the instance to a domain entity.
    pub correlation_id: String,
    /// Name of the state the instance is currently in; always a state of the
    /// referenced definition.
    pub current_state: String,
    /// Accumulated context, merged key-wise from every trigger.
    pub context: Map<String, Value>,
    /// Append-only transition history.
    pub history: Vec<StateTransition>,
    /// Optimistic-lock counter, starts at 1.
    pub version: i64,
    /// When the instance was started.
    pub created_at: DateTime<Utc>,
    /// When the instance last transitioned.
    pub updated_at: DateTime<Utc>,
    /// Deadline of the current state, if it has a timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_at: Option<DateTime<Utc>>,
}

/// One recorded transition of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// State the instance left.
    pub from_state: String,
    /// State the instance entered.
    pub to_state: String,
    /// What caused the transition.
    pub trigger: Trigger,
    /// Context delta that accompanied the trigger.
    pub context: Map<String, Value>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

/// What caused a transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Trigger kind.
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Name of the event or action; `"timeout"` for timeouts.
    pub name: String,
}

/// Trigger kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// An ingress event matched by correlation id.
    Event,
    /// An explicit action on a known instance id.
    Action,
    /// A synthesized state-expiry trigger.
    Timeout,
}

impl TriggerType {
    /// The wire string for this trigger type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Action => "action",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match filter for instance listings.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    /// Restrict to a workflow name.
    pub workflow_name: Option<String>,
    /// Restrict to a current state.
    pub state: Option<String>,
    /// Restrict to a correlation id.
    pub correlation_id: Option<String>,
}
