// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow definitions.
//!
//! Definitions are authored as YAML files (see `workflows/` for an example)
//! and validated at load time: exactly one initial state, at least one
//! terminal state, every transition endpoint defined, and every transition
//! carrying an event or an action. State names are unique by construction
//! (they are the keys of the `states` map).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, WorkflowError};

/// A named state machine: states plus declared transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow name; the registry indexes by it.
    pub name: String,
    /// Free-form version string.
    #[serde(default)]
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// State name → descriptor.
    pub states: HashMap<String, StateDef>,
    /// Declared transitions; matching is by declaration order.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// The role of a state within its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    /// Entry point; exactly one per workflow.
    Initial,
    /// Regular state.
    Intermediate,
    /// Final state; reaching it ends the instance.
    Terminal,
}

/// A single state descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDef {
    /// State name; backfilled from the map key when omitted in YAML.
    #[serde(default)]
    pub name: String,
    /// The state's role.
    #[serde(rename = "type")]
    pub state_type: StateType,
    /// How long an instance may sit in this state before the timeout worker
    /// synthesizes a `timeout` trigger.
    #[serde(default, with = "humanized_duration::option")]
    pub timeout: Option<Duration>,
    /// Action names fired on entering the state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_entry: Vec<String>,
    /// Action names fired on leaving the state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_exit: Vec<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// One edge of the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Source state.
    pub from: String,
    /// Target state.
    pub to: String,
    /// Event name that triggers this transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Action name that triggers this transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Condition expression; reserved, not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl WorkflowDefinition {
    /// Fill in each state's `name` from its map key. Called by the loader
    /// right after parsing so YAML authors never repeat the name.
    pub fn normalize(&mut self) {
        for (name, state) in &mut self.states {
            if state.name.is_empty() {
                state.name = name.clone();
            }
        }
    }

    /// Check the load-time invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(WorkflowError::EmptyWorkflowName);
        }

        let initial_count = self
            .states
            .values()
            .filter(|s| s.state_type == StateType::Initial)
            .count();
        if initial_count == 0 {
            return Err(WorkflowError::MissingInitialState {
                workflow: self.name.clone(),
            });
        }
        if initial_count > 1 {
            return Err(WorkflowError::MultipleInitialStates {
                workflow: self.name.clone(),
            });
        }

        if !self
            .states
            .values()
            .any(|s| s.state_type == StateType::Terminal)
        {
            return Err(WorkflowError::MissingTerminalState {
                workflow: self.name.clone(),
            });
        }

        for transition in &self.transitions {
            for endpoint in [&transition.from, &transition.to] {
                if !self.states.contains_key(endpoint) {
                    return Err(WorkflowError::UnknownState {
                        workflow: self.name.clone(),
                        state: endpoint.clone(),
                    });
                }
            }
            if transition.event.is_none() && transition.action.is_none() {
                return Err(WorkflowError::MissingTrigger {
                    workflow: self.name.clone(),
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                });
            }
        }

        Ok(())
    }

    /// The unique initial state.
    pub fn initial_state(&self) -> Option<&StateDef> {
        self.states
            .values()
            .find(|s| s.state_type == StateType::Initial)
    }

    /// Look up a state by name.
    pub fn state(&self, name: &str) -> Option<&StateDef> {
        self.states.get(name)
    }
}

/// Serde support for durations written as `100ms`, `30s`, `5m`, or `2h`.
pub mod humanized_duration {
    use std::time::Duration;

    /// Parse a duration string: an unsigned integer followed by `ms`, `s`,
    /// `m`, or `h`. A bare number is seconds.
    pub fn parse(value: &str) -> Result<Duration, String> {
        let value = value.trim();
        let split = value
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(value.len());
        let (digits, unit) = value.split_at(split);
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{value}'"))?;
        match unit {
            "ms" => Ok(Duration::from_millis(amount)),
            "s" | "" => Ok(Duration::from_secs(amount)),
            "m" => Ok(Duration::from_secs(amount * 60)),
            "h" => Ok(Duration::from_secs(amount * 3600)),
            other => Err(format!("invalid duration unit '{other}' in '{value}'")),
        }
    }

    /// Format a duration in the smallest exact unit.
    pub fn format(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis % 1000 != 0 {
            return format!("{millis}ms");
        }
        let secs = duration.as_secs();
        if secs % 3600 == 0 && secs != 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 && secs != 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{secs}s")
        }
    }

    /// Serde adapter for `Option<Duration>` fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        /// Deserialize an optional humanized duration.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value: Option<String> = Option::deserialize(deserializer)?;
            match value {
                None => Ok(None),
                Some(s) => super::parse(&s).map(Some).map_err(serde::de::Error::custom),
            }
        }

        /// Serialize an optional humanized duration.
        pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                None => serializer.serialize_none(),
                Some(d) => serializer.serialize_some(&super::format(*d)),
            }
        }
    }
}
