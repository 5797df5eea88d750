// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the workflow service.

use fleetwatch_messaging::BrokerError;
use thiserror::Error;

/// Workflow service errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    /// No definition registered under this name.
    #[error("workflow '{name}' not found")]
    WorkflowNotFound {
        /// The missing workflow name.
        name: String,
    },

    /// No instance for this id or correlation id.
    #[error("workflow instance '{key}' not found")]
    InstanceNotFound {
        /// Instance id or correlation id used for the lookup.
        key: String,
    },

    /// An instance with this correlation id already exists.
    #[error("workflow instance for correlation id '{correlation_id}' already started")]
    DuplicateInstance {
        /// The conflicting correlation id.
        correlation_id: String,
    },

    /// No declared transition matches the current state and trigger.
    #[error("no transition from state '{state}' for {trigger_type} '{trigger_name}'")]
    InvalidTransition {
        /// The instance's current state.
        state: String,
        /// Trigger type: event, action, or timeout.
        trigger_type: &'static str,
        /// Trigger name.
        trigger_name: String,
    },

    /// The optimistic-lock predicate failed; re-read and retry.
    #[error("concurrent modification of instance '{instance_id}'")]
    ConcurrentModification {
        /// The instance whose update lost the race.
        instance_id: String,
    },

    /// This event id was already processed.
    #[error("event '{event_id}' already processed")]
    DuplicateEvent {
        /// The duplicate event id.
        event_id: String,
    },

    /// The definition has no initial state.
    #[error("workflow '{workflow}' has no initial state")]
    MissingInitialState {
        /// The offending workflow name.
        workflow: String,
    },

    /// The definition declares more than one initial state.
    #[error("workflow '{workflow}' declares more than one initial state")]
    MultipleInitialStates {
        /// The offending workflow name.
        workflow: String,
    },

    /// The definition has no terminal state.
    #[error("workflow '{workflow}' has no terminal state")]
    MissingTerminalState {
        /// The offending workflow name.
        workflow: String,
    },

    /// A transition references a state that is not defined.
    #[error("workflow '{workflow}' references unknown state '{state}'")]
    UnknownState {
        /// The offending workflow name.
        workflow: String,
        /// The undefined state name.
        state: String,
    },

    /// A transition declares neither an event nor an action.
    #[error("workflow '{workflow}' transition '{from}' -> '{to}' has no event or action")]
    MissingTrigger {
        /// The offending workflow name.
        workflow: String,
        /// Transition source state.
        from: String,
        /// Transition target state.
        to: String,
    },

    /// The definition has no name.
    #[error("workflow definition has no name")]
    EmptyWorkflowName,

    /// An ingress message could not be parsed.
    #[error("malformed event: {reason}")]
    MalformedEvent {
        /// Why parsing failed.
        reason: String,
    },

    /// Definition file I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Definition file parsing failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Broker operation failed.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

impl WorkflowError {
    /// Whether reprocessing the triggering message may succeed.
    ///
    /// Concurrency conflicts resolve by re-reading the instance; store and
    /// broker failures are transient. Everything else is a permanent failure
    /// for the message that caused it.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::Store(_) | Self::Broker(_)
        )
    }
}

/// Result type using WorkflowError.
pub type Result<T> = std::result::Result<T, WorkflowError>;
