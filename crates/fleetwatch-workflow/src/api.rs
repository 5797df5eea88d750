// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API for the workflow engine.
//!
//! Thin JSON handlers over [`WorkflowEngine`]; authentication and request
//! shaping live in the gateway, not here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;
use crate::instance::InstanceFilter;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    /// The engine all handlers delegate to.
    pub engine: Arc<WorkflowEngine>,
}

/// Build the API router.
pub fn router(engine: Arc<WorkflowEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/:name", get(get_workflow))
        .route("/api/workflows/:name/start", post(start_workflow))
        .route("/api/instances", get(list_instances))
        .route("/api/instances/:id", get(get_instance))
        .route("/api/instances/:id/actions/:action", post(process_action))
        .route("/admin/reload", post(reload_workflows))
        .with_state(ApiState { engine })
}

/// `WorkflowError` wrapper carrying the HTTP status mapping.
struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WorkflowError::WorkflowNotFound { .. } | WorkflowError::InstanceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::MalformedEvent { .. }
            | WorkflowError::MissingInitialState { .. }
            | WorkflowError::MultipleInitialStates { .. }
            | WorkflowError::MissingTerminalState { .. }
            | WorkflowError::UnknownState { .. }
            | WorkflowError::MissingTrigger { .. }
            | WorkflowError::EmptyWorkflowName => StatusCode::BAD_REQUEST,
            WorkflowError::DuplicateInstance { .. }
            | WorkflowError::ConcurrentModification { .. }
            | WorkflowError::DuplicateEvent { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    correlation_id: String,
    #[serde(default)]
    context: Map<String, Value>,
}

async fn start_workflow(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(body): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let instance = state
        .engine
        .start(&name, &body.correlation_id, body.context)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

async fn list_workflows(State(state): State<ApiState>) -> impl IntoResponse {
    let workflows: Vec<_> = state
        .engine
        .list_workflows()
        .iter()
        .map(|w| w.as_ref().clone())
        .collect();
    Json(workflows)
}

async fn get_workflow(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow = state.engine.workflow(&name)?;
    Ok(Json(workflow.as_ref().clone()))
}

async fn reload_workflows(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.engine.reload_workflows()?;
    Ok(Json(json!({ "status": "reloaded" })))
}

#[derive(Debug, Deserialize)]
struct ListInstancesQuery {
    workflow_name: Option<String>,
    state: Option<String>,
    correlation_id: Option<String>,
}

async fn list_instances(
    State(state): State<ApiState>,
    Query(query): Query<ListInstancesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = InstanceFilter {
        workflow_name: query.workflow_name,
        state: query.state,
        correlation_id: query.correlation_id,
    };
    let instances = state.engine.list_instances(&filter).await?;
    Ok(Json(instances))
}

async fn get_instance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let instance = state.engine.get_instance(&id).await?;
    Ok(Json(instance))
}

#[derive(Debug, Deserialize, Default)]
struct ActionRequest {
    #[serde(default)]
    context: Map<String, Value>,
}

async fn process_action(
    State(state): State<ApiState>,
    Path((id, action)): Path<(String, String)>,
    body: Option<Json<ActionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let context = body.map(|Json(b)| b.context).unwrap_or_default();
    let instance = state.engine.process_action(&id, &action, context).await?;
    Ok(Json(instance))
}
