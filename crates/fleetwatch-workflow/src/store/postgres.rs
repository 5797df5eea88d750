// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed instance and dedup stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;

use super::{DedupStore, InstanceStore};
use crate::error::{Result, WorkflowError};
use crate::instance::{InstanceFilter, StateTransition, WorkflowInstance};

/// PostgreSQL-backed instance store.
#[derive(Clone)]
pub struct PostgresInstanceStore {
    pool: PgPool,
}

impl PostgresInstanceStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InstanceRow {
    id: String,
    workflow_name: String,
    correlation_id: String,
    current_state: String,
    context: Json<Map<String, Value>>,
    history: Json<Vec<StateTransition>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    timeout_at: Option<DateTime<Utc>>,
}

impl From<InstanceRow> for WorkflowInstance {
    fn from(row: InstanceRow) -> Self {
        Self {
            id: row.id,
            workflow_name: row.workflow_name,
            correlation_id: row.correlation_id,
            current_state: row.current_state,
            context: row.context.0,
            history: row.history.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            timeout_at: row.timeout_at,
        }
    }
}

const SELECT_INSTANCE: &str = r#"
    SELECT id, workflow_name, correlation_id, current_state, context, history,
           version, created_at, updated_at, timeout_at
    FROM workflow_instances
"#;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl InstanceStore for PostgresInstanceStore {
    async fn create(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let now = Utc::now();
        instance.version = 1;
        instance.created_at = now;
        instance.updated_at = now;

        let result = sqlx::query(
            r#"
            INSERT INTO workflow_instances (
                id, workflow_name, correlation_id, current_state,
                context, history, version, created_at, updated_at, timeout_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.workflow_name)
        .bind(&instance.correlation_id)
        .bind(&instance.current_state)
        .bind(Json(&instance.context))
        .bind(Json(&instance.history))
        .bind(instance.version)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .bind(instance.timeout_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(WorkflowError::DuplicateInstance {
                correlation_id: instance.correlation_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE workflow_instances
            SET current_state = $2,
                context = $3,
                history = $4,
                updated_at = $5,
                timeout_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.current_state)
        .bind(Json(&instance.context))
        .bind(Json(&instance.history))
        .bind(now)
        .bind(instance.timeout_at)
        .bind(instance.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::ConcurrentModification {
                instance_id: instance.id.clone(),
            });
        }

        instance.version += 1;
        instance.updated_at = now;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<WorkflowInstance> {
        let row = sqlx::query_as::<_, InstanceRow>(&format!("{SELECT_INSTANCE} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Into::into)
            .ok_or_else(|| WorkflowError::InstanceNotFound { key: id.to_string() })
    }

    async fn find_by_correlation_id(&self, correlation_id: &str) -> Result<WorkflowInstance> {
        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            "{SELECT_INSTANCE} WHERE correlation_id = $1"
        ))
        .bind(correlation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| WorkflowError::InstanceNotFound {
                key: correlation_id.to_string(),
            })
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>> {
        let rows = sqlx::query_as::<_, InstanceRow>(&format!(
            r#"
            {SELECT_INSTANCE}
            WHERE ($1::text IS NULL OR workflow_name = $1)
              AND ($2::text IS NULL OR current_state = $2)
              AND ($3::text IS NULL OR correlation_id = $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.workflow_name.as_deref())
        .bind(filter.state.as_deref())
        .bind(filter.correlation_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_pending_timeouts(&self, limit: i64) -> Result<Vec<WorkflowInstance>> {
        let rows = sqlx::query_as::<_, InstanceRow>(&format!(
            r#"
            {SELECT_INSTANCE}
            WHERE timeout_at IS NOT NULL AND timeout_at <= NOW()
            ORDER BY timeout_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL-backed dedup store.
#[derive(Clone)]
pub struct PostgresDedupStore {
    pool: PgPool,
}

impl PostgresDedupStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DedupStore for PostgresDedupStore {
    async fn is_processed(&self, event_id: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn mark_processed(&self, event_id: &str, instance_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, instance_id, processed_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(event_id)
        .bind(instance_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(WorkflowError::DuplicateEvent {
                event_id: event_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM processed_events WHERE processed_at < $1")
            .bind(older_than)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
