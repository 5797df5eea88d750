// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory instance and dedup stores.
//!
//! Same contracts as the PostgreSQL backends, backed by mutex-guarded maps.
//! Used by tests and by embedded single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{DedupStore, InstanceStore};
use crate::error::{Result, WorkflowError};
use crate::instance::{InstanceFilter, WorkflowInstance};

/// In-memory instance store with the same optimistic-lock semantics as the
/// PostgreSQL backend.
#[derive(Clone, Default)]
pub struct MemoryInstanceStore {
    instances: Arc<Mutex<HashMap<String, WorkflowInstance>>>,
}

impl MemoryInstanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn create(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let mut instances = self.instances.lock();
        if instances
            .values()
            .any(|i| i.correlation_id == instance.correlation_id)
        {
            return Err(WorkflowError::DuplicateInstance {
                correlation_id: instance.correlation_id.clone(),
            });
        }

        let now = Utc::now();
        instance.version = 1;
        instance.created_at = now;
        instance.updated_at = now;
        instances.insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn update(&self, instance: &mut WorkflowInstance) -> Result<()> {
        let mut instances = self.instances.lock();
        match instances.get(&instance.id) {
            Some(stored) if stored.version == instance.version => {
                instance.version += 1;
                instance.updated_at = Utc::now();
                instances.insert(instance.id.clone(), instance.clone());
                Ok(())
            }
            Some(_) => Err(WorkflowError::ConcurrentModification {
                instance_id: instance.id.clone(),
            }),
            None => Err(WorkflowError::InstanceNotFound {
                key: instance.id.clone(),
            }),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<WorkflowInstance> {
        self.instances
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::InstanceNotFound { key: id.to_string() })
    }

    async fn find_by_correlation_id(&self, correlation_id: &str) -> Result<WorkflowInstance> {
        self.instances
            .lock()
            .values()
            .find(|i| i.correlation_id == correlation_id)
            .cloned()
            .ok_or_else(|| WorkflowError::InstanceNotFound {
                key: correlation_id.to_string(),
            })
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<WorkflowInstance>> {
        let mut instances: Vec<WorkflowInstance> = self
            .instances
            .lock()
            .values()
            .filter(|i| {
                filter
                    .workflow_name
                    .as_ref()
                    .is_none_or(|w| &i.workflow_name == w)
                    && filter.state.as_ref().is_none_or(|s| &i.current_state == s)
                    && filter
                        .correlation_id
                        .as_ref()
                        .is_none_or(|c| &i.correlation_id == c)
            })
            .cloned()
            .collect();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(instances)
    }

    async fn find_pending_timeouts(&self, limit: i64) -> Result<Vec<WorkflowInstance>> {
        let now = Utc::now();
        let mut due: Vec<WorkflowInstance> = self
            .instances
            .lock()
            .values()
            .filter(|i| i.timeout_at.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        due.sort_by_key(|i| i.timeout_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }
}

/// In-memory dedup store.
#[derive(Clone, Default)]
pub struct MemoryDedupStore {
    processed: Arc<Mutex<HashMap<String, (String, DateTime<Utc>)>>>,
}

impl MemoryDedupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn is_processed(&self, event_id: &str) -> Result<bool> {
        Ok(self.processed.lock().contains_key(event_id))
    }

    async fn mark_processed(&self, event_id: &str, instance_id: &str) -> Result<()> {
        let mut processed = self.processed.lock();
        if processed.contains_key(event_id) {
            return Err(WorkflowError::DuplicateEvent {
                event_id: event_id.to_string(),
            });
        }
        processed.insert(
            event_id.to_string(),
            (instance_id.to_string(), Utc::now()),
        );
        Ok(())
    }

    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut processed = self.processed.lock();
        let before = processed.len();
        processed.retain(|_, (_, at)| *at >= older_than);
        Ok((before - processed.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn test_instance(correlation_id: &str) -> WorkflowInstance {
        WorkflowInstance {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_name: "vehicle_lifecycle".to_string(),
            correlation_id: correlation_id.to_string(),
            current_state: "new".to_string(),
            context: Map::new(),
            history: Vec::new(),
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            timeout_at: None,
        }
    }

    #[tokio::test]
    async fn create_enforces_correlation_uniqueness() {
        let store = MemoryInstanceStore::new();
        let mut first = test_instance("v1");
        store.create(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        let mut second = test_instance("v1");
        assert!(matches!(
            store.create(&mut second).await,
            Err(WorkflowError::DuplicateInstance { .. })
        ));
    }

    #[tokio::test]
    async fn update_serializes_concurrent_writers() {
        let store = MemoryInstanceStore::new();
        let mut instance = test_instance("v1");
        store.create(&mut instance).await.unwrap();

        let mut writer_a = store.find_by_id(&instance.id).await.unwrap();
        let mut writer_b = store.find_by_id(&instance.id).await.unwrap();

        writer_a.current_state = "active".to_string();
        store.update(&mut writer_a).await.unwrap();
        assert_eq!(writer_a.version, 2);

        writer_b.current_state = "retired".to_string();
        assert!(matches!(
            store.update(&mut writer_b).await,
            Err(WorkflowError::ConcurrentModification { .. })
        ));

        let stored = store.find_by_id(&instance.id).await.unwrap();
        assert_eq!(stored.current_state, "active");
    }

    #[tokio::test]
    async fn pending_timeouts_returns_only_due_instances_in_deadline_order() {
        let store = MemoryInstanceStore::new();

        let mut due_late = test_instance("v1");
        store.create(&mut due_late).await.unwrap();
        due_late.timeout_at = Some(Utc::now() - chrono::Duration::seconds(5));
        store.update(&mut due_late).await.unwrap();

        let mut due_early = test_instance("v2");
        store.create(&mut due_early).await.unwrap();
        due_early.timeout_at = Some(Utc::now() - chrono::Duration::seconds(60));
        store.update(&mut due_early).await.unwrap();

        let mut not_due = test_instance("v3");
        store.create(&mut not_due).await.unwrap();
        not_due.timeout_at = Some(Utc::now() + chrono::Duration::seconds(60));
        store.update(&mut not_due).await.unwrap();

        let due = store.find_pending_timeouts(10).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].correlation_id, "v2");
        assert_eq!(due[1].correlation_id, "v1");
    }

    #[tokio::test]
    async fn dedup_store_detects_duplicates_and_purges() {
        let store = MemoryDedupStore::new();
        assert!(!store.is_processed("e1").await.unwrap());

        store.mark_processed("e1", "i1").await.unwrap();
        assert!(store.is_processed("e1").await.unwrap());
        assert!(matches!(
            store.mark_processed("e1", "i2").await,
            Err(WorkflowError::DuplicateEvent { .. })
        ));

        let purged = store
            .purge_expired(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(!store.is_processed("e1").await.unwrap());
    }
}
