// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The definition registry.
//!
//! Read-mostly: lookups take a shared lock for the map read, reloads build a
//! complete new index and swap it in under an exclusive lock. Readers observe
//! either the old or the new snapshot, never a partial one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::definition::WorkflowDefinition;
use crate::error::{Result, WorkflowError};
use crate::loader::YamlLoader;

/// In-memory index of validated workflow definitions, keyed by name.
pub struct DefinitionRegistry {
    workflows: RwLock<HashMap<String, Arc<WorkflowDefinition>>>,
    loader: YamlLoader,
}

impl DefinitionRegistry {
    /// Create an empty registry over a loader. Call [`initialize`](Self::initialize)
    /// before serving lookups.
    pub fn new(loader: YamlLoader) -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            loader,
        }
    }

    /// Load every definition from the workflow directory.
    pub fn initialize(&self) -> Result<()> {
        let index = self.build_index()?;
        info!(workflows = index.len(), "Workflow registry initialized");
        *self.workflows.write() = index;
        Ok(())
    }

    /// Atomically rebuild the index from disk. On load failure the current
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<()> {
        let index = self.build_index()?;
        info!(workflows = index.len(), "Workflow registry reloaded");
        *self.workflows.write() = index;
        Ok(())
    }

    fn build_index(&self) -> Result<HashMap<String, Arc<WorkflowDefinition>>> {
        let definitions = self.loader.load_all()?;
        let mut index = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            // Duplicate names across files: last-loaded wins.
            if index.contains_key(&definition.name) {
                warn!(workflow = %definition.name, "Duplicate workflow name, keeping last-loaded");
            }
            index.insert(definition.name.clone(), Arc::new(definition));
        }
        Ok(index)
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Result<Arc<WorkflowDefinition>> {
        self.workflows
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| WorkflowError::WorkflowNotFound {
                name: name.to_string(),
            })
    }

    /// Snapshot of all registered definitions. Order is unspecified.
    pub fn list(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.workflows.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_definition(dir: &std::path::Path, file: &str, name: &str) {
        let contents = format!(
            r#"
name: {name}
states:
  a:
    type: initial
  b:
    type: terminal
transitions:
  - from: a
    to: b
    event: go
"#
        );
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn get_and_list_after_initialize() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "one.yaml", "one");
        write_definition(dir.path(), "two.yaml", "two");

        let registry = DefinitionRegistry::new(YamlLoader::new(dir.path()));
        registry.initialize().unwrap();

        assert_eq!(registry.get("one").unwrap().name, "one");
        assert_eq!(registry.list().len(), 2);
        assert!(matches!(
            registry.get("three"),
            Err(WorkflowError::WorkflowNotFound { .. })
        ));
    }

    #[test]
    fn reload_picks_up_new_definitions() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "one.yaml", "one");

        let registry = DefinitionRegistry::new(YamlLoader::new(dir.path()));
        registry.initialize().unwrap();
        assert!(registry.get("two").is_err());

        write_definition(dir.path(), "two.yaml", "two");
        registry.reload().unwrap();
        assert!(registry.get("two").is_ok());
        assert!(registry.get("one").is_ok());
    }

    #[test]
    fn failed_reload_keeps_the_old_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path(), "one.yaml", "one");

        let registry = DefinitionRegistry::new(YamlLoader::new(dir.path()));
        registry.initialize().unwrap();

        std::fs::write(dir.path().join("bad.yaml"), "name: broken\nstates: {}\n").unwrap();
        assert!(registry.reload().is_err());
        assert!(registry.get("one").is_ok());
    }
}
