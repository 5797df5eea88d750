// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! YAML definition loading.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::definition::WorkflowDefinition;
use crate::error::Result;

/// Loads workflow definitions from `.yaml`/`.yml` files under a directory.
#[derive(Debug, Clone)]
pub struct YamlLoader {
    workflow_dir: PathBuf,
}

impl YamlLoader {
    /// Create a loader for the given directory.
    pub fn new(workflow_dir: impl Into<PathBuf>) -> Self {
        Self {
            workflow_dir: workflow_dir.into(),
        }
    }

    /// Walk the directory recursively and load every definition file.
    /// Each file must parse and validate or the whole load fails.
    pub fn load_all(&self) -> Result<Vec<WorkflowDefinition>> {
        let mut definitions = Vec::new();
        self.walk(&self.workflow_dir, &mut definitions)?;
        Ok(definitions)
    }

    fn walk(&self, dir: &Path, definitions: &mut Vec<WorkflowDefinition>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.walk(&path, definitions)?;
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => {
                    definitions.push(self.load_file(&path)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Load and validate a single definition file.
    pub fn load_file(&self, path: &Path) -> Result<WorkflowDefinition> {
        let data = std::fs::read_to_string(path)?;
        let mut definition: WorkflowDefinition = serde_yaml::from_str(&data)?;
        definition.normalize();
        definition.validate()?;
        debug!(
            workflow = %definition.name,
            path = %path.display(),
            states = definition.states.len(),
            "Loaded workflow definition"
        );
        Ok(definition)
    }
}
