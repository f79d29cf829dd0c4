//! Module interface diffing between two published versions

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dependency::{DependencyKind, DependencyRecord, SourceKind};
use crate::version::registry::SchemaSource;
use crate::version::source::ModuleAddress;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    #[serde(rename = "type", default)]
    pub var_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub description: String,
}

/// Declared inputs and outputs of one module version, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub variables: IndexMap<String, VariableSpec>,
    pub outputs: IndexMap<String, OutputSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableChange {
    pub name: String,
    /// For type changes, rendered as `old → new`
    #[serde(rename = "type")]
    pub var_type: String,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputChange {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaChangeSet {
    pub added_required_variables: Vec<VariableChange>,
    pub removed_variables: Vec<VariableChange>,
    pub changed_variable_types: Vec<VariableChange>,
    pub removed_outputs: Vec<OutputChange>,
    /// Informational; never breaking
    pub added_outputs: Vec<OutputChange>,
}

impl SchemaChangeSet {
    /// True iff a breaking category is non-empty
    pub fn has_changes(&self) -> bool {
        !self.added_required_variables.is_empty()
            || !self.removed_variables.is_empty()
            || !self.changed_variable_types.is_empty()
            || !self.removed_outputs.is_empty()
    }
}

/// Diff two snapshots. A missing side yields an empty set.
pub fn compare_snapshots(
    current: Option<&SchemaSnapshot>,
    latest: Option<&SchemaSnapshot>,
) -> SchemaChangeSet {
    let mut changes = SchemaChangeSet::default();
    let (Some(current), Some(latest)) = (current, latest) else {
        return changes;
    };

    for (name, latest_var) in &latest.variables {
        match current.variables.get(name) {
            None if latest_var.required => {
                changes.added_required_variables.push(VariableChange {
                    name: name.clone(),
                    var_type: latest_var.var_type.clone(),
                    required: true,
                    description: latest_var.description.clone(),
                });
            }
            None => {}
            Some(current_var) if current_var.var_type != latest_var.var_type => {
                changes.changed_variable_types.push(VariableChange {
                    name: name.clone(),
                    var_type: format!("{} → {}", current_var.var_type, latest_var.var_type),
                    required: latest_var.required,
                    description: latest_var.description.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for (name, current_var) in &current.variables {
        if !latest.variables.contains_key(name) {
            changes.removed_variables.push(VariableChange {
                name: name.clone(),
                var_type: current_var.var_type.clone(),
                required: current_var.required,
                description: current_var.description.clone(),
            });
        }
    }

    for (name, output) in &current.outputs {
        if !latest.outputs.contains_key(name) {
            changes.removed_outputs.push(OutputChange {
                name: name.clone(),
                description: output.description.clone(),
            });
        }
    }

    for (name, output) in &latest.outputs {
        if !current.outputs.contains_key(name) {
            changes.added_outputs.push(OutputChange {
                name: name.clone(),
                description: output.description.clone(),
            });
        }
    }

    changes
}

/// Fetches both interfaces of a registry module and diffs them
pub struct SchemaComparator {
    source: Arc<dyn SchemaSource>,
}

impl SchemaComparator {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self { source }
    }

    /// `None` when the dependency is not a registry module or a fetch fails
    pub async fn compare(
        &self,
        dependency: &DependencyRecord,
        current_version: &str,
        latest_version: &str,
    ) -> Option<SchemaChangeSet> {
        if dependency.source_kind != SourceKind::Registry
            || dependency.kind != DependencyKind::Module
        {
            return None;
        }

        let address = ModuleAddress::parse(&dependency.source)
            .inspect_err(|e| debug!("Skipping schema comparison for {}: {}", dependency.name, e))
            .ok()?;

        let (current, latest) = futures::join!(
            self.source.fetch_schema(&address, current_version),
            self.source.fetch_schema(&address, latest_version),
        );

        let current = current
            .inspect_err(|e| debug!("Failed to fetch {} {} schema: {}", address, current_version, e))
            .ok()?;
        let latest = latest
            .inspect_err(|e| debug!("Failed to fetch {} {} schema: {}", address, latest_version, e))
            .ok()?;

        Some(compare_snapshots(Some(&current), Some(&latest)))
    }
}
