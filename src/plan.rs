//! Reading `terraform show -json` plan output

use serde::Deserialize;

use crate::breaking::resources::{ResourceAction, ResourceChangeRecord};
use crate::dependency::{DependencyKind, DependencyRecord};

#[derive(Debug, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    resource_changes: Vec<PlanResourceChange>,
}

#[derive(Debug, Deserialize)]
struct PlanResourceChange {
    address: String,
    #[serde(rename = "type", default)]
    resource_type: String,
    change: PlanChange,
}

#[derive(Debug, Deserialize)]
struct PlanChange {
    #[serde(default)]
    actions: Vec<ResourceAction>,
    /// Each path is a list of attribute names and list indexes
    #[serde(default)]
    replace_paths: Vec<Vec<serde_json::Value>>,
}

fn render_path(path: &[serde_json::Value]) -> String {
    path.iter()
        .map(|step| match step {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Resource change records from a JSON plan
pub fn parse_plan_json(content: &str) -> Result<Vec<ResourceChangeRecord>, serde_json::Error> {
    let plan: PlanDocument = serde_json::from_str(content)?;

    Ok(plan
        .resource_changes
        .into_iter()
        .map(|rc| ResourceChangeRecord {
            address: rc.address,
            resource_type: rc.resource_type,
            actions: rc.change.actions,
            replace_triggers: rc
                .change
                .replace_paths
                .iter()
                .map(|path| render_path(path))
                .filter(|path| !path.is_empty())
                .collect(),
        })
        .collect())
}

/// Records that belong to `dependency`.
///
/// Modules own the resources under `module.<name>`; providers own the resources
/// whose type carries their `<name>_` prefix.
pub fn records_for<'a>(
    dependency: &DependencyRecord,
    records: &'a [ResourceChangeRecord],
) -> Vec<&'a ResourceChangeRecord> {
    match dependency.kind {
        DependencyKind::Module => {
            let prefix = format!("module.{}", dependency.name);
            records
                .iter()
                .filter(|r| {
                    r.address
                        .strip_prefix(&prefix)
                        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
                })
                .collect()
        }
        DependencyKind::Provider => {
            let prefix = format!("{}_", dependency.name);
            records
                .iter()
                .filter(|r| r.resource_type.starts_with(&prefix))
                .collect()
        }
    }
}
