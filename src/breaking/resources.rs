//! Classification of planned resource changes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceAction {
    Create,
    Update,
    Delete,
    Read,
    NoOp,
    #[serde(other)]
    Other,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Create => "create",
            ResourceAction::Update => "update",
            ResourceAction::Delete => "delete",
            ResourceAction::Read => "read",
            ResourceAction::NoOp => "no-op",
            ResourceAction::Other => "other",
        }
    }
}

/// One resource entry of a plan diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChangeRecord {
    pub address: String,
    pub resource_type: String,
    pub actions: Vec<ResourceAction>,
    /// Attributes that force replacement, when the plan names them
    #[serde(default)]
    pub replace_triggers: Vec<String>,
}

impl ResourceChangeRecord {
    fn has(&self, action: ResourceAction) -> bool {
        self.actions.contains(&action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedResource {
    pub address: String,
    pub resource_type: String,
    /// Comma-joined action list
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceChangeSummary {
    pub has_changes: bool,
    pub total_replace: usize,
    pub total_delete: usize,
    pub total_modify: usize,
    pub to_replace: Vec<ClassifiedResource>,
    pub to_delete: Vec<ClassifiedResource>,
    pub to_modify: Vec<ClassifiedResource>,
}

impl ResourceChangeSummary {
    /// Any replacement or deletion; modifications alone never count
    pub fn is_critical(&self) -> bool {
        self.total_replace > 0 || self.total_delete > 0
    }

    /// One line per non-empty category
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.total_replace > 0 {
            parts.push(format!("{} resource(s) will be REPLACED", self.total_replace));
        }
        if self.total_delete > 0 {
            parts.push(format!("{} resource(s) will be DELETED", self.total_delete));
        }
        if self.total_modify > 0 {
            parts.push(format!("{} resource(s) will be MODIFIED", self.total_modify));
        }

        if parts.is_empty() {
            "No resource changes detected".to_string()
        } else {
            parts.join("\n")
        }
    }
}

fn replacement_reason(triggers: &[String]) -> String {
    match triggers {
        [] => "Module update requires resource replacement".to_string(),
        [single] => format!("Attribute '{}' requires replacement", single),
        many => format!("Attributes {} require replacement", many.join(", ")),
    }
}

/// Bucket records into replace, delete and modify
pub fn analyze(records: &[ResourceChangeRecord]) -> ResourceChangeSummary {
    let mut summary = ResourceChangeSummary::default();

    for record in records {
        let classified = |reason: Option<String>| ClassifiedResource {
            address: record.address.clone(),
            resource_type: record.resource_type.clone(),
            action: record
                .actions
                .iter()
                .map(ResourceAction::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            reason,
        };

        let create = record.has(ResourceAction::Create);
        let delete = record.has(ResourceAction::Delete);

        if create && delete {
            summary.to_replace.push(classified(Some(replacement_reason(
                &record.replace_triggers,
            ))));
            summary.total_replace += 1;
        } else if delete {
            summary.to_delete.push(classified(None));
            summary.total_delete += 1;
        } else if record.has(ResourceAction::Update) {
            summary.to_modify.push(classified(None));
            summary.total_modify += 1;
        }
    }

    summary.has_changes = summary.total_replace + summary.total_delete + summary.total_modify > 0;
    summary
}
