use tracing::debug;

use crate::breaking::advisory::AdvisorySignal;
use crate::breaking::resources::ResourceChangeSummary;
use crate::breaking::schema::SchemaChangeSet;
use crate::version::semver::parse_version;
use crate::version::types::{UpdateType, UpdateVerdict};

const SCHEMA_REASON: &str = "This update has breaking API changes (added required variables, removed variables/outputs, or changed types).";
const RESOURCE_REASON: &str =
    "This update will cause resource replacements or deletions. Please review carefully.";

/// Signals gathered for one candidate verdict; absent signals are `None`
#[derive(Debug, Clone, Default)]
pub struct BreakingSignals {
    pub schema: Option<SchemaChangeSet>,
    pub resources: Option<ResourceChangeSummary>,
    pub advisory: Option<AdvisorySignal>,
}

/// Folds every signal into the verdict.
///
/// `breaking = major || schema.has_changes() || resources.is_critical()`. Each
/// raising signal appends its sentence to the reason. The advisory is attached
/// for display only.
pub fn aggregate(mut verdict: UpdateVerdict, signals: BreakingSignals) -> UpdateVerdict {
    if verdict.update_type == UpdateType::Major {
        // `~> 4.0` reads as 4.0.0 and `v4.1.0` as 4.1.0
        let current = parse_version(&verdict.current_version)
            .map(|v| v.to_string())
            .unwrap_or_else(|| verdict.current_version.clone());
        let sentence = format!(
            "Major version upgrade from {} to {} may contain breaking changes. Please review the changelog carefully.",
            current, verdict.latest_version
        );
        verdict.mark_breaking(&sentence);
    }

    if let Some(schema) = signals.schema {
        if schema.has_changes() {
            verdict.mark_breaking(SCHEMA_REASON);
        }
        verdict.schema_changes = Some(schema);
    }

    if let Some(resources) = signals.resources {
        if resources.is_critical() {
            verdict.mark_breaking(RESOURCE_REASON);
        }
        verdict.resource_changes = Some(resources);
    }

    verdict.advisory = signals.advisory;

    debug!(
        "Aggregated {}: breaking={}",
        verdict.dependency.name,
        verdict.is_breaking()
    );
    verdict
}
