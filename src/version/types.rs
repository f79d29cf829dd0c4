//! Update policy and verdict types shared across the resolution pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::breaking::advisory::AdvisorySignal;
use crate::breaking::resources::ResourceChangeSummary;
use crate::breaking::schema::SchemaChangeSet;
use crate::dependency::{DependencyKind, DependencyRecord};

/// Recorded as the latest version when a dependency declares no constraint
pub const LATEST_SENTINEL: &str = "latest";

/// Recorded as the current version of a version-control source without `ref=`
pub const DEFAULT_BRANCH: &str = "default branch";

/// Raw version list fetched from an upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    pub versions: Vec<String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Kind of version bump between current and latest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Major,
    Minor,
    Patch,
    Unknown,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Major => "major",
            UpdateType::Minor => "minor",
            UpdateType::Patch => "patch",
            UpdateType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which updates the resolver reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub skip_prerelease: bool,
    /// Only same major.minor
    pub patch_only: bool,
    /// Only same major
    pub minor_only: bool,
    pub ignore_modules: Vec<String>,
    pub ignore_providers: Vec<String>,
}

impl UpdatePolicy {
    /// Exact-name match against the ignore list for the dependency's kind
    pub fn is_ignored(&self, dependency: &DependencyRecord) -> bool {
        let ignore = match dependency.kind {
            DependencyKind::Module => &self.ignore_modules,
            DependencyKind::Provider => &self.ignore_providers,
        };
        ignore.iter().any(|name| name == &dependency.name)
    }
}

/// Outcome of resolving one dependency.
///
/// `breaking` and `breaking_reason` are only ever raised through
/// [`UpdateVerdict::mark_breaking`], so no signal can clear another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateVerdict {
    pub dependency: DependencyRecord,
    pub current_version: String,
    pub latest_version: String,
    pub outdated: bool,
    pub update_type: UpdateType,
    breaking: bool,
    breaking_reason: String,
    pub changelog_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_changes: Option<SchemaChangeSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_changes: Option<ResourceChangeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<AdvisorySignal>,
}

impl UpdateVerdict {
    /// A candidate verdict: not outdated, type unknown, not breaking
    pub fn new(
        dependency: DependencyRecord,
        current_version: impl Into<String>,
        latest_version: impl Into<String>,
    ) -> Self {
        Self {
            dependency,
            current_version: current_version.into(),
            latest_version: latest_version.into(),
            outdated: false,
            update_type: UpdateType::Unknown,
            breaking: false,
            breaking_reason: String::new(),
            changelog_url: String::new(),
            schema_changes: None,
            resource_changes: None,
            advisory: None,
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.breaking
    }

    pub fn breaking_reason(&self) -> &str {
        &self.breaking_reason
    }

    /// Raise the breaking flag and append `sentence` to the reason text
    pub(crate) fn mark_breaking(&mut self, sentence: &str) {
        self.breaking = true;
        if !self.breaking_reason.is_empty() {
            self.breaking_reason.push(' ');
        }
        self.breaking_reason.push_str(sentence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_ignored_requires_exact_name_for_matching_kind() {
        let policy = UpdatePolicy {
            ignore_modules: vec!["vpc".to_string()],
            ignore_providers: vec!["aws".to_string()],
            ..UpdatePolicy::default()
        };

        assert!(policy.is_ignored(&DependencyRecord::module("vpc", "a/b/c", "1.0.0")));
        assert!(!policy.is_ignored(&DependencyRecord::module("vpc-peering", "a/b/c", "1.0.0")));
        assert!(!policy.is_ignored(&DependencyRecord::module("vp", "a/b/c", "1.0.0")));
        assert!(!policy.is_ignored(&DependencyRecord::module("aws", "a/b/c", "1.0.0")));
        assert!(policy.is_ignored(&DependencyRecord::provider("aws", "hashicorp/aws", "5.0.0")));
        assert!(!policy.is_ignored(&DependencyRecord::provider("vpc", "hashicorp/vpc", "5.0.0")));
    }

    #[test]
    fn mark_breaking_appends_sentences() {
        let mut verdict =
            UpdateVerdict::new(DependencyRecord::module("vpc", "a/b/c", "1.0.0"), "1.0.0", "2.0.0");
        assert!(!verdict.is_breaking());

        verdict.mark_breaking("First.");
        verdict.mark_breaking("Second.");

        assert!(verdict.is_breaking());
        assert_eq!(verdict.breaking_reason(), "First. Second.");
    }

    #[test]
    fn update_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(UpdateType::Major).unwrap(), "major");
        assert_eq!(UpdateType::Unknown.to_string(), "unknown");
    }
}
