//! Dependency records handed over by the configuration scanner

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a dependency is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Terraform Registry (hashicorp/consul/aws)
    Registry,
    /// Tag-based version control (git::https://github.com/owner/repo.git?ref=v1.0.0)
    VersionControl,
    /// Local filesystem path (./modules/vpc)
    LocalPath,
    /// Anything else
    Unknown,
}

impl SourceKind {
    /// Returns the string representation of the source kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Registry => "registry",
            SourceKind::VersionControl => "version_control",
            SourceKind::LocalPath => "local_path",
            SourceKind::Unknown => "unknown",
        }
    }

    /// Classify a raw `source` attribute
    pub fn detect(source: &str) -> Self {
        if source.starts_with("git::")
            || source.starts_with("git@")
            || (source.contains("github.com") && !source.contains("registry.terraform.io"))
        {
            return SourceKind::VersionControl;
        }

        if source.starts_with("./") || source.starts_with("../") || source.starts_with('/') {
            return SourceKind::LocalPath;
        }

        if source.contains('/') && !source.contains("://") {
            return SourceKind::Registry;
        }

        SourceKind::Unknown
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(SourceKind::Registry),
            "version_control" => Ok(SourceKind::VersionControl),
            "local_path" => Ok(SourceKind::LocalPath),
            "unknown" => Ok(SourceKind::Unknown),
            _ => Err(()),
        }
    }
}

/// Whether the record declares a reusable module or a provider plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    #[default]
    Module,
    Provider,
}

/// A declared dependency found in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Block label (module "vpc") or provider local name (aws)
    pub name: String,
    /// Raw source string
    pub source: String,
    pub source_kind: SourceKind,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Declared version constraint, empty when none was given
    #[serde(default)]
    pub version: String,
    pub file_path: PathBuf,
    /// Line number (1-based)
    pub line: u32,
}

impl DependencyRecord {
    /// Build a module record, detecting the source kind from `source`
    pub fn module(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            name: name.into(),
            source_kind: SourceKind::detect(&source),
            source,
            kind: DependencyKind::Module,
            version: version.into(),
            file_path: PathBuf::from("main.tf"),
            line: 1,
        }
    }

    /// Build a provider record; providers always come from the registry
    pub fn provider(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            source_kind: SourceKind::Registry,
            kind: DependencyKind::Provider,
            version: version.into(),
            file_path: PathBuf::from("versions.tf"),
            line: 1,
        }
    }

    /// Override where the record was found
    pub fn at(mut self, file_path: impl Into<PathBuf>, line: u32) -> Self {
        self.file_path = file_path.into();
        self.line = line;
        self
    }

    /// `path:line` for log messages
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path.display(), self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("terraform-aws-modules/vpc/aws", SourceKind::Registry)]
    #[case("hashicorp/consul/aws", SourceKind::Registry)]
    #[case(
        "git::https://github.com/terraform-aws-modules/terraform-aws-vpc.git?ref=v5.0.0",
        SourceKind::VersionControl
    )]
    #[case("git@github.com:owner/repo.git", SourceKind::VersionControl)]
    #[case("github.com/owner/repo", SourceKind::VersionControl)]
    #[case("./modules/vpc", SourceKind::LocalPath)]
    #[case("../shared/vpc", SourceKind::LocalPath)]
    #[case("/opt/modules/vpc", SourceKind::LocalPath)]
    #[case("https://example.com/module.zip", SourceKind::Unknown)]
    #[case("vpc", SourceKind::Unknown)]
    fn detect_classifies_source(#[case] source: &str, #[case] expected: SourceKind) {
        assert_eq!(SourceKind::detect(source), expected);
    }

    #[test]
    fn source_kind_round_trips_through_str() {
        for kind in [
            SourceKind::Registry,
            SourceKind::VersionControl,
            SourceKind::LocalPath,
            SourceKind::Unknown,
        ] {
            assert_eq!(kind.as_str().parse::<SourceKind>(), Ok(kind));
        }
        assert!("svn".parse::<SourceKind>().is_err());
    }

    #[test]
    fn dependency_record_deserializes_with_defaults() {
        let record: DependencyRecord = serde_json::from_value(serde_json::json!({
            "name": "vpc",
            "source": "terraform-aws-modules/vpc/aws",
            "source_kind": "registry",
            "file_path": "network/main.tf",
            "line": 12
        }))
        .unwrap();

        assert_eq!(record.kind, DependencyKind::Module);
        assert_eq!(record.version, "");
        assert_eq!(record.location(), "network/main.tf:12");
    }
}
