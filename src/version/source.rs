//! Decomposition of raw `source` strings into upstream coordinates

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::version::error::ResolveError;

const REGISTRY_HOST_PREFIX: &str = "registry.terraform.io/";
const CHANGELOG_BASE: &str = "https://registry.terraform.io";

static GITHUB_REPOSITORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:]([^/]+)/([^/?]+)").expect("valid repository pattern")
});

static REF_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]ref=([^&]+)").expect("valid ref pattern"));

/// Strip the public registry host and any `//subdir` suffix
fn registry_path(source: &str) -> &str {
    let source = source.trim();
    let source = source.strip_prefix(REGISTRY_HOST_PREFIX).unwrap_or(source);
    match source.find("//") {
        Some(idx) => &source[..idx],
        None => source,
    }
}

fn non_empty_parts(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    parts.iter().all(|p| !p.is_empty()).then_some(parts)
}

/// `namespace/name/provider` module address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleAddress {
    pub namespace: String,
    pub name: String,
    pub provider: String,
}

impl ModuleAddress {
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        match non_empty_parts(registry_path(source)).as_deref() {
            Some([namespace, name, provider]) => Ok(Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
                provider: provider.to_string(),
            }),
            _ => Err(ResolveError::source_parse(
                source,
                "expected namespace/name/provider",
            )),
        }
    }

    pub fn changelog_url(&self, version: &str) -> String {
        format!("{}/modules/{}/{}", CHANGELOG_BASE, self, version)
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.name, self.provider)
    }
}

/// `namespace/type` provider address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderAddress {
    pub namespace: String,
    pub provider_type: String,
}

impl ProviderAddress {
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        match non_empty_parts(registry_path(source)).as_deref() {
            Some([namespace, provider_type]) => Ok(Self {
                namespace: namespace.to_string(),
                provider_type: provider_type.to_string(),
            }),
            _ => Err(ResolveError::source_parse(source, "expected namespace/type")),
        }
    }

    pub fn changelog_url(&self, version: &str) -> String {
        format!("{}/providers/{}/{}", CHANGELOG_BASE, self, version)
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.provider_type)
    }
}

/// Owner/repository of a version-control source; doubles as the tag cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryKey {
    pub owner: String,
    pub repo: String,
}

impl RepositoryKey {
    /// Accepts `git::https://github.com/o/r.git`, `git@github.com:o/r.git`
    /// and `github.com/o/r` forms
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        let captures = GITHUB_REPOSITORY
            .captures(source)
            .ok_or_else(|| ResolveError::source_parse(source, "expected github.com/owner/repo"))?;

        let owner = captures[1].to_string();
        let repo = captures[2].trim_end_matches(".git").to_string();
        if repo.is_empty() {
            return Err(ResolveError::source_parse(source, "empty repository name"));
        }

        Ok(Self { owner, repo })
    }

    pub fn changelog_url(&self, version: &str) -> String {
        format!("https://github.com/{}/releases/tag/v{}", self, version)
    }
}

impl fmt::Display for RepositoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Value of the `ref=` query parameter, if any
pub fn extract_ref(source: &str) -> Option<&str> {
    REF_PARAM
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("terraform-aws-modules/vpc/aws", "terraform-aws-modules", "vpc", "aws")]
    #[case("registry.terraform.io/hashicorp/consul/aws", "hashicorp", "consul", "aws")]
    #[case("hashicorp/consul/aws//modules/consul-cluster", "hashicorp", "consul", "aws")]
    fn module_address_parses(
        #[case] source: &str,
        #[case] namespace: &str,
        #[case] name: &str,
        #[case] provider: &str,
    ) {
        let address = ModuleAddress::parse(source).unwrap();
        assert_eq!(address.namespace, namespace);
        assert_eq!(address.name, name);
        assert_eq!(address.provider, provider);
    }

    #[rstest]
    #[case("hashicorp")]
    #[case("hashicorp/consul")]
    #[case("a/b/c/d")]
    #[case("a//c")]
    #[case("")]
    fn module_address_rejects_malformed(#[case] source: &str) {
        assert!(matches!(
            ModuleAddress::parse(source),
            Err(ResolveError::SourceParse { .. })
        ));
    }

    #[test]
    fn provider_address_parses_and_rejects() {
        let address = ProviderAddress::parse("registry.terraform.io/hashicorp/aws").unwrap();
        assert_eq!(address.to_string(), "hashicorp/aws");
        assert!(ProviderAddress::parse("aws").is_err());
        assert!(ProviderAddress::parse("hashicorp/aws/extra").is_err());
    }

    #[rstest]
    #[case("git::https://github.com/terraform-aws-modules/terraform-aws-vpc.git?ref=v5.0.0", "terraform-aws-modules", "terraform-aws-vpc")]
    #[case("git@github.com:owner/repo.git", "owner", "repo")]
    #[case("github.com/owner/repo", "owner", "repo")]
    #[case("git::https://github.com/owner/repo.git//modules/sub?ref=v1.0.0", "owner", "repo")]
    fn repository_key_parses(#[case] source: &str, #[case] owner: &str, #[case] repo: &str) {
        let key = RepositoryKey::parse(source).unwrap();
        assert_eq!(key.owner, owner);
        assert_eq!(key.repo, repo);
    }

    #[rstest]
    #[case("git::https://gitlab.com/owner/repo.git")]
    #[case("github.com/owner")]
    fn repository_key_rejects_non_github(#[case] source: &str) {
        assert!(RepositoryKey::parse(source).is_err());
    }

    #[rstest]
    #[case("git::https://github.com/o/r.git?ref=v1.2.0", Some("v1.2.0"))]
    #[case("git::https://github.com/o/r.git?depth=1&ref=main", Some("main"))]
    #[case("git::https://github.com/o/r.git", None)]
    fn extract_ref_reads_query(#[case] source: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_ref(source), expected);
    }

    #[test]
    fn changelog_urls() {
        let module = ModuleAddress::parse("terraform-aws-modules/vpc/aws").unwrap();
        assert_eq!(
            module.changelog_url("5.1.0"),
            "https://registry.terraform.io/modules/terraform-aws-modules/vpc/aws/5.1.0"
        );
        let provider = ProviderAddress::parse("hashicorp/aws").unwrap();
        assert_eq!(
            provider.changelog_url("5.31.0"),
            "https://registry.terraform.io/providers/hashicorp/aws/5.31.0"
        );
        let repo = RepositoryKey::parse("github.com/owner/repo").unwrap();
        assert_eq!(
            repo.changelog_url("1.2.0"),
            "https://github.com/owner/repo/releases/tag/v1.2.0"
        );
    }
}
