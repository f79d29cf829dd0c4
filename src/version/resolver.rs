//! Per-dependency latest-version resolution
//!
//! Registry sources ask the registry for every published version; version-control
//! sources list repository tags through the [`RepositoryTagCache`]. Both paths
//! reduce the raw list to a [`CandidateVersionSet`] and take its maximum as latest.
//!
//! The returned verdict is a candidate: it is never marked breaking here.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::dependency::{DependencyKind, DependencyRecord, SourceKind};
use crate::version::cache::RepositoryTagCache;
use crate::version::error::ResolveError;
use crate::version::registry::{Registry, TagSource};
use crate::version::semver::{
    CandidateVersionSet, detect_update_type, extract_version_from_constraint, is_update_allowed,
    parse_version,
};
use crate::version::source::{ModuleAddress, ProviderAddress, RepositoryKey, extract_ref};
use crate::version::types::{DEFAULT_BRANCH, LATEST_SENTINEL, UpdatePolicy, UpdateVerdict};

/// Why a dependency was not resolved; none of these are failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Named in the ignore list
    Ignored,
    /// Local filesystem module
    LocalSource,
    /// Source kind with no version upstream
    UnsupportedSource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ignored => write!(f, "ignored by configuration"),
            SkipReason::LocalSource => write!(f, "local source"),
            SkipReason::UnsupportedSource => write!(f, "unsupported source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Candidate(UpdateVerdict),
    Skipped(SkipReason),
}

pub struct VersionResolver {
    registry: Arc<dyn Registry>,
    tags: Arc<dyn TagSource>,
    cache: Arc<RepositoryTagCache>,
    policy: UpdatePolicy,
}

impl VersionResolver {
    pub fn new(
        registry: Arc<dyn Registry>,
        tags: Arc<dyn TagSource>,
        cache: Arc<RepositoryTagCache>,
        policy: UpdatePolicy,
    ) -> Self {
        Self {
            registry,
            tags,
            cache,
            policy,
        }
    }

    pub async fn resolve(
        &self,
        dependency: &DependencyRecord,
    ) -> Result<ResolveOutcome, ResolveError> {
        if self.policy.is_ignored(dependency) {
            debug!("Skipping ignored dependency {}", dependency.name);
            return Ok(ResolveOutcome::Skipped(SkipReason::Ignored));
        }

        let verdict = match (dependency.source_kind, dependency.kind) {
            (SourceKind::LocalPath, _) => {
                debug!("Skipping local dependency {}", dependency.name);
                return Ok(ResolveOutcome::Skipped(SkipReason::LocalSource));
            }
            (SourceKind::Registry, DependencyKind::Module) => {
                self.resolve_registry_module(dependency).await?
            }
            (SourceKind::Registry, DependencyKind::Provider) => {
                self.resolve_registry_provider(dependency).await?
            }
            (SourceKind::VersionControl, DependencyKind::Module) => {
                self.resolve_version_control(dependency).await?
            }
            _ => {
                debug!(
                    "Skipping {} with unsupported source {}",
                    dependency.name, dependency.source
                );
                return Ok(ResolveOutcome::Skipped(SkipReason::UnsupportedSource));
            }
        };

        Ok(ResolveOutcome::Candidate(verdict))
    }

    async fn resolve_registry_module(
        &self,
        dependency: &DependencyRecord,
    ) -> Result<UpdateVerdict, ResolveError> {
        let address = ModuleAddress::parse(&dependency.source)?;
        let versions = self.registry.fetch_module_versions(&address).await?;
        let candidates = CandidateVersionSet::from_raw(&versions.versions, self.policy.skip_prerelease);

        self.evaluate_constraint(dependency, &address.to_string(), &candidates, |latest| {
            address.changelog_url(latest)
        })
    }

    async fn resolve_registry_provider(
        &self,
        dependency: &DependencyRecord,
    ) -> Result<UpdateVerdict, ResolveError> {
        let address = ProviderAddress::parse(&dependency.source)?;
        let versions = self.registry.fetch_provider_versions(&address).await?;
        let candidates = CandidateVersionSet::from_raw(&versions.versions, self.policy.skip_prerelease);

        self.evaluate_constraint(dependency, &address.to_string(), &candidates, |latest| {
            address.changelog_url(latest)
        })
    }

    /// Registry path: the declared constraint is the current version
    fn evaluate_constraint(
        &self,
        dependency: &DependencyRecord,
        upstream: &str,
        candidates: &CandidateVersionSet,
        changelog_url: impl Fn(&str) -> String,
    ) -> Result<UpdateVerdict, ResolveError> {
        let latest = candidates
            .latest()
            .ok_or_else(|| ResolveError::EmptyVersionSet(upstream.to_string()))?;
        let latest_str = latest.to_string();

        let constraint = extract_version_from_constraint(&dependency.version);
        let mut verdict = if constraint.is_empty() {
            debug!("{} has no version constraint, already tracking latest", dependency.name);
            UpdateVerdict::new(dependency.clone(), "", LATEST_SENTINEL)
        } else {
            let current = parse_version(&constraint).ok_or_else(|| ResolveError::InvalidVersion {
                version: constraint.clone(),
            })?;
            let mut verdict = UpdateVerdict::new(dependency.clone(), constraint, &latest_str);
            verdict.outdated = is_update_allowed(&current, latest, &self.policy);
            verdict.update_type = detect_update_type(&current, latest);
            verdict
        };

        verdict.changelog_url = changelog_url(&latest_str);
        Ok(verdict)
    }

    async fn resolve_version_control(
        &self,
        dependency: &DependencyRecord,
    ) -> Result<UpdateVerdict, ResolveError> {
        let repository = RepositoryKey::parse(&dependency.source)?;
        let tags = self.repository_tags(&repository).await?;

        let candidates = CandidateVersionSet::from_raw(&tags, self.policy.skip_prerelease);
        let latest = candidates
            .latest()
            .ok_or_else(|| ResolveError::EmptyVersionSet(repository.to_string()))?;
        let latest_str = latest.to_string();

        let mut verdict = match extract_ref(&dependency.source) {
            None => {
                debug!("{} has no ref, already tracking the default branch", dependency.name);
                UpdateVerdict::new(dependency.clone(), DEFAULT_BRANCH, LATEST_SENTINEL)
            }
            Some(git_ref) => {
                let mut verdict = UpdateVerdict::new(dependency.clone(), git_ref, &latest_str);
                match parse_version(git_ref) {
                    Some(current) => {
                        verdict.outdated = is_update_allowed(&current, latest, &self.policy);
                        verdict.update_type = detect_update_type(&current, latest);
                    }
                    None => debug!("{} pins non-version ref {}", dependency.name, git_ref),
                }
                verdict
            }
        };

        verdict.changelog_url = repository.changelog_url(&latest_str);
        Ok(verdict)
    }

    /// Cached tag list, fetching and caching on a miss
    async fn repository_tags(&self, repository: &RepositoryKey) -> Result<Vec<String>, ResolveError> {
        let key = repository.to_string();
        if let Some(tags) = self.cache.get(&key) {
            debug!("Using cached tags for {}", key);
            return Ok(tags);
        }

        let fetched = self.tags.fetch_tags(repository).await?;
        if fetched.is_empty() {
            return Err(ResolveError::EmptyVersionSet(key));
        }

        self.cache.set(&key, fetched.versions.clone());
        Ok(fetched.versions)
    }
}
