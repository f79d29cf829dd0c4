//! Fake upstreams for pipeline tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use tfbump::breaking::advisory::{BreakingChangeAdvisor, NoopAdvisor};
use tfbump::breaking::schema::{OutputSpec, SchemaComparator, SchemaSnapshot, VariableSpec};
use tfbump::check::Checker;
use tfbump::version::cache::RepositoryTagCache;
use tfbump::version::error::RegistryError;
use tfbump::version::registry::{Registry, SchemaSource, TagSource};
use tfbump::version::resolver::VersionResolver;
use tfbump::version::source::{ModuleAddress, ProviderAddress, RepositoryKey};
use tfbump::version::types::{PackageVersions, UpdatePolicy};

fn owned(versions: &[&str]) -> Vec<String> {
    versions.iter().map(|v| v.to_string()).collect()
}

/// Registry serving fixed version lists, keyed by `ns/name/provider` or `ns/type`
#[derive(Default)]
pub struct FakeRegistry {
    modules: HashMap<String, Vec<String>>,
    providers: HashMap<String, Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, address: &str, versions: &[&str]) -> Self {
        self.modules.insert(address.to_string(), owned(versions));
        self
    }

    pub fn with_provider(mut self, address: &str, versions: &[&str]) -> Self {
        self.providers.insert(address.to_string(), owned(versions));
        self
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn fetch_module_versions(
        &self,
        address: &ModuleAddress,
    ) -> Result<PackageVersions, RegistryError> {
        let key = address.to_string();
        match self.modules.get(&key) {
            Some(versions) => Ok(PackageVersions::new(versions.clone())),
            None => Err(RegistryError::NotFound(key)),
        }
    }

    async fn fetch_provider_versions(
        &self,
        address: &ProviderAddress,
    ) -> Result<PackageVersions, RegistryError> {
        let key = address.to_string();
        match self.providers.get(&key) {
            Some(versions) => Ok(PackageVersions::new(versions.clone())),
            None => Err(RegistryError::NotFound(key)),
        }
    }
}

/// Tag source that counts how often it is asked
#[derive(Default)]
pub struct FakeTagSource {
    tags: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl FakeTagSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: &[&str]) -> Self {
        self.tags.insert(repository.to_string(), owned(tags));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagSource for FakeTagSource {
    async fn fetch_tags(
        &self,
        repository: &RepositoryKey,
    ) -> Result<PackageVersions, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = repository.to_string();
        match self.tags.get(&key) {
            Some(tags) => Ok(PackageVersions::new(tags.clone())),
            None => Err(RegistryError::NotFound(key)),
        }
    }
}

/// Schema source keyed by `(module address, version)`
#[derive(Default)]
pub struct FakeSchemaSource {
    snapshots: HashMap<(String, String), SchemaSnapshot>,
}

impl FakeSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, address: &str, version: &str, snapshot: SchemaSnapshot) -> Self {
        self.snapshots
            .insert((address.to_string(), version.to_string()), snapshot);
        self
    }
}

#[async_trait]
impl SchemaSource for FakeSchemaSource {
    async fn fetch_schema(
        &self,
        address: &ModuleAddress,
        version: &str,
    ) -> Result<SchemaSnapshot, RegistryError> {
        self.snapshots
            .get(&(address.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("{}@{}", address, version)))
    }
}

/// Snapshot builder: `variables` are `(name, type, required)`
pub fn snapshot(variables: &[(&str, &str, bool)], outputs: &[&str]) -> SchemaSnapshot {
    let mut snapshot = SchemaSnapshot::default();
    for (name, var_type, required) in variables {
        snapshot.variables.insert(
            name.to_string(),
            VariableSpec {
                var_type: var_type.to_string(),
                required: *required,
                description: String::new(),
            },
        );
    }
    for name in outputs {
        snapshot
            .outputs
            .insert(name.to_string(), OutputSpec::default());
    }
    snapshot
}

/// Ephemeral cache with a day-long TTL
pub fn create_test_cache() -> Arc<RepositoryTagCache> {
    Arc::new(RepositoryTagCache::ephemeral(Duration::from_secs(86400)))
}

/// Checker wired to the given fakes with no advisory
pub fn create_test_checker(
    registry: FakeRegistry,
    tags: Arc<FakeTagSource>,
    schema: FakeSchemaSource,
    cache: Arc<RepositoryTagCache>,
    policy: UpdatePolicy,
) -> Checker {
    create_test_checker_with_advisor(registry, tags, schema, cache, policy, Arc::new(NoopAdvisor))
}

pub fn create_test_checker_with_advisor(
    registry: FakeRegistry,
    tags: Arc<FakeTagSource>,
    schema: FakeSchemaSource,
    cache: Arc<RepositoryTagCache>,
    policy: UpdatePolicy,
    advisor: Arc<dyn BreakingChangeAdvisor>,
) -> Checker {
    let resolver = VersionResolver::new(Arc::new(registry), tags, cache, policy);
    Checker::new(resolver, SchemaComparator::new(Arc::new(schema)), advisor)
}
