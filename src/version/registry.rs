//! Upstream traits for fetching versions, tags and module interfaces

#[cfg(test)]
use mockall::automock;

use crate::breaking::schema::SchemaSnapshot;
use crate::version::error::RegistryError;
use crate::version::source::{ModuleAddress, ProviderAddress, RepositoryKey};
use crate::version::types::PackageVersions;

/// Module and provider registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Every published version of a module, in upstream order
    async fn fetch_module_versions(
        &self,
        address: &ModuleAddress,
    ) -> Result<PackageVersions, RegistryError>;

    /// Every published version of a provider, in upstream order
    async fn fetch_provider_versions(
        &self,
        address: &ProviderAddress,
    ) -> Result<PackageVersions, RegistryError>;
}

/// Version-control host listing repository tags
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TagSource: Send + Sync {
    async fn fetch_tags(&self, repository: &RepositoryKey)
    -> Result<PackageVersions, RegistryError>;
}

/// Declared variables and outputs of one published module version
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(
        &self,
        address: &ModuleAddress,
        version: &str,
    ) -> Result<SchemaSnapshot, RegistryError>;
}
