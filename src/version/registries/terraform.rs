//! Terraform Registry API implementation

use serde::Deserialize;
use tracing::{debug, warn};

use crate::breaking::schema::{OutputSpec, SchemaSnapshot, VariableSpec};
use crate::config::DEFAULT_REGISTRY_URL;
use crate::version::error::RegistryError;
use crate::version::registries::{check_status, http_client};
use crate::version::registry::{Registry, SchemaSource};
use crate::version::source::{ModuleAddress, ProviderAddress};
use crate::version::types::PackageVersions;

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
}

/// `GET /v1/modules/{ns}/{name}/{provider}/versions`
#[derive(Debug, Deserialize)]
struct ModuleVersionsResponse {
    modules: Vec<ModuleVersions>,
}

#[derive(Debug, Deserialize)]
struct ModuleVersions {
    versions: Vec<VersionEntry>,
}

/// `GET /v1/providers/{ns}/{type}/versions`
#[derive(Debug, Deserialize)]
struct ProviderVersionsResponse {
    versions: Vec<VersionEntry>,
}

/// `GET /v1/modules/{ns}/{name}/{provider}/{version}`
#[derive(Debug, Deserialize)]
struct ModuleDetailResponse {
    root: ModuleRoot,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModuleRoot {
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

#[derive(Debug, Deserialize)]
struct ModuleInput {
    name: String,
    #[serde(rename = "type", default)]
    input_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct ModuleOutput {
    name: String,
    #[serde(default)]
    description: String,
}

/// Registry implementation for the Terraform Registry HTTP API
pub struct TerraformRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl TerraformRegistry {
    /// Creates a new TerraformRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        name: &str,
    ) -> Result<T, RegistryError> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let response = check_status(response, name)?;

        response.json().await.map_err(|e| {
            warn!("Failed to parse registry response from {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }
}

impl Default for TerraformRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

#[async_trait::async_trait]
impl Registry for TerraformRegistry {
    async fn fetch_module_versions(
        &self,
        address: &ModuleAddress,
    ) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/v1/modules/{}/versions", self.base_url, address);
        let body: ModuleVersionsResponse = self.get_json(&url, &address.to_string()).await?;

        // No module entry means nothing is published yet
        let versions = body
            .modules
            .into_iter()
            .next()
            .map(|module| module.versions.into_iter().map(|v| v.version).collect())
            .unwrap_or_default();

        Ok(PackageVersions::new(versions))
    }

    async fn fetch_provider_versions(
        &self,
        address: &ProviderAddress,
    ) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/v1/providers/{}/versions", self.base_url, address);
        let body: ProviderVersionsResponse = self.get_json(&url, &address.to_string()).await?;

        Ok(PackageVersions::new(
            body.versions.into_iter().map(|v| v.version).collect(),
        ))
    }
}

#[async_trait::async_trait]
impl SchemaSource for TerraformRegistry {
    async fn fetch_schema(
        &self,
        address: &ModuleAddress,
        version: &str,
    ) -> Result<SchemaSnapshot, RegistryError> {
        let url = format!("{}/v1/modules/{}/{}", self.base_url, address, version);
        let body: ModuleDetailResponse = self.get_json(&url, &address.to_string()).await?;

        Ok(SchemaSnapshot {
            variables: body
                .root
                .inputs
                .into_iter()
                .map(|input| {
                    (
                        input.name,
                        VariableSpec {
                            var_type: input.input_type,
                            required: input.required,
                            description: input.description,
                        },
                    )
                })
                .collect(),
            outputs: body
                .root
                .outputs
                .into_iter()
                .map(|output| {
                    (
                        output.name,
                        OutputSpec {
                            description: output.description,
                        },
                    )
                })
                .collect(),
        })
    }
}
