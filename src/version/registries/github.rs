//! GitHub tags API implementation

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_GITHUB_URL, TAG_PAGE_SIZE};
use crate::version::error::RegistryError;
use crate::version::registries::{check_status, http_client};
use crate::version::registry::TagSource;
use crate::version::source::RepositoryKey;
use crate::version::types::PackageVersions;

/// Response item from GitHub tags API
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Tag source backed by the GitHub REST API
pub struct GitHubRegistry {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubRegistry {
    /// Creates a new GitHubRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Authenticate requests; raises the API rate limit
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

impl Default for GitHubRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_GITHUB_URL)
    }
}

#[async_trait::async_trait]
impl TagSource for GitHubRegistry {
    /// First page of tags, newest first as GitHub returns them
    async fn fetch_tags(
        &self,
        repository: &RepositoryKey,
    ) -> Result<PackageVersions, RegistryError> {
        let url = format!(
            "{}/repos/{}/tags?per_page={}",
            self.base_url, repository, TAG_PAGE_SIZE
        );
        debug!("Fetching tags for {}", repository);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let response = check_status(response, &repository.to_string())?;

        let tags: Vec<Tag> = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub tags response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(PackageVersions::new(
            tags.into_iter().map(|t| t.name).collect(),
        ))
    }
}
