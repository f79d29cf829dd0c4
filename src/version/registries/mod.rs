//! Concrete upstream implementations

pub mod github;
pub mod terraform;

pub use github::GitHubRegistry;
pub use terraform::TerraformRegistry;

use tracing::warn;

use crate::config::{FETCH_TIMEOUT, USER_AGENT};
use crate::version::error::RegistryError;

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Map non-success statuses to [`RegistryError`]
pub(crate) fn check_status(
    response: reqwest::Response,
    name: &str,
) -> Result<reqwest::Response, RegistryError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RegistryError::NotFound(name.to_string()));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(RegistryError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        let url = response.url().to_string();
        warn!("Upstream returned status {}: {}", status, url);
        return Err(RegistryError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    Ok(response)
}
