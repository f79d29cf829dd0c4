use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Per-dependency failure; the batch skips the dependency and continues
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Cannot parse source '{input}': {reason}")]
    SourceParse { input: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] RegistryError),

    #[error("No usable versions found for '{0}'")]
    EmptyVersionSet(String),

    #[error("Invalid version '{version}'")]
    InvalidVersion { version: String },
}

impl ResolveError {
    pub fn source_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::SourceParse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("Advisory API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Advisory API returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid advisory response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_messages_name_the_input() {
        let err = ResolveError::source_parse("hashicorp", "expected namespace/name/provider");
        assert!(err.to_string().contains("hashicorp"));

        let err = ResolveError::EmptyVersionSet("terraform-aws-modules/vpc/aws".to_string());
        assert!(err.to_string().contains("terraform-aws-modules/vpc/aws"));

        let err = ResolveError::InvalidVersion {
            version: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid version 'abc'");
    }

    #[test]
    fn upstream_error_is_transparent() {
        let err: ResolveError = RegistryError::UnexpectedStatus {
            status: 500,
            url: "http://localhost/x".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Unexpected status 500 from http://localhost/x");
    }
}
