use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::version::types::UpdatePolicy;

// =============================================================================
// Time and paging constants
// =============================================================================

/// Default lifetime of a cached tag list (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Timeout for every upstream request (30 seconds)
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between starting each dependency check to avoid rate limiting
pub const FETCH_STAGGER_DELAY: Duration = Duration::from_millis(10);

/// Tags requested per page from the version-control host
pub const TAG_PAGE_SIZE: u32 = 100;

/// User agent sent to every upstream
pub const USER_AGENT: &str = concat!("tfbump/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.terraform.io";
pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";
pub const DEFAULT_ADVISORY_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ADVISORY_MODEL: &str = "gpt-4o-mini";

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version_check: VersionCheckConfig,
    pub advisory: AdvisoryConfig,
    pub github: GitHubConfig,
    pub registry: RegistryConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load from a JSON file; absent sections take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Fill secrets that the file left empty from the environment
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.github.token.is_none() {
            self.github.token = lookup("GITHUB_TOKEN").filter(|v| !v.is_empty());
        }
        if self.advisory.api_key.is_none() {
            self.advisory.api_key = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty());
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct VersionCheckConfig {
    pub skip_prerelease: bool,
    pub patch_only: bool,
    pub minor_only: bool,
    pub ignore_modules: Vec<String>,
    pub ignore_providers: Vec<String>,
    /// `all`, `major-only`, `minor-and-above` or `critical-only`
    pub display_filter: String,
}

impl Default for VersionCheckConfig {
    fn default() -> Self {
        Self {
            skip_prerelease: true,
            patch_only: false,
            minor_only: false,
            ignore_modules: Vec::new(),
            ignore_providers: Vec::new(),
            display_filter: "all".to_string(),
        }
    }
}

impl VersionCheckConfig {
    pub fn policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            skip_prerelease: self.skip_prerelease,
            patch_only: self.patch_only,
            minor_only: self.minor_only,
            ignore_modules: self.ignore_modules.clone(),
            ignore_providers: self.ignore_providers.clone(),
        }
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Updates whose advisory is less confident than this are hidden
    pub min_confidence: String,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: DEFAULT_ADVISORY_MODEL.to_string(),
            base_url: DEFAULT_ADVISORY_URL.to_string(),
            min_confidence: "low".to_string(),
        }
    }
}

impl fmt::Debug for AdvisoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisoryConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub base_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_GITHUB_URL.to_string(),
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_deref().map(mask_secret))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Mirror the tag cache to disk across runs
    pub persistent: bool,
    pub ttl_secs: u64,
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: false,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Database file of the persistent tag cache
    pub fn db_path(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(cache_dir)
            .join("repository-tags.db")
    }
}

/// Show only the first and last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Returns the cache directory for tfbump.
/// Uses $XDG_CACHE_HOME/tfbump if XDG_CACHE_HOME is set,
/// otherwise the platform cache directory,
/// or ./tfbump if neither is available.
pub fn cache_dir() -> PathBuf {
    cache_dir_with_env(std::env::var("XDG_CACHE_HOME").ok(), dirs::cache_dir())
}

fn cache_dir_with_env(xdg_cache_home: Option<String>, platform_cache: Option<PathBuf>) -> PathBuf {
    xdg_cache_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or(platform_cache)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tfbump")
}
