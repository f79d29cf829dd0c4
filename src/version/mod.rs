//! Version resolution layer
//!
//! Fetches published versions and repository tags, caches tag lists, and decides
//! whether a dependency is outdated under the configured policy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  Registry   │────▶│ VersionResolver  │◀────│  TagSource  │
//! │ (modules,   │     │  (policy, type)  │     │  (GitHub)   │
//! │  providers) │     └──────────────────┘     └─────────────┘
//! └─────────────┘        │            ▲               │
//!                        ▼            │               ▼
//!                 ┌─────────────┐   ┌────────────────────────┐
//!                 │   semver    │   │  RepositoryTagCache    │
//!                 │ (parse/cmp) │   │ (TTL, optional SQLite) │
//!                 └─────────────┘   └────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: TTL-bounded repository tag cache
//! - [`registry`]: upstream traits for versions, tags and module schemas
//! - [`registries`]: Terraform Registry and GitHub implementations
//! - [`resolver`]: per-dependency resolution
//! - [`semver`]: version parsing, ordering and update rules
//! - [`source`]: source-string decomposition
//! - [`error`]: error types for every layer
//! - [`types`]: policy and verdict types

pub mod cache;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod source;
pub mod types;
