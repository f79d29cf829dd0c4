//! Breaking-change classification
//!
//! ```text
//! candidate verdict ──┬── SchemaComparator (registry modules)
//!                     ├── resources::analyze (plan diff, when supplied)
//!                     └── BreakingChangeAdvisor (display only)
//!                                │
//!                                ▼
//!                     aggregator::aggregate ──▶ final verdict
//! ```
//!
//! - [`schema`]: variable/output interface diff between two module versions
//! - [`resources`]: replace/delete/modify buckets from a plan diff
//! - [`advisory`]: optional model-generated assessment
//! - [`aggregator`]: the only place the breaking flag is raised

pub mod advisory;
pub mod aggregator;
pub mod resources;
pub mod schema;

pub use aggregator::{BreakingSignals, aggregate};
