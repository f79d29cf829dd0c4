//! Display-time filtering of verdicts
//!
//! These predicates only decide what gets shown. They run after resolution and
//! never change a verdict.

use crate::breaking::advisory::{AdvisorySignal, Confidence};
use crate::version::types::{UpdateType, UpdateVerdict};

/// Which update types to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayFilter {
    #[default]
    All,
    /// Also spelled `critical-only`
    MajorOnly,
    MinorAndAbove,
}

impl DisplayFilter {
    /// Unknown names behave like `all`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "major-only" | "critical-only" => DisplayFilter::MajorOnly,
            "minor-and-above" => DisplayFilter::MinorAndAbove,
            _ => DisplayFilter::All,
        }
    }

    pub fn passes(&self, update_type: UpdateType) -> bool {
        match self {
            DisplayFilter::All => true,
            DisplayFilter::MajorOnly => update_type == UpdateType::Major,
            DisplayFilter::MinorAndAbove => {
                matches!(update_type, UpdateType::Major | UpdateType::Minor)
            }
        }
    }
}

/// True when there is no advisory or its confidence reaches `minimum`
pub fn passes_confidence(advisory: Option<&AdvisorySignal>, minimum: Confidence) -> bool {
    advisory.is_none_or(|signal| signal.confidence.ordinal() >= minimum.ordinal())
}

/// Both display predicates together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicyFilter {
    pub display: DisplayFilter,
    pub min_confidence: Confidence,
}

impl Default for UpdatePolicyFilter {
    fn default() -> Self {
        Self {
            display: DisplayFilter::All,
            min_confidence: Confidence::Low,
        }
    }
}

impl UpdatePolicyFilter {
    pub fn new(display_filter: &str, min_confidence: &str) -> Self {
        Self {
            display: DisplayFilter::parse_lenient(display_filter),
            min_confidence: Confidence::parse_lenient(min_confidence),
        }
    }

    pub fn should_display(&self, verdict: &UpdateVerdict) -> bool {
        self.display.passes(verdict.update_type)
            && passes_confidence(verdict.advisory.as_ref(), self.min_confidence)
    }
}
