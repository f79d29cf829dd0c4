//! Batch resolution and classification of dependencies

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::breaking::advisory::BreakingChangeAdvisor;
use crate::breaking::resources::{ResourceChangeRecord, analyze};
use crate::breaking::schema::SchemaComparator;
use crate::breaking::{BreakingSignals, aggregate};
use crate::config::FETCH_STAGGER_DELAY;
use crate::dependency::DependencyRecord;
use crate::plan::records_for;
use crate::version::error::ResolveError;
use crate::version::resolver::{ResolveOutcome, SkipReason, VersionResolver};
use crate::version::types::UpdateVerdict;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDependency {
    pub dependency: DependencyRecord,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDependency {
    pub dependency: DependencyRecord,
    pub error: String,
}

/// Outcome of a batch, in input order within each list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub verdicts: Vec<UpdateVerdict>,
    pub skipped: Vec<SkippedDependency>,
    pub failed: Vec<FailedDependency>,
}

impl CheckReport {
    pub fn outdated(&self) -> impl Iterator<Item = &UpdateVerdict> {
        self.verdicts.iter().filter(|v| v.outdated)
    }

    pub fn breaking_count(&self) -> usize {
        self.outdated().filter(|v| v.is_breaking()).count()
    }
}

pub struct Checker {
    resolver: VersionResolver,
    schema: SchemaComparator,
    advisor: Arc<dyn BreakingChangeAdvisor>,
}

impl Checker {
    pub fn new(
        resolver: VersionResolver,
        schema: SchemaComparator,
        advisor: Arc<dyn BreakingChangeAdvisor>,
    ) -> Self {
        Self {
            resolver,
            schema,
            advisor,
        }
    }

    /// Check every dependency concurrently.
    ///
    /// A dependency that fails is logged and recorded in `failed`; the rest of
    /// the batch continues. `plan` is the resource diff of the pending upgrade,
    /// when the caller ran one.
    pub async fn check(
        &self,
        dependencies: &[DependencyRecord],
        plan: Option<&[ResourceChangeRecord]>,
    ) -> CheckReport {
        let futures = dependencies.iter().enumerate().map(|(i, dependency)| async move {
            sleep(FETCH_STAGGER_DELAY * i as u32).await;
            (dependency, self.check_one(dependency, plan).await)
        });

        let mut report = CheckReport::default();
        for (dependency, result) in join_all(futures).await {
            match result {
                Ok(ResolveOutcome::Candidate(verdict)) => report.verdicts.push(verdict),
                Ok(ResolveOutcome::Skipped(reason)) => report.skipped.push(SkippedDependency {
                    dependency: dependency.clone(),
                    reason,
                }),
                Err(e) => {
                    warn!(
                        "Failed to check {} ({}): {}",
                        dependency.name,
                        dependency.location(),
                        e
                    );
                    report.failed.push(FailedDependency {
                        dependency: dependency.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Checked {} dependencies: {} outdated ({} breaking), {} skipped, {} failed",
            dependencies.len(),
            report.outdated().count(),
            report.breaking_count(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    async fn check_one(
        &self,
        dependency: &DependencyRecord,
        plan: Option<&[ResourceChangeRecord]>,
    ) -> Result<ResolveOutcome, ResolveError> {
        let candidate = match self.resolver.resolve(dependency).await? {
            ResolveOutcome::Candidate(verdict) => verdict,
            skipped => return Ok(skipped),
        };

        let mut signals = BreakingSignals::default();
        if candidate.outdated {
            signals.schema = self
                .schema
                .compare(
                    dependency,
                    &candidate.current_version,
                    &candidate.latest_version,
                )
                .await;

            signals.resources = plan.and_then(|records| {
                let owned: Vec<ResourceChangeRecord> =
                    records_for(dependency, records).into_iter().cloned().collect();
                (!owned.is_empty()).then(|| analyze(&owned))
            });
            if let Some(resources) = signals.resources.as_ref().filter(|r| r.is_critical()) {
                warn!(
                    "{} {} -> {}: {}",
                    dependency.name,
                    candidate.current_version,
                    candidate.latest_version,
                    resources.describe().replace('\n', ", ")
                );
            }

            signals.advisory = self
                .advisor
                .analyze(
                    &dependency.name,
                    &candidate.current_version,
                    &candidate.latest_version,
                    &candidate.changelog_url,
                )
                .await
                .inspect_err(|e| warn!("Advisory failed for {}, skipping: {}", dependency.name, e))
                .ok()
                .flatten();
        }

        let verdict = aggregate(candidate, signals);
        if verdict.outdated {
            info!(
                "Update available for {}: {} -> {} ({})",
                verdict.dependency.name,
                verdict.current_version,
                verdict.latest_version,
                verdict.update_type
            );
        } else {
            debug!("{} is up to date", verdict.dependency.name);
        }

        Ok(ResolveOutcome::Candidate(verdict))
    }
}
