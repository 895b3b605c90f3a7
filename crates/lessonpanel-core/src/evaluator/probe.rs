//! Optional external semantic checks.
//!
//! A [`SemanticCheck`] augments one criterion's pure detector with findings
//! from an external service (for example a readability or language-model
//! probe). Each call is bounded by a timeout. A check that times out or
//! errors leaves its criterion [`IncompleteReason::Timeout`] /
//! [`IncompleteReason::ProbeFailed`]; the detector's findings for that
//! criterion are dropped too, so a partial verdict is never reported as a
//! complete one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::domain::{Criterion, FeedbackReport, IncompleteReason, LessonPlan};
use crate::profiles::EvaluatorProfile;

use super::detectors::Finding;
use super::engine::{assemble_report, detect, CriterionOutcome};

/// Default bound on one semantic check call.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait SemanticCheck: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn check(&self, plan: &LessonPlan, criterion: Criterion) -> anyhow::Result<Vec<Finding>>;
}

/// Semantic checks keyed by the criterion they augment.
#[derive(Clone)]
pub struct SemanticChecks {
    checks: BTreeMap<Criterion, Arc<dyn SemanticCheck>>,
    timeout: Duration,
}

impl Default for SemanticChecks {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl std::fmt::Debug for SemanticChecks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticChecks")
            .field("criteria", &self.checks.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SemanticChecks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: BTreeMap::new(),
            timeout,
        }
    }

    /// Attach `check` to `criterion`, replacing any earlier one.
    pub fn with(mut self, criterion: Criterion, check: Arc<dyn SemanticCheck>) -> Self {
        self.checks.insert(criterion, check);
        self
    }

    pub fn get(&self, criterion: Criterion) -> Option<&Arc<dyn SemanticCheck>> {
        self.checks.get(&criterion)
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Like [`super::evaluate`], but merges in findings from attached checks.
#[instrument(skip_all, fields(profile = %profile.id))]
pub async fn evaluate_with_checks(
    profile: &EvaluatorProfile,
    plan: &LessonPlan,
    checks: &SemanticChecks,
) -> FeedbackReport {
    let mut outcomes = Vec::with_capacity(profile.evaluation_criteria.len());
    for &criterion in &profile.evaluation_criteria {
        let pure = detect(criterion, plan);
        let outcome = match (pure, checks.get(criterion)) {
            (CriterionOutcome::Findings(mut findings), Some(check)) => {
                match run_check(check.as_ref(), plan, criterion, checks.timeout).await {
                    Ok(extra) => {
                        findings.extend(extra);
                        CriterionOutcome::Findings(findings)
                    }
                    Err(reason) => CriterionOutcome::Incomplete(reason),
                }
            }
            (outcome, _) => outcome,
        };
        outcomes.push((criterion, outcome));
    }
    assemble_report(profile, outcomes)
}

async fn run_check(
    check: &dyn SemanticCheck,
    plan: &LessonPlan,
    criterion: Criterion,
    limit: Duration,
) -> Result<Vec<Finding>, IncompleteReason> {
    match tokio::time::timeout(limit, check.check(plan, criterion)).await {
        Ok(Ok(findings)) => Ok(findings),
        Ok(Err(e)) => {
            warn!(check = check.name(), %criterion, error = %e, "semantic check failed");
            Err(IncompleteReason::ProbeFailed {
                detail: e.to_string(),
            })
        }
        Err(_) => {
            let after_ms = limit.as_millis() as u64;
            warn!(
                check = check.name(),
                %criterion,
                timeout_ms = after_ms,
                "semantic check timed out"
            );
            Err(IncompleteReason::Timeout { after_ms })
        }
    }
}
