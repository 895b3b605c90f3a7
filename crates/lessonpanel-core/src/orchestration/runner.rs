//! Sequential orchestration: every profile, one lesson, one run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{lesson_digest, EvaluationIncomplete, FeedbackReport, LessonPlan};
use crate::evaluator::evaluate;
use crate::obs::{self, ReviewSpan};
use crate::profiles::{EvaluatorProfile, ProfileFailure, ProfileSlot};

use super::error::OrchestrationResult;
use super::schema::validate_schema;

/// A profile that produced no report, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub reason: String,
}

impl SkippedProfile {
    pub fn from_failure(failure: &ProfileFailure) -> Self {
        Self {
            profile_id: failure.profile_id.clone(),
            source: Some(failure.source.clone()),
            reason: failure.reason.clone(),
        }
    }

    pub fn profile(profile_id: &str, reason: impl Into<String>) -> Self {
        Self {
            profile_id: Some(profile_id.to_string()),
            source: None,
            reason: reason.into(),
        }
    }
}

/// The outcome of evaluating one lesson version against a set of profiles.
///
/// Run identity and timestamps live here, never on the reports, so reports
/// stay byte-identical across runs on the same inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub lesson_digest: String,
    /// In profile input order.
    pub reports: Vec<FeedbackReport>,
    pub skipped: Vec<SkippedProfile>,
    /// Set when the run was cancelled; such a run is never complete.
    #[serde(default)]
    pub cancelled: bool,
}

impl OrchestrationRun {
    pub(crate) fn start(lesson_digest: String) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: now,
            finished_at: now,
            lesson_digest,
            reports: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        obs::emit_review_finished(
            &self.run_id,
            self.reports.len(),
            self.skipped.len(),
            self.cancelled,
        );
        self
    }

    pub(crate) fn record_report(&mut self, report: FeedbackReport) {
        obs::emit_profile_evaluated(
            &report.profile_id,
            report.rating,
            report.concerns.len(),
            report.incomplete.len(),
        );
        self.reports.push(report);
    }

    pub(crate) fn record_skip(&mut self, skipped: SkippedProfile) {
        let who = skipped
            .profile_id
            .clone()
            .or_else(|| skipped.source.clone())
            .unwrap_or_default();
        obs::emit_profile_skipped(&who, &skipped.reason);
        self.skipped.push(skipped);
    }

    /// Every loaded profile reported and the run was not cancelled.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.skipped.is_empty()
    }

    /// Incomplete criteria across all reports, tagged with their profile.
    pub fn incomplete(&self) -> impl Iterator<Item = (&str, &EvaluationIncomplete)> {
        self.reports.iter().flat_map(|r| {
            let profile_id = r.profile_id.as_str();
            r.incomplete.iter().map(move |i| (profile_id, i))
        })
    }
}

pub(crate) fn loaded(slots: &[ProfileSlot]) -> impl Iterator<Item = &EvaluatorProfile> {
    slots.iter().filter_map(|s| match s {
        ProfileSlot::Loaded(p) => Some(p),
        ProfileSlot::Failed(_) => None,
    })
}

/// Evaluate `plan` against every loaded profile in `slots`, in order.
///
/// Failed slots are recorded as skipped. Returns
/// [`super::OrchestrationError::SchemaValidation`] only when the lesson
/// lacks a field every loaded profile requires.
#[instrument(skip_all, fields(profiles = slots.len()))]
pub fn evaluate_all(
    slots: &[ProfileSlot],
    plan: &LessonPlan,
) -> OrchestrationResult<OrchestrationRun> {
    validate_schema(plan, loaded(slots))?;

    let mut run = OrchestrationRun::start(lesson_digest(plan)?);
    let _span = ReviewSpan::enter(&run.run_id, &run.lesson_digest);
    obs::emit_review_started(&run.run_id, slots.len());

    for slot in slots {
        match slot {
            ProfileSlot::Loaded(profile) => run.record_report(evaluate(profile, plan)),
            ProfileSlot::Failed(failure) => run.record_skip(SkippedProfile::from_failure(failure)),
        }
    }

    Ok(run.finish())
}

/// [`evaluate_all`] for already-validated profiles.
pub fn evaluate_profiles(
    profiles: &[EvaluatorProfile],
    plan: &LessonPlan,
) -> OrchestrationResult<OrchestrationRun> {
    let slots: Vec<ProfileSlot> = profiles.iter().cloned().map(ProfileSlot::Loaded).collect();
    evaluate_all(&slots, plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Activity;
    use crate::orchestration::OrchestrationError;
    use crate::profiles::{ProfileFormat, ProfileStore};

    fn lesson() -> LessonPlan {
        let mut plan = LessonPlan::new("Photosynthesis");
        let mut a = Activity::new("lab", "Leaf lab");
        a.key_terms = vec!["chlorophyll".into(), "stomata".into()];
        a.duration_minutes = Some(40);
        a.modality = Some("hands_on".into());
        plan.activities = Some(vec![a]);
        plan
    }

    #[test]
    fn test_reports_follow_slot_order_and_failures_are_skipped() {
        let mut store = ProfileStore::builtin();
        store.insert_str("broken.toml", "id = 3", ProfileFormat::Toml);

        let run = evaluate_all(store.slots(), &lesson()).unwrap();
        let ids: Vec<&str> = run.reports.iter().map(|r| r.profile_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "struggling_reader",
                "english_learner",
                "advanced_learner",
                "attention_focused"
            ]
        );
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].source.as_deref(), Some("broken.toml"));
        assert!(!run.is_complete());
        assert!(!run.cancelled);
    }

    #[test]
    fn test_incomplete_criteria_are_collected() {
        let run = evaluate_all(ProfileStore::builtin().slots(), &lesson()).unwrap();
        // No instructions on the activity; both profiles that read them are incomplete.
        let profiles: Vec<&str> = run
            .incomplete()
            .filter(|(_, i)| i.criterion == crate::domain::Criterion::InstructionClarity)
            .map(|(p, _)| p)
            .collect();
        assert_eq!(profiles, vec!["struggling_reader", "attention_focused"]);
    }

    #[test]
    fn test_schema_failure_aborts_run() {
        let mut plan = lesson();
        plan.activities = None;
        let err = evaluate_all(ProfileStore::builtin().slots(), &plan).unwrap_err();
        assert!(matches!(err, OrchestrationError::SchemaValidation { .. }));
    }

    #[test]
    fn test_reports_are_identical_across_runs() {
        let store = ProfileStore::builtin();
        let a = evaluate_all(store.slots(), &lesson()).unwrap();
        let b = evaluate_all(store.slots(), &lesson()).unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.lesson_digest, b.lesson_digest);
        assert_eq!(a.reports, b.reports);
    }
}
