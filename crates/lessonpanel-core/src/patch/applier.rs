//! Copy-on-write application of approved changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{lesson_digest, Directive, LessonPlan, Result};
use crate::obs;

use super::handlers::{apply_directive, HandlerOutcome};

/// One teacher-approved change ready to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedChange {
    pub change_id: String,
    pub directive: Directive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualReview {
    pub change_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedChange {
    pub change_id: String,
    pub reason: String,
}

/// The new lesson version plus a per-change account of what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub plan: LessonPlan,
    pub base_digest: String,
    pub digest: String,
    /// Change ids applied, in input order.
    pub applied: Vec<String>,
    pub manual_review_required: Vec<ManualReview>,
    pub apply_failed: Vec<FailedChange>,
}

impl PatchOutcome {
    /// Whether the patch produced a different lesson version.
    pub fn changed(&self) -> bool {
        self.base_digest != self.digest
    }
}

/// Apply `approved` to a copy of `plan`, in order. `plan` is never mutated.
///
/// Applying no changes yields a plan deep-equal to the input with the same
/// digest.
pub fn apply(plan: &LessonPlan, approved: &[ApprovedChange]) -> Result<PatchOutcome> {
    let base_digest = lesson_digest(plan)?;
    let mut next = plan.clone();
    let mut applied = Vec::new();
    let mut manual_review_required = Vec::new();
    let mut apply_failed = Vec::new();

    for change in approved {
        match apply_directive(&mut next, &change.directive) {
            HandlerOutcome::Applied => applied.push(change.change_id.clone()),
            HandlerOutcome::ManualReview => {
                let summary = match &change.directive {
                    Directive::Generic { summary } => summary.clone(),
                    other => other.element().to_string(),
                };
                manual_review_required.push(ManualReview {
                    change_id: change.change_id.clone(),
                    summary,
                });
            }
            HandlerOutcome::Failed(e) => {
                debug!(change = %change.change_id, error = %e, "change not applied");
                apply_failed.push(FailedChange {
                    change_id: change.change_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let digest = lesson_digest(&next)?;
    obs::emit_patch_applied(
        &base_digest,
        &digest,
        applied.len(),
        manual_review_required.len(),
        apply_failed.len(),
    );

    Ok(PatchOutcome {
        plan: next,
        base_digest,
        digest,
        applied,
        manual_review_required,
        apply_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activity, PacingDirective, VocabularyDirective, VocabularyEntry};

    fn plan() -> LessonPlan {
        let mut plan = LessonPlan::new("Cells");
        let mut a = Activity::new("lab", "Microscope lab");
        a.duration_minutes = Some(25);
        plan.activities = Some(vec![a]);
        plan
    }

    #[test]
    fn test_empty_apply_is_identity() {
        let p = plan();
        let out = apply(&p, &[]).unwrap();
        assert_eq!(out.plan, p);
        assert_eq!(out.digest, out.base_digest);
        assert!(!out.changed());
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_apply_records_each_outcome_and_leaves_input() {
        let p = plan();
        let snapshot = p.clone();
        let changes = vec![
            ApprovedChange {
                change_id: "universal-1".into(),
                directive: Directive::Vocabulary(VocabularyDirective {
                    entries: vec![VocabularyEntry {
                        term: "cell".into(),
                        definition: None,
                    }],
                }),
            },
            ApprovedChange {
                change_id: "engagement-1".into(),
                directive: Directive::Generic {
                    summary: "Add a gallery walk".into(),
                },
            },
            ApprovedChange {
                change_id: "engagement-2".into(),
                directive: Directive::Pacing(PacingDirective {
                    activity_id: "ghost".into(),
                    interval_minutes: 10,
                    note: "break".into(),
                }),
            },
        ];
        let out = apply(&p, &changes).unwrap();

        assert_eq!(p, snapshot);
        assert!(out.changed());
        assert_eq!(out.applied, vec!["universal-1".to_string()]);
        assert_eq!(out.manual_review_required[0].summary, "Add a gallery walk");
        assert_eq!(out.apply_failed[0].change_id, "engagement-2");
        assert!(out.apply_failed[0].reason.contains("ghost"));
    }
}
