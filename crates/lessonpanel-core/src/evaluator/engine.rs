//! Rule engine: one profile × one lesson → one [`FeedbackReport`].
//!
//! Detection is shared; everything profile-specific (thresholds, trigger
//! conditions, wording) comes from the profile's decision rules. The pure
//! path is synchronous and deterministic: identical inputs always produce
//! identical reports.

use tracing::debug;

use crate::domain::{
    compute_rating, Concern, Criterion, EvaluationIncomplete, Evidence, FeedbackReport,
    IncompleteReason, LessonPlan, Recommendation, Severity,
};
use crate::obs;
use crate::profiles::{DecisionRule, EvaluatorProfile};

use super::detectors::{Finding, FindingDetail, MissingField};
use super::dispatch::{detector_for, directive_for};

/// What one criterion produced before judgement.
#[derive(Debug, Clone)]
pub enum CriterionOutcome {
    Findings(Vec<Finding>),
    Incomplete(IncompleteReason),
}

/// Run the shared detector for one criterion.
pub fn detect(criterion: Criterion, plan: &LessonPlan) -> CriterionOutcome {
    match detector_for(criterion)(plan) {
        Ok(findings) => CriterionOutcome::Findings(findings),
        Err(MissingField(field_path)) => {
            CriterionOutcome::Incomplete(IncompleteReason::MissingField { field_path })
        }
    }
}

/// Evaluate `plan` from the point of view of `profile`.
pub fn evaluate(profile: &EvaluatorProfile, plan: &LessonPlan) -> FeedbackReport {
    let outcomes = profile
        .evaluation_criteria
        .iter()
        .map(|&criterion| (criterion, detect(criterion, plan)))
        .collect();
    assemble_report(profile, outcomes)
}

/// Judge per-criterion outcomes into a report, in criterion order.
pub fn assemble_report(
    profile: &EvaluatorProfile,
    outcomes: Vec<(Criterion, CriterionOutcome)>,
) -> FeedbackReport {
    let mut concerns = Vec::new();
    let mut strengths = Vec::new();
    let mut incomplete = Vec::new();

    for (criterion, outcome) in outcomes {
        let Some(rule) = profile.rule(criterion) else {
            continue;
        };
        match outcome {
            CriterionOutcome::Incomplete(reason) => {
                obs::emit_criterion_incomplete(&profile.id, criterion, &reason);
                incomplete.push(EvaluationIncomplete { criterion, reason });
            }
            CriterionOutcome::Findings(findings) => {
                let raised = judge(criterion, rule, findings);
                debug!(
                    profile = %profile.id,
                    %criterion,
                    concerns = raised.len(),
                    "criterion judged"
                );
                if raised.is_empty() {
                    strengths.push(
                        rule.strength
                            .clone()
                            .unwrap_or_else(|| default_strength(criterion)),
                    );
                }
                concerns.extend(raised);
            }
        }
    }

    FeedbackReport {
        profile_id: profile.id.clone(),
        display_name: profile.display_name.clone(),
        priority_tag: profile.priority_tag.clone(),
        rating: compute_rating(&concerns),
        strengths,
        concerns,
        incomplete,
    }
}

fn default_strength(criterion: Criterion) -> String {
    format!("{} raises no concern", criterion.label())
}

/// Threshold and filter findings, then build concerns in artifact order.
fn judge(criterion: Criterion, rule: &DecisionRule, findings: Vec<Finding>) -> Vec<Concern> {
    let trigger = &rule.trigger;
    let mut judged: Vec<(usize, Severity, Finding)> = findings
        .into_iter()
        .filter(|f| match &f.activity {
            Some(a) => trigger.admits_modality(a.modality.as_deref()),
            None => true,
        })
        .filter_map(|f| {
            rule.thresholds
                .classify(f.value, trigger.comparison)
                .map(|severity| (severity, f))
        })
        .enumerate()
        .map(|(idx, (severity, f))| (idx, severity, f))
        .collect();

    if let Some(max) = trigger.max_concerns {
        // Stable: equal severities keep artifact order.
        judged.sort_by(|a, b| b.1.cmp(&a.1));
        judged.truncate(max);
        judged.sort_by_key(|(idx, _, _)| *idx);
    }

    judged
        .into_iter()
        .map(|(_, severity, finding)| build_concern(criterion, rule, severity, finding))
        .collect()
}

struct TemplateContext<'a> {
    activity: &'a str,
    activity_id: &'a str,
    value: String,
    terms: String,
    criterion: &'static str,
}

impl<'a> TemplateContext<'a> {
    fn new(criterion: Criterion, finding: &'a Finding) -> Self {
        let (activity, activity_id) = match &finding.activity {
            Some(a) => (a.title.as_str(), a.id.as_str()),
            None => ("the lesson", ""),
        };
        let terms = match &finding.detail {
            FindingDetail::Terms(terms) => terms.join(", "),
            _ => String::new(),
        };
        Self {
            activity,
            activity_id,
            value: format_value(finding.value),
            terms,
            criterion: criterion.label(),
        }
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("{activity}", self.activity)
            .replace("{activity_id}", self.activity_id)
            .replace("{value}", &self.value)
            .replace("{terms}", &self.terms)
            .replace("{criterion}", self.criterion)
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn build_concern(
    criterion: Criterion,
    rule: &DecisionRule,
    severity: Severity,
    finding: Finding,
) -> Concern {
    let template = &rule.recommendation;
    let ctx = TemplateContext::new(criterion, &finding);
    let change = ctx.render(&template.change);
    let rationale = ctx.render(&template.rationale);
    let issue = match &template.issue {
        Some(t) => ctx.render(t),
        None => finding.summary.clone(),
    };
    let implementation = directive_for(criterion, &finding, template, &change);

    Concern {
        criterion,
        severity,
        element: finding.element(),
        issue,
        evidence: Evidence {
            field_path: finding.field_path,
            observed: finding.observed,
        },
        recommendation: Recommendation {
            change,
            rationale,
            implementation,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activity, Directive, InstructionStep, VocabularyEntry};
    use crate::profiles::{load_profile_str, ProfileFormat};

    const VOCAB_PROFILE: &str = r#"
id = "reader"
priority_tag = "accessibility_critical"
evaluation_criteria = ["vocabulary_accessibility", "pacing"]

[decision_rules.vocabulary_accessibility]
strength = "Terms are defined"

[decision_rules.vocabulary_accessibility.thresholds]
high = 3
medium = 2
low = 1

[decision_rules.vocabulary_accessibility.recommendation]
change = "Define {terms}"
rationale = "{value} undefined terms in '{activity}'"

[decision_rules.pacing.thresholds]
high = 25

[decision_rules.pacing.recommendation]
change = "Add checkpoints to '{activity}'"
rationale = "long stretch"
"#;

    fn profile() -> EvaluatorProfile {
        load_profile_str("inline", VOCAB_PROFILE, ProfileFormat::Toml).unwrap()
    }

    fn plan_with_terms(terms: &[&str]) -> LessonPlan {
        let mut plan = LessonPlan::new("Photosynthesis");
        let mut a = Activity::new("lab", "Leaf lab");
        a.key_terms = terms.iter().map(|t| t.to_string()).collect();
        a.duration_minutes = Some(20);
        plan.activities = Some(vec![a]);
        plan
    }

    #[test]
    fn test_four_undefined_terms_is_high() {
        let plan = plan_with_terms(&["chlorophyll", "stomata", "glucose", "xylem"]);
        let report = evaluate(&profile(), &plan);

        assert_eq!(report.concerns.len(), 1);
        let c = &report.concerns[0];
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.element, "activity:lab");
        let rec = &c.recommendation;
        assert_eq!(rec.change, "Define chlorophyll, stomata, glucose, xylem");
        assert_eq!(rec.rationale, "4 undefined terms in 'Leaf lab'");
        match &rec.implementation {
            Directive::Vocabulary(v) => assert_eq!(v.entries.len(), 4),
            other => panic!("unexpected directive {other:?}"),
        }
        assert_eq!(report.rating, 3);
        // Pacing raised nothing, so it reports a default strength.
        assert_eq!(report.strengths, vec!["Pacing raises no concern"]);
    }

    #[test]
    fn test_below_lowest_threshold_is_strength() {
        let mut plan = plan_with_terms(&["chlorophyll"]);
        plan.vocabulary = Some(vec![VocabularyEntry {
            term: "chlorophyll".into(),
            definition: Some("green pigment".into()),
        }]);
        let report = evaluate(&profile(), &plan);
        assert!(report.concerns.is_empty());
        assert_eq!(report.rating, 5);
        assert_eq!(report.strengths[0], "Terms are defined");
    }

    #[test]
    fn test_missing_field_marks_criterion_incomplete() {
        let mut plan = plan_with_terms(&[]);
        if let Some(acts) = plan.activities.as_mut() {
            acts.push(Activity::new("no_duration", "Exit ticket"));
        }
        let report = evaluate(&profile(), &plan);
        assert_eq!(report.incomplete.len(), 1);
        assert_eq!(report.incomplete[0].criterion, Criterion::Pacing);
        assert_eq!(
            report.incomplete[0].reason,
            IncompleteReason::MissingField {
                field_path: "/activities/1/duration_minutes".into()
            }
        );
        assert!(report
            .concerns
            .iter()
            .all(|c| c.criterion != Criterion::Pacing));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let plan = plan_with_terms(&["a", "b", "c"]);
        let p = profile();
        assert_eq!(evaluate(&p, &plan), evaluate(&p, &plan));
    }

    #[test]
    fn test_max_concerns_keeps_highest_severity_in_artifact_order() {
        let text = r#"
id = "focus"
priority_tag = "engagement"
evaluation_criteria = ["instruction_clarity"]

[decision_rules.instruction_clarity.trigger]
max_concerns = 2

[decision_rules.instruction_clarity.thresholds]
high = 4
medium = 3
low = 2

[decision_rules.instruction_clarity.recommendation]
change = "Split step"
rationale = "{value} actions"
"#;
        let p = load_profile_str("inline", text, ProfileFormat::Toml).unwrap();
        let mut plan = LessonPlan::new("Cells");
        let mut a = Activity::new("a1", "Lab");
        a.instructions = Some(vec![
            InstructionStep::new("One. Two."),
            InstructionStep::new("One. Two. Three. Four."),
            InstructionStep::new("One. Two. Three."),
            InstructionStep::new("One. Two. Three. Four. Five."),
        ]);
        plan.activities = Some(vec![a]);

        let report = evaluate(&p, &plan);
        let paths: Vec<&str> = report
            .concerns
            .iter()
            .map(|c| c.evidence.field_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/activities/0/instructions/1",
                "/activities/0/instructions/3"
            ]
        );
        assert!(report
            .concerns
            .iter()
            .all(|c| c.severity == Severity::High));
    }

    #[test]
    fn test_template_renders_fractional_values() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.75), "0.75");
    }
}
