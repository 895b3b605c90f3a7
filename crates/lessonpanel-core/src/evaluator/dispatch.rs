//! Criterion → detector dispatch and directive construction.

use crate::domain::{
    Criterion, Directive, InstructionsDirective, PacingDirective, ScaffoldingDirective,
    SupportTier, VocabularyDirective, VocabularyEntry,
};
use crate::profiles::RecommendationTemplate;

use super::detectors::{self, DetectorResult, Finding, FindingDetail};

pub type Detector = fn(&crate::domain::LessonPlan) -> DetectorResult;

/// Pacing interval used when a template names none.
pub const DEFAULT_PACING_INTERVAL: u32 = 10;

/// The detector registered for `criterion`. Exhaustive, so every criterion
/// a profile can name has exactly one handler.
pub fn detector_for(criterion: Criterion) -> Detector {
    match criterion {
        Criterion::VocabularyAccessibility => detectors::vocabulary_accessibility,
        Criterion::InstructionClarity => detectors::instruction_clarity,
        Criterion::ScaffoldingSupport => detectors::scaffolding_support,
        Criterion::ChallengeLevel => detectors::challenge_level,
        Criterion::ContentDepth => detectors::content_depth,
        Criterion::Pacing => detectors::pacing,
        Criterion::CognitiveRigor => detectors::cognitive_rigor,
        Criterion::CognitiveDistribution => detectors::cognitive_distribution,
        Criterion::EngagementVariety => detectors::engagement_variety,
    }
}

/// Build the implementation directive for a finding.
///
/// Falls back to [`Directive::Generic`] when the finding lacks what the
/// specific directive needs (e.g. a probe finding with no activity).
pub fn directive_for(
    criterion: Criterion,
    finding: &Finding,
    template: &RecommendationTemplate,
    change: &str,
) -> Directive {
    let generic = || Directive::Generic {
        summary: change.to_string(),
    };
    let Some(activity) = finding.activity.as_ref() else {
        return match (criterion, &finding.detail) {
            (Criterion::VocabularyAccessibility, FindingDetail::Terms(terms)) => {
                vocabulary(terms).unwrap_or_else(generic)
            }
            _ => generic(),
        };
    };
    let suggestion = || {
        template
            .suggestion
            .clone()
            .unwrap_or_else(|| change.to_string())
    };

    match criterion {
        Criterion::VocabularyAccessibility => match &finding.detail {
            FindingDetail::Terms(terms) => vocabulary(terms).unwrap_or_else(generic),
            _ => generic(),
        },
        Criterion::InstructionClarity => match &finding.detail {
            FindingDetail::Step { index, actions } if actions.len() > 1 => {
                Directive::Instructions(InstructionsDirective {
                    activity_id: activity.id.clone(),
                    step_index: *index,
                    sub_steps: actions.clone(),
                })
            }
            _ => generic(),
        },
        Criterion::ScaffoldingSupport => Directive::Scaffolding(ScaffoldingDirective {
            activity_id: activity.id.clone(),
            tier: template.tier.unwrap_or(SupportTier::Support),
            entries: vec![suggestion()],
        }),
        Criterion::ChallengeLevel | Criterion::ContentDepth => {
            Directive::Scaffolding(ScaffoldingDirective {
                activity_id: activity.id.clone(),
                tier: template.tier.unwrap_or(SupportTier::Extension),
                entries: vec![suggestion()],
            })
        }
        Criterion::Pacing => Directive::Pacing(PacingDirective {
            activity_id: activity.id.clone(),
            interval_minutes: template.interval_minutes.unwrap_or(DEFAULT_PACING_INTERVAL),
            note: suggestion(),
        }),
        Criterion::CognitiveRigor
        | Criterion::CognitiveDistribution
        | Criterion::EngagementVariety => generic(),
    }
}

fn vocabulary(terms: &[String]) -> Option<Directive> {
    if terms.is_empty() {
        return None;
    }
    Some(Directive::Vocabulary(VocabularyDirective {
        entries: terms
            .iter()
            .map(|t| VocabularyEntry {
                term: t.clone(),
                definition: None,
            })
            .collect(),
    }))
}
