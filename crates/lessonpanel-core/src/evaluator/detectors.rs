//! Criterion detectors.
//!
//! Each detector measures one property of a lesson and reports a raw
//! [`Finding`] per scope unit (activity, instruction step, or the lesson as a
//! whole). Detectors never judge severity; that is the profile's job.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::domain::{Activity, CognitiveLevel, Criterion, LessonPlan, SupportTier};

/// A required lesson field was absent; carries its JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField(pub String);

pub type DetectorResult = std::result::Result<Vec<Finding>, MissingField>;

/// The activity a finding was measured on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRef {
    pub id: String,
    pub title: String,
    pub modality: Option<String>,
}

impl ActivityRef {
    pub fn of(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            title: activity.title.clone(),
            modality: activity.modality.clone(),
        }
    }
}

/// Detector-specific payload used to build the implementation directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FindingDetail {
    #[default]
    None,
    Terms(Vec<String>),
    Step { index: usize, actions: Vec<String> },
    Level(CognitiveLevel),
}

/// One raw measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub field_path: String,
    pub observed: serde_json::Value,
    pub value: f64,
    /// `None` for lesson-scoped findings.
    pub activity: Option<ActivityRef>,
    /// Default issue sentence.
    pub summary: String,
    pub detail: FindingDetail,
}

impl Finding {
    pub fn lesson(field_path: impl Into<String>, value: f64, summary: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            observed: json!(value),
            value,
            activity: None,
            summary: summary.into(),
            detail: FindingDetail::None,
        }
    }

    pub fn for_activity(
        activity: &Activity,
        field_path: impl Into<String>,
        value: f64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            activity: Some(ActivityRef::of(activity)),
            ..Self::lesson(field_path, value, summary)
        }
    }

    pub fn with_observed(mut self, observed: serde_json::Value) -> Self {
        self.observed = observed;
        self
    }

    pub fn with_detail(mut self, detail: FindingDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Element locator for the concern this finding may become.
    pub fn element(&self) -> String {
        match &self.activity {
            Some(a) => format!("activity:{}", a.id),
            None => "lesson".to_string(),
        }
    }
}

fn require(plan: &LessonPlan, criterion: Criterion) -> Result<(), MissingField> {
    for field in criterion.required_fields() {
        if let Some(path) = plan.missing_field(*field) {
            return Err(MissingField(path));
        }
    }
    Ok(())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ---------------------------------------------------------------------------
// Activity-scoped detectors
// ---------------------------------------------------------------------------

pub fn vocabulary_accessibility(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::VocabularyAccessibility)?;
    let mut out = Vec::new();
    for (idx, activity) in plan.activities().iter().enumerate() {
        let mut seen = BTreeSet::new();
        let undefined: Vec<String> = activity
            .key_terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && !plan.defines_term(t))
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(str::to_string)
            .collect();

        let summary = format!(
            "'{}' uses {} without a definition",
            activity.title,
            plural(undefined.len(), "key term", "key terms")
        );
        out.push(
            Finding::for_activity(
                activity,
                format!("/activities/{idx}/key_terms"),
                undefined.len() as f64,
                summary,
            )
            .with_observed(json!(undefined))
            .with_detail(FindingDetail::Terms(undefined)),
        );
    }
    Ok(out)
}

fn action_splitter() -> Option<&'static Regex> {
    static SPLIT: OnceLock<Option<Regex>> = OnceLock::new();
    SPLIT
        .get_or_init(|| Regex::new(r"[.!?;]+(?:\s+|$)").ok())
        .as_ref()
}

/// Split an instruction into its individual actions (sentences).
pub fn split_actions(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = match action_splitter() {
        Some(re) => re.split(text).collect(),
        None => vec![text],
    };
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn instruction_clarity(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::InstructionClarity)?;
    let mut out = Vec::new();
    for (idx, activity) in plan.activities().iter().enumerate() {
        let steps = activity.instructions.as_deref().unwrap_or(&[]);
        for (step_idx, step) in steps.iter().enumerate() {
            // Already broken down by the author.
            if !step.sub_steps.is_empty() {
                continue;
            }
            let actions = split_actions(&step.text);
            let summary = format!(
                "Step {} of '{}' packs {} into one instruction",
                step_idx + 1,
                activity.title,
                plural(actions.len(), "action", "actions")
            );
            out.push(
                Finding::for_activity(
                    activity,
                    format!("/activities/{idx}/instructions/{step_idx}"),
                    actions.len() as f64,
                    summary,
                )
                .with_observed(json!(step.text))
                .with_detail(FindingDetail::Step {
                    index: step_idx,
                    actions,
                }),
            );
        }
    }
    Ok(out)
}

fn scaffold_findings(plan: &LessonPlan, tiers: &[SupportTier], noun: (&str, &str)) -> Vec<Finding> {
    plan.activities()
        .iter()
        .enumerate()
        .map(|(idx, activity)| {
            let n = activity.scaffold_count(tiers);
            Finding::for_activity(
                activity,
                format!("/activities/{idx}/scaffolds"),
                n as f64,
                format!("'{}' offers {}", activity.title, plural(n, noun.0, noun.1)),
            )
        })
        .collect()
}

pub fn scaffolding_support(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::ScaffoldingSupport)?;
    Ok(scaffold_findings(
        plan,
        &[SupportTier::Core, SupportTier::Support],
        ("support scaffold", "support scaffolds"),
    ))
}

pub fn challenge_level(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::ChallengeLevel)?;
    Ok(scaffold_findings(
        plan,
        &[SupportTier::Extension],
        ("extension task", "extension tasks"),
    ))
}

pub fn content_depth(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::ContentDepth)?;
    let mut out = Vec::new();
    for (idx, activity) in plan.activities().iter().enumerate() {
        let Some(level) = activity.cognitive_level else {
            continue;
        };
        out.push(
            Finding::for_activity(
                activity,
                format!("/activities/{idx}/cognitive_level"),
                f64::from(level.rank()),
                format!("'{}' stays at the {level} level", activity.title),
            )
            .with_observed(json!(level))
            .with_detail(FindingDetail::Level(level)),
        );
    }
    Ok(out)
}

pub fn pacing(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::Pacing)?;
    let mut out = Vec::new();
    for (idx, activity) in plan.activities().iter().enumerate() {
        let Some(duration) = activity.duration_minutes else {
            continue;
        };
        let stretches = activity.pacing_checkpoints.len() as u32 + 1;
        let per_stretch = duration.div_ceil(stretches);
        out.push(
            Finding::for_activity(
                activity,
                format!("/activities/{idx}/duration_minutes"),
                f64::from(per_stretch),
                format!(
                    "'{}' runs {per_stretch} minutes without a checkpoint",
                    activity.title
                ),
            )
            .with_observed(json!({
                "duration_minutes": duration,
                "checkpoints": activity.pacing_checkpoints.len(),
            })),
        );
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lesson-scoped detectors
// ---------------------------------------------------------------------------

pub fn cognitive_rigor(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::CognitiveRigor)?;
    let objectives = plan.objectives.as_deref().unwrap_or(&[]);
    let highest = objectives.iter().filter_map(|o| o.cognitive_level).max();
    let reaches_top = highest == Some(CognitiveLevel::HIGHEST);

    let summary = match highest {
        Some(level) => format!("Objectives peak at the {level} level"),
        None => "No objective declares a cognitive level".to_string(),
    };
    let flag = if reaches_top { 0.0 } else { 1.0 };
    Ok(vec![
        Finding::lesson("/objectives", flag, summary).with_observed(json!(highest))
    ])
}

pub fn cognitive_distribution(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::CognitiveDistribution)?;
    let levels: Vec<CognitiveLevel> = plan
        .objectives
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|o| o.cognitive_level)
        .collect();
    if levels.is_empty() {
        return Ok(Vec::new());
    }

    let lower = levels.iter().filter(|l| l.is_lower_order()).count();
    let share = lower as f64 / levels.len() as f64;
    let summary = format!(
        "{lower} of {} objectives sit at remember/understand",
        levels.len()
    );
    Ok(vec![Finding::lesson("/objectives", share, summary).with_observed(json!({
        "lower_order": lower,
        "total": levels.len(),
    }))])
}

pub fn engagement_variety(plan: &LessonPlan) -> DetectorResult {
    require(plan, Criterion::EngagementVariety)?;
    let activities = plan.activities();
    if activities.is_empty() {
        return Ok(Vec::new());
    }
    let modalities: BTreeSet<String> = activities
        .iter()
        .filter_map(|a| a.modality.as_deref())
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    let summary = format!(
        "Lesson uses {}",
        plural(modalities.len(), "activity modality", "activity modalities")
    );
    let finding = Finding::lesson("/activities", modalities.len() as f64, summary);
    Ok(vec![finding.with_observed(json!(modalities))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstructionStep, Objective, PacingCheckpoint, Scaffold, VocabularyEntry};

    fn activity(id: &str) -> Activity {
        Activity::new(id, format!("Activity {id}"))
    }

    #[test]
    fn test_vocabulary_counts_distinct_undefined_terms() {
        let mut plan = LessonPlan::new("Cells");
        let mut a = activity("a1");
        a.key_terms = vec![
            "mitochondria".into(),
            "Nucleus".into(),
            "nucleus".into(),
            "membrane".into(),
        ];
        plan.activities = Some(vec![a]);
        plan.vocabulary = Some(vec![VocabularyEntry {
            term: "membrane".into(),
            definition: Some("outer layer".into()),
        }]);

        let findings = vocabulary_accessibility(&plan).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].value, 2.0);
        assert_eq!(findings[0].field_path, "/activities/0/key_terms");
        assert_eq!(
            findings[0].detail,
            FindingDetail::Terms(vec!["mitochondria".into(), "Nucleus".into()])
        );
        assert_eq!(findings[0].element(), "activity:a1");
    }

    #[test]
    fn test_split_actions() {
        let actions =
            split_actions("Read the passage. Underline key words; then answer the questions!");
        assert_eq!(
            actions,
            vec![
                "Read the passage",
                "Underline key words",
                "then answer the questions"
            ]
        );
        assert!(split_actions("   ").is_empty());
    }

    #[test]
    fn test_instruction_clarity_skips_broken_down_steps() {
        let mut plan = LessonPlan::new("Cells");
        let mut a = activity("a1");
        let mut done = InstructionStep::new("Observe. Sketch. Label.");
        done.sub_steps = vec!["Observe".into()];
        a.instructions = Some(vec![InstructionStep::new("Observe. Sketch. Label."), done]);
        plan.activities = Some(vec![a]);

        let findings = instruction_clarity(&plan).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].value, 3.0);
        assert_eq!(findings[0].field_path, "/activities/0/instructions/0");
    }

    #[test]
    fn test_instruction_clarity_requires_instructions() {
        let mut plan = LessonPlan::new("Cells");
        plan.activities = Some(vec![activity("a1")]);
        assert_eq!(
            instruction_clarity(&plan),
            Err(MissingField("/activities/0/instructions".into()))
        );
    }

    #[test]
    fn test_scaffold_detectors_split_by_tier() {
        let mut plan = LessonPlan::new("Cells");
        let mut a = activity("a1");
        a.scaffolds = vec![
            Scaffold {
                text: "frame".into(),
                tier: SupportTier::Support,
            },
            Scaffold {
                text: "stretch".into(),
                tier: SupportTier::Extension,
            },
            Scaffold {
                text: "stretch 2".into(),
                tier: SupportTier::Extension,
            },
        ];
        plan.activities = Some(vec![a]);
        assert_eq!(scaffolding_support(&plan).unwrap()[0].value, 1.0);
        assert_eq!(challenge_level(&plan).unwrap()[0].value, 2.0);
    }

    #[test]
    fn test_pacing_measures_longest_stretch() {
        let mut plan = LessonPlan::new("Cells");
        let mut a = activity("a1");
        a.duration_minutes = Some(35);
        a.pacing_checkpoints = vec![PacingCheckpoint {
            at_minute: 15,
            note: "check".into(),
        }];
        plan.activities = Some(vec![a]);
        assert_eq!(pacing(&plan).unwrap()[0].value, 18.0);
    }

    #[test]
    fn test_cognitive_rigor_flags_missing_create() {
        let mut plan = LessonPlan::new("Cells");
        plan.objectives = Some(vec![Objective {
            text: "Explain".into(),
            cognitive_level: Some(CognitiveLevel::Analyze),
        }]);
        assert_eq!(cognitive_rigor(&plan).unwrap()[0].value, 1.0);

        plan.objectives = Some(vec![Objective {
            text: "Design".into(),
            cognitive_level: Some(CognitiveLevel::Create),
        }]);
        assert_eq!(cognitive_rigor(&plan).unwrap()[0].value, 0.0);
    }

    #[test]
    fn test_cognitive_distribution_share() {
        let mut plan = LessonPlan::new("Cells");
        plan.objectives = Some(
            [
                CognitiveLevel::Remember,
                CognitiveLevel::Understand,
                CognitiveLevel::Understand,
                CognitiveLevel::Evaluate,
            ]
            .into_iter()
            .map(|l| Objective {
                text: "x".into(),
                cognitive_level: Some(l),
            })
            .collect(),
        );
        assert_eq!(cognitive_distribution(&plan).unwrap()[0].value, 0.75);
    }

    #[test]
    fn test_engagement_variety_counts_distinct_modalities() {
        let mut plan = LessonPlan::new("Cells");
        let mut a = activity("a1");
        a.modality = Some("Lecture".into());
        let mut b = activity("a2");
        b.modality = Some("lecture".into());
        let mut c = activity("a3");
        c.modality = Some("hands_on".into());
        plan.activities = Some(vec![a, b, c]);
        assert_eq!(engagement_variety(&plan).unwrap()[0].value, 2.0);
    }

    #[test]
    fn test_lesson_scoped_missing_objectives() {
        let plan = LessonPlan::new("Cells");
        assert_eq!(
            cognitive_rigor(&plan),
            Err(MissingField("/objectives".into()))
        );
    }
}
