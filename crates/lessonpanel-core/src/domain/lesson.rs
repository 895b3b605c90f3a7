//! The lesson plan artifact and its field contract.
//!
//! A `LessonPlan` is produced by an upstream authoring step and only ever
//! read by evaluators. Optional collections are modelled as `Option` so that
//! "absent" (the author never supplied the field) stays distinguishable from
//! "present but empty"; criteria that need an absent field are skipped rather
//! than guessed at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bloom-style cognitive tier, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl CognitiveLevel {
    /// The highest tier a lesson can reach.
    pub const HIGHEST: CognitiveLevel = CognitiveLevel::Create;

    /// 1-based rank (remember = 1, create = 6).
    pub fn rank(self) -> u32 {
        match self {
            Self::Remember => 1,
            Self::Understand => 2,
            Self::Apply => 3,
            Self::Analyze => 4,
            Self::Evaluate => 5,
            Self::Create => 6,
        }
    }

    /// Remember and understand.
    pub fn is_lower_order(self) -> bool {
        self.rank() <= 2
    }
}

impl std::fmt::Display for CognitiveLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Remember => "remember",
            Self::Understand => "understand",
            Self::Apply => "apply",
            Self::Analyze => "analyze",
            Self::Evaluate => "evaluate",
            Self::Create => "create",
        };
        write!(f, "{s}")
    }
}

/// Which learners a scaffold is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTier {
    /// Shared core every learner works through.
    Core,
    /// Additional support for learners who need it.
    #[default]
    Support,
    /// Optional stretch path for capable learners.
    Extension,
    /// One of several paths a student picks between.
    Choice,
}

impl std::fmt::Display for SupportTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Core => "core",
            Self::Support => "support",
            Self::Extension => "extension",
            Self::Choice => "choice",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_level: Option<CognitiveLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_steps: Vec<String>,
}

impl InstructionStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sub_steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaffold {
    pub text: String,
    #[serde(default)]
    pub tier: SupportTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingCheckpoint {
    pub at_minute: u32,
    pub note: String,
}

/// One activity in the lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Stable identifier used by patch directives.
    pub id: String,
    pub title: String,
    /// Free-form modality label ("discussion", "hands_on", "lecture", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<InstructionStep>>,
    /// Technical terms the activity relies on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scaffolds: Vec<Scaffold>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pacing_checkpoints: Vec<PacingCheckpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_level: Option<CognitiveLevel>,
}

impl Activity {
    /// Create a bare activity with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            modality: None,
            duration_minutes: None,
            instructions: None,
            key_terms: Vec::new(),
            scaffolds: Vec::new(),
            pacing_checkpoints: Vec::new(),
            cognitive_level: None,
        }
    }

    /// Number of scaffolds on the given tiers.
    pub fn scaffold_count(&self, tiers: &[SupportTier]) -> usize {
        self.scaffolds
            .iter()
            .filter(|s| tiers.contains(&s.tier))
            .count()
    }

    /// Element locator used by concerns targeting this activity.
    pub fn element(&self) -> String {
        format!("activity:{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub term: String,
    /// `None` when the entry was added by a patch and awaits a teacher-written definition.
    #[serde(default)]
    pub definition: Option<String>,
}

/// The lesson document under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<Objective>>,
    /// Named prose sections ("warm_up", "closure", "assessment", ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<VocabularyEntry>>,
}

/// Named fields of the lesson schema that criteria may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactField {
    Title,
    Activities,
    Objectives,
    ActivityInstructions,
    ActivityDurations,
    ActivityCognitiveLevels,
}

impl std::fmt::Display for ArtifactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Title => "title",
            Self::Activities => "activities",
            Self::Objectives => "objectives",
            Self::ActivityInstructions => "activities[].instructions",
            Self::ActivityDurations => "activities[].duration_minutes",
            Self::ActivityCognitiveLevels => "activities[].cognitive_level",
        };
        write!(f, "{s}")
    }
}

impl LessonPlan {
    /// Create a lesson with a title, an empty activity list and nothing else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: None,
            grade_level: None,
            total_minutes: None,
            objectives: None,
            sections: BTreeMap::new(),
            activities: Some(Vec::new()),
            vocabulary: None,
        }
    }

    /// Activities, or an empty slice when the field is absent.
    pub fn activities(&self) -> &[Activity] {
        self.activities.as_deref().unwrap_or(&[])
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities().iter().find(|a| a.id == id)
    }

    /// The vocabulary entry for `term` (case-insensitive, trimmed).
    pub fn vocabulary_entry(&self, term: &str) -> Option<&VocabularyEntry> {
        let needle = term.trim().to_lowercase();
        self.vocabulary
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|v| v.term.trim().to_lowercase() == needle)
    }

    /// Whether `term` has a vocabulary entry with a non-blank definition.
    pub fn defines_term(&self, term: &str) -> bool {
        self.vocabulary_entry(term)
            .and_then(|v| v.definition.as_deref())
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// JSON pointer of the first location where `field` is missing, or `None`
    /// if the field is fully present.
    ///
    /// Per-activity fields are missing if any activity lacks them, or if the
    /// activity list itself is absent.
    pub fn missing_field(&self, field: ArtifactField) -> Option<String> {
        match field {
            ArtifactField::Title => self.title.trim().is_empty().then(|| "/title".to_string()),
            ArtifactField::Activities => {
                self.activities.is_none().then(|| "/activities".to_string())
            }
            ArtifactField::Objectives => {
                self.objectives.is_none().then(|| "/objectives".to_string())
            }
            ArtifactField::ActivityInstructions => {
                self.first_activity_missing(|a| a.instructions.is_some(), "instructions")
            }
            ArtifactField::ActivityDurations => {
                self.first_activity_missing(|a| a.duration_minutes.is_some(), "duration_minutes")
            }
            ArtifactField::ActivityCognitiveLevels => {
                self.first_activity_missing(|a| a.cognitive_level.is_some(), "cognitive_level")
            }
        }
    }

    fn first_activity_missing(
        &self,
        present: impl Fn(&Activity) -> bool,
        leaf: &str,
    ) -> Option<String> {
        let Some(activities) = self.activities.as_ref() else {
            return Some("/activities".to_string());
        };
        activities
            .iter()
            .position(|a| !present(a))
            .map(|idx| format!("/activities/{idx}/{leaf}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LessonPlan {
        let mut plan = LessonPlan::new("Photosynthesis");
        let mut a = Activity::new("a1", "Leaf lab");
        a.duration_minutes = Some(30);
        plan.activities = Some(vec![a, Activity::new("a2", "Exit ticket")]);
        plan.vocabulary = Some(vec![VocabularyEntry {
            term: "Chlorophyll".into(),
            definition: Some("green pigment".into()),
        }]);
        plan
    }

    #[test]
    fn test_cognitive_level_rank_and_order() {
        assert_eq!(CognitiveLevel::Remember.rank(), 1);
        assert_eq!(CognitiveLevel::Create.rank(), 6);
        assert!(CognitiveLevel::Apply < CognitiveLevel::Analyze);
        assert!(CognitiveLevel::Understand.is_lower_order());
        assert!(!CognitiveLevel::Apply.is_lower_order());
    }

    #[test]
    fn test_defines_term_is_case_insensitive() {
        let plan = sample();
        assert!(plan.defines_term("chlorophyll "));
        assert!(!plan.defines_term("stomata"));
    }

    #[test]
    fn test_listed_term_without_definition_is_undefined() {
        let mut plan = sample();
        plan.vocabulary = Some(vec![
            VocabularyEntry {
                term: "stomata".into(),
                definition: None,
            },
            VocabularyEntry {
                term: "xylem".into(),
                definition: Some("  ".into()),
            },
        ]);
        assert!(plan.vocabulary_entry("Stomata").is_some());
        assert!(!plan.defines_term("stomata"));
        assert!(!plan.defines_term("xylem"));
    }

    #[test]
    fn test_missing_per_activity_field_reports_pointer() {
        let plan = sample();
        assert_eq!(
            plan.missing_field(ArtifactField::ActivityDurations),
            Some("/activities/1/duration_minutes".to_string())
        );
        assert_eq!(plan.missing_field(ArtifactField::Activities), None);
        assert_eq!(
            plan.missing_field(ArtifactField::Objectives),
            Some("/objectives".to_string())
        );
    }

    #[test]
    fn test_absent_activity_list_is_missing_everywhere() {
        let mut plan = sample();
        plan.activities = None;
        assert_eq!(
            plan.missing_field(ArtifactField::ActivityInstructions),
            Some("/activities".to_string())
        );
        assert!(plan.activities().is_empty());
    }

    #[test]
    fn test_lesson_serde_skips_absent_fields() {
        let plan = LessonPlan::new("Fractions");
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json.get("objectives").is_none());
        assert!(json.get("vocabulary").is_none());
        let back: LessonPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }
}
