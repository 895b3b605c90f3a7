//! Criterion identifiers.
//!
//! Profiles name criteria by string id; the id is parsed into [`Criterion`]
//! once at load time so an unknown id fails the profile instead of silently
//! evaluating nothing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lesson::ArtifactField;

/// One named axis of evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    VocabularyAccessibility,
    InstructionClarity,
    ScaffoldingSupport,
    ChallengeLevel,
    ContentDepth,
    Pacing,
    CognitiveRigor,
    CognitiveDistribution,
    EngagementVariety,
}

impl Criterion {
    pub const ALL: [Criterion; 9] = [
        Criterion::VocabularyAccessibility,
        Criterion::InstructionClarity,
        Criterion::ScaffoldingSupport,
        Criterion::ChallengeLevel,
        Criterion::ContentDepth,
        Criterion::Pacing,
        Criterion::CognitiveRigor,
        Criterion::CognitiveDistribution,
        Criterion::EngagementVariety,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VocabularyAccessibility => "vocabulary_accessibility",
            Self::InstructionClarity => "instruction_clarity",
            Self::ScaffoldingSupport => "scaffolding_support",
            Self::ChallengeLevel => "challenge_level",
            Self::ContentDepth => "content_depth",
            Self::Pacing => "pacing",
            Self::CognitiveRigor => "cognitive_rigor",
            Self::CognitiveDistribution => "cognitive_distribution",
            Self::EngagementVariety => "engagement_variety",
        }
    }

    /// Human-readable label used in default strength lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::VocabularyAccessibility => "Vocabulary accessibility",
            Self::InstructionClarity => "Instruction clarity",
            Self::ScaffoldingSupport => "Scaffolding support",
            Self::ChallengeLevel => "Challenge level",
            Self::ContentDepth => "Content depth",
            Self::Pacing => "Pacing",
            Self::CognitiveRigor => "Cognitive rigor",
            Self::CognitiveDistribution => "Cognitive distribution",
            Self::EngagementVariety => "Engagement variety",
        }
    }

    /// Lesson fields this criterion's detector reads.
    pub fn required_fields(self) -> &'static [ArtifactField] {
        match self {
            Self::VocabularyAccessibility
            | Self::ScaffoldingSupport
            | Self::ChallengeLevel
            | Self::EngagementVariety => &[ArtifactField::Activities],
            Self::InstructionClarity => &[ArtifactField::ActivityInstructions],
            Self::ContentDepth => &[ArtifactField::ActivityCognitiveLevels],
            Self::Pacing => &[ArtifactField::ActivityDurations],
            Self::CognitiveRigor | Self::CognitiveDistribution => &[ArtifactField::Objectives],
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown criterion: {s}"))
    }
}
