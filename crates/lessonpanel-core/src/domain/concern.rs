//! Concerns and feedback reports.

use serde::{Deserialize, Serialize};

use super::criterion::Criterion;
use super::directive::Directive;

/// Ordinal severity assigned by rule-based thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Where in the lesson a finding was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// RFC 6901 JSON pointer into the lesson plan.
    pub field_path: String,
    pub observed: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub change: String,
    pub rationale: String,
    pub implementation: Directive,
}

/// One profile's objection to one lesson element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concern {
    pub criterion: Criterion,
    pub severity: Severity,
    /// Targeted lesson element: `activity:<id>` or `lesson`.
    pub element: String,
    pub issue: String,
    pub evidence: Evidence,
    pub recommendation: Recommendation,
}

/// Why a criterion produced no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncompleteReason {
    MissingField { field_path: String },
    Timeout { after_ms: u64 },
    ProbeFailed { detail: String },
}

impl std::fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field_path } => write!(f, "missing field {field_path}"),
            Self::Timeout { after_ms } => write!(f, "semantic check timed out after {after_ms}ms"),
            Self::ProbeFailed { detail } => write!(f, "semantic check failed: {detail}"),
        }
    }
}

/// Marker for one criterion skipped during one profile's evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationIncomplete {
    pub criterion: Criterion,
    pub reason: IncompleteReason,
}

/// One profile's feedback on one lesson version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub profile_id: String,
    pub display_name: String,
    pub priority_tag: String,
    /// 1–5, derived from `concerns` by [`compute_rating`].
    pub rating: u8,
    pub strengths: Vec<String>,
    pub concerns: Vec<Concern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete: Vec<EvaluationIncomplete>,
}

impl FeedbackReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.concerns
            .iter()
            .filter(|c| c.severity == severity)
            .count()
    }
}

/// Rating from concern severities.
///
/// Starts at 5, loses 2 per high and 1 per medium concern, floored at 1. A
/// report with no high concern and at most one medium concern stays at 5.
/// Low concerns never affect the rating.
pub fn compute_rating(concerns: &[Concern]) -> u8 {
    let high = concerns
        .iter()
        .filter(|c| c.severity == Severity::High)
        .count();
    let medium = concerns
        .iter()
        .filter(|c| c.severity == Severity::Medium)
        .count();

    if high == 0 && medium <= 1 {
        return 5;
    }

    let penalty = high * 2 + medium;
    5usize.saturating_sub(penalty).max(1) as u8
}
