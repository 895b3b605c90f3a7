//! Profile definitions: the declarative shape of one evaluator persona.
//!
//! [`ProfileDefinition`] is what a profile file deserializes into (criterion
//! ids are plain strings). [`EvaluatorProfile`] is the validated, immutable
//! form the evaluator consumes, with every criterion id parsed and every
//! listed criterion guaranteed to have a decision rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Criterion, Severity, SupportTier};

use super::error::{ProfileError, ProfileResult};

/// Which side of the thresholds counts as a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Larger measurements are worse (e.g. undefined term count).
    #[default]
    AtLeast,
    /// Smaller measurements are worse (e.g. scaffold count).
    AtMost,
}

/// Severity cut-offs for one criterion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeverityThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
}

impl SeverityThresholds {
    /// Highest severity whose threshold `value` crosses, if any.
    pub fn classify(&self, value: f64, comparison: Comparison) -> Option<Severity> {
        let crosses = |threshold: Option<f64>| match (threshold, comparison) {
            (Some(t), Comparison::AtLeast) => value >= t,
            (Some(t), Comparison::AtMost) => value <= t,
            (None, _) => false,
        };

        if crosses(self.high) {
            Some(Severity::High)
        } else if crosses(self.medium) {
            Some(Severity::Medium)
        } else if crosses(self.low) {
            Some(Severity::Low)
        } else {
            None
        }
    }

    fn validate(
        &self,
        profile_id: &str,
        criterion: Criterion,
        cmp: Comparison,
    ) -> ProfileResult<()> {
        let levels: Vec<f64> = [self.high, self.medium, self.low]
            .into_iter()
            .flatten()
            .collect();
        if levels.is_empty() {
            return Err(ProfileError::config(
                profile_id,
                format!("rule {criterion} defines no severity thresholds"),
            ));
        }
        if levels.iter().any(|v| !v.is_finite()) {
            return Err(ProfileError::config(
                profile_id,
                format!("rule {criterion} has a non-finite threshold"),
            ));
        }
        // high must be the hardest level to reach.
        let ordered = levels.windows(2).all(|w| match cmp {
            Comparison::AtLeast => w[0] >= w[1],
            Comparison::AtMost => w[0] <= w[1],
        });
        if !ordered {
            return Err(ProfileError::config(
                profile_id,
                format!("rule {criterion} thresholds are out of order for {cmp:?}"),
            ));
        }
        Ok(())
    }
}

/// Conditions under which a rule fires at all.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub comparison: Comparison,
    /// Activity modalities the rule applies to; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modalities: Vec<String>,
    /// Cap on concerns this rule may emit per evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concerns: Option<usize>,
}

impl TriggerConditions {
    pub fn admits_modality(&self, modality: Option<&str>) -> bool {
        if self.modalities.is_empty() {
            return true;
        }
        modality.is_some_and(|m| {
            self.modalities
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(m))
        })
    }
}

/// Text and payload hints for the recommendation a rule produces.
///
/// Placeholders: `{activity}`, `{activity_id}`, `{value}`, `{terms}`, `{criterion}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTemplate {
    pub change: String,
    pub rationale: String,
    /// Overrides the detector's default issue sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    /// Scaffold / pacing note text placed into the directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SupportTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    #[serde(default)]
    pub trigger: TriggerConditions,
    pub thresholds: SeverityThresholds,
    pub recommendation: RecommendationTemplate,
    /// Strength line reported when the criterion raises no concern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
}

/// A profile as written in a profile file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub characteristics: BTreeMap<String, serde_json::Value>,
    pub evaluation_criteria: Vec<String>,
    #[serde(default)]
    pub decision_rules: BTreeMap<String, DecisionRule>,
    pub priority_tag: String,
}

/// A validated, immutable evaluator profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorProfile {
    pub id: String,
    pub display_name: String,
    pub characteristics: BTreeMap<String, serde_json::Value>,
    pub evaluation_criteria: Vec<Criterion>,
    pub decision_rules: BTreeMap<Criterion, DecisionRule>,
    pub priority_tag: String,
}

impl EvaluatorProfile {
    /// The rule for a listed criterion. Validation guarantees presence.
    pub fn rule(&self, criterion: Criterion) -> Option<&DecisionRule> {
        self.decision_rules.get(&criterion)
    }
}

impl TryFrom<ProfileDefinition> for EvaluatorProfile {
    type Error = ProfileError;

    fn try_from(def: ProfileDefinition) -> ProfileResult<Self> {
        let id = def.id.trim().to_string();
        if id.is_empty() {
            return Err(ProfileError::config("<unnamed>", "profile id is empty"));
        }
        let priority_tag = def.priority_tag.trim().to_string();
        if priority_tag.is_empty() {
            return Err(ProfileError::config(&id, "priority_tag is empty"));
        }
        if def.evaluation_criteria.is_empty() {
            return Err(ProfileError::config(&id, "evaluation_criteria is empty"));
        }

        let mut rules_by_criterion = BTreeMap::new();
        for (key, rule) in def.decision_rules {
            let criterion: Criterion = key
                .parse()
                .map_err(|e: String| ProfileError::config(&id, format!("decision_rules: {e}")))?;
            rules_by_criterion.insert(criterion, rule);
        }

        let mut criteria = Vec::with_capacity(def.evaluation_criteria.len());
        let mut decision_rules = BTreeMap::new();
        for raw in &def.evaluation_criteria {
            let criterion: Criterion = raw
                .parse()
                .map_err(|e: String| ProfileError::config(&id, e))?;
            if criteria.contains(&criterion) {
                return Err(ProfileError::config(
                    &id,
                    format!("criterion {criterion} listed twice"),
                ));
            }
            let rule = rules_by_criterion.remove(&criterion).ok_or_else(|| {
                ProfileError::config(&id, format!("criterion {criterion} has no decision rule"))
            })?;
            rule.thresholds
                .validate(&id, criterion, rule.trigger.comparison)?;
            if rule.recommendation.change.trim().is_empty() {
                return Err(ProfileError::config(
                    &id,
                    format!("rule {criterion} has an empty change template"),
                ));
            }
            if rule.recommendation.interval_minutes == Some(0) {
                return Err(ProfileError::config(
                    &id,
                    format!("rule {criterion} has a zero pacing interval"),
                ));
            }
            criteria.push(criterion);
            decision_rules.insert(criterion, rule);
        }

        for unused in rules_by_criterion.keys() {
            tracing::debug!(
                profile = %id,
                criterion = %unused,
                "decision rule not listed in evaluation_criteria; ignored"
            );
        }

        Ok(Self {
            display_name: def
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| id.clone()),
            id,
            characteristics: def.characteristics,
            evaluation_criteria: criteria,
            decision_rules,
            priority_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(high: f64, medium: f64, low: f64) -> SeverityThresholds {
        SeverityThresholds {
            high: Some(high),
            medium: Some(medium),
            low: Some(low),
        }
    }

    #[test]
    fn test_classify_at_least() {
        let t = thresholds(3.0, 2.0, 1.0);
        assert_eq!(t.classify(4.0, Comparison::AtLeast), Some(Severity::High));
        assert_eq!(t.classify(3.0, Comparison::AtLeast), Some(Severity::High));
        assert_eq!(t.classify(2.0, Comparison::AtLeast), Some(Severity::Medium));
        assert_eq!(t.classify(1.0, Comparison::AtLeast), Some(Severity::Low));
        assert_eq!(t.classify(0.0, Comparison::AtLeast), None);
    }

    #[test]
    fn test_classify_at_most() {
        let t = thresholds(0.0, 1.0, 2.0);
        assert_eq!(t.classify(0.0, Comparison::AtMost), Some(Severity::High));
        assert_eq!(t.classify(1.0, Comparison::AtMost), Some(Severity::Medium));
        assert_eq!(t.classify(3.0, Comparison::AtMost), None);
    }

    #[test]
    fn test_classify_with_gaps() {
        let t = SeverityThresholds {
            high: Some(5.0),
            medium: None,
            low: None,
        };
        assert_eq!(t.classify(4.0, Comparison::AtLeast), None);
        assert_eq!(t.classify(5.0, Comparison::AtLeast), Some(Severity::High));
    }

    #[test]
    fn test_threshold_order_is_validated() {
        let t = thresholds(1.0, 2.0, 3.0);
        let pacing = Criterion::Pacing;
        assert!(t.validate("p", pacing, Comparison::AtLeast).is_err());
        assert!(t.validate("p", pacing, Comparison::AtMost).is_ok());
        let empty = SeverityThresholds::default();
        assert!(empty.validate("p", pacing, Comparison::AtLeast).is_err());
    }

    #[test]
    fn test_modality_filter() {
        let mut t = TriggerConditions::default();
        assert!(t.admits_modality(None));
        t.modalities = vec!["lecture".into()];
        assert!(t.admits_modality(Some("Lecture")));
        assert!(!t.admits_modality(Some("discussion")));
        assert!(!t.admits_modality(None));
    }
}
