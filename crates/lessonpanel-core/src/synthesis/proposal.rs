//! The revision proposal and the synthesis pass that builds it.
//!
//! Synthesis is a pure function of the report set and config: the same
//! reports always yield the same proposal, change ids included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Concern, Criterion, Directive, FeedbackReport, Severity, SupportTier};
use crate::obs;

use super::agreement::{group_candidates, merge_directives};
use super::conflict::{build_conflict, find_conflicts, ResolutionStrategy, Stance};

pub const DEFAULT_AGREEMENT_THRESHOLD: usize = 3;
pub const DEFAULT_KEY_PREFIX_LEN: usize = 48;

/// Tags listed first, in this order, when the config names none.
pub const DEFAULT_CATEGORY_ORDER: [&str; 4] = [
    "accessibility_critical",
    "language_access",
    "engagement",
    "enrichment",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Distinct profiles needed for a universal improvement.
    pub agreement_threshold: usize,
    /// Characters of normalized change text compared for agreement.
    pub key_prefix_len: usize,
    pub category_order: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            agreement_threshold: DEFAULT_AGREEMENT_THRESHOLD,
            key_prefix_len: DEFAULT_KEY_PREFIX_LEN,
            category_order: DEFAULT_CATEGORY_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A concern together with the profile that raised it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedConcern {
    pub profile_id: String,
    pub concern: Concern,
}

/// A change enough profiles independently asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalImprovement {
    pub change_id: String,
    pub element: String,
    /// Highest severity in the group.
    pub severity: Severity,
    pub change: String,
    pub rationale: String,
    /// Distinct contributors, in report order.
    pub profile_ids: Vec<String>,
    pub criteria: Vec<Criterion>,
    pub implementation: Directive,
    pub concerns: Vec<AttributedConcern>,
}

/// One proposed change filed under its profile's priority tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedChange {
    pub change_id: String,
    pub profile_id: String,
    pub concern: Concern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityCategory {
    pub tag: String,
    pub changes: Vec<CategorizedChange>,
}

/// One side of a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpposingConcern {
    pub profile_id: String,
    pub priority_tag: String,
    pub stance: Stance,
    pub concern: Concern,
}

/// A directive that resolves a conflict while keeping one side's intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionChange {
    /// `conflict-N.M`.
    pub change_id: String,
    pub profile_id: String,
    /// `None` when the side's directive is offered as proposed, untiered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SupportTier>,
    pub directive: Directive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub change_id: String,
    pub element: String,
    pub opposing_concerns: [OpposingConcern; 2],
    pub resolution_strategy: ResolutionStrategy,
    pub teacher_note: String,
    /// Under `requires_teacher_decision`, each side as proposed, for the
    /// teacher to pick between.
    pub resolution: Vec<ResolutionChange>,
}

/// Every profile's feedback merged into one prioritized plan of changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RevisionProposal {
    pub universal_improvements: Vec<UniversalImprovement>,
    pub priority_categories: Vec<PriorityCategory>,
    pub conflicts: Vec<Conflict>,
}

/// A change the teacher can approve, flattened from a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedChange<'a> {
    pub change_id: &'a str,
    pub directive: &'a Directive,
}

impl RevisionProposal {
    pub fn is_empty(&self) -> bool {
        self.universal_improvements.is_empty()
            && self.priority_categories.is_empty()
            && self.conflicts.is_empty()
    }

    /// Every individually approvable change, in proposal order.
    pub fn changes(&self) -> Vec<ProposedChange<'_>> {
        let universal = self.universal_improvements.iter().map(|u| ProposedChange {
            change_id: &u.change_id,
            directive: &u.implementation,
        });
        let categorized = self
            .priority_categories
            .iter()
            .flat_map(|c| c.changes.iter())
            .map(|c| ProposedChange {
                change_id: &c.change_id,
                directive: &c.concern.recommendation.implementation,
            });
        let resolved = self
            .conflicts
            .iter()
            .flat_map(|c| c.resolution.iter())
            .map(|r| ProposedChange {
                change_id: &r.change_id,
                directive: &r.directive,
            });
        universal.chain(categorized).chain(resolved).collect()
    }
}

/// A concern flattened out of its report.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub profile_id: &'a str,
    pub priority_tag: &'a str,
    pub concern: &'a Concern,
}

/// Merge `reports` into one proposal.
///
/// Output order is fixed: universal improvements (highest severity first),
/// priority categories, conflicts.
pub fn synthesize(reports: &[FeedbackReport], config: &SynthesisConfig) -> RevisionProposal {
    let candidates: Vec<Candidate<'_>> = reports
        .iter()
        .flat_map(|r| {
            r.concerns.iter().map(move |c| Candidate {
                profile_id: &r.profile_id,
                priority_tag: &r.priority_tag,
                concern: c,
            })
        })
        .collect();

    let mut consumed = vec![false; candidates.len()];

    // Agreement.
    let threshold = config.agreement_threshold.max(1);
    let mut universal = Vec::new();
    for group in group_candidates(&candidates, config.key_prefix_len) {
        if group.profiles.len() < threshold {
            continue;
        }
        for &idx in &group.members {
            consumed[idx] = true;
        }
        let improvement = universal_from_group(&candidates, &group.members, group.profiles);
        universal.push(improvement);
    }
    universal.sort_by(|a: &UniversalImprovement, b| b.severity.cmp(&a.severity));
    for (n, u) in universal.iter_mut().enumerate() {
        u.change_id = format!("universal-{}", n + 1);
    }

    // Conflicts.
    let eligible: Vec<bool> = consumed.iter().map(|c| !c).collect();
    let mut conflicts = Vec::new();
    let pairs = find_conflicts(&candidates, &eligible);
    for (n, (i, j, si, sj)) in pairs.into_iter().enumerate() {
        consumed[i] = true;
        consumed[j] = true;
        conflicts.push(build_conflict(
            format!("conflict-{}", n + 1),
            (&candidates[i], si),
            (&candidates[j], sj),
        ));
    }

    // Categories.
    let mut by_tag: BTreeMap<&str, Vec<&Candidate<'_>>> = BTreeMap::new();
    for (idx, c) in candidates.iter().enumerate() {
        if !consumed[idx] {
            by_tag.entry(c.priority_tag).or_default().push(c);
        }
    }
    let mut priority_categories = Vec::new();
    for tag in &config.category_order {
        if let Some(members) = by_tag.remove(tag.as_str()) {
            priority_categories.push(category(tag, members));
        }
    }
    // Remaining tags come out of the BTreeMap alphabetically.
    for (tag, members) in by_tag {
        priority_categories.push(category(tag, members));
    }

    obs::emit_synthesis_completed(universal.len(), priority_categories.len(), conflicts.len());

    RevisionProposal {
        universal_improvements: universal,
        priority_categories,
        conflicts,
    }
}

fn universal_from_group(
    candidates: &[Candidate<'_>],
    members: &[usize],
    profile_ids: Vec<String>,
) -> UniversalImprovement {
    let concerns: Vec<&Candidate<'_>> = members.iter().map(|&i| &candidates[i]).collect();
    let lead = concerns[0].concern;

    let severity = concerns
        .iter()
        .map(|c| c.concern.severity)
        .max()
        .unwrap_or(lead.severity);
    let mut criteria = Vec::new();
    for c in &concerns {
        if !criteria.contains(&c.concern.criterion) {
            criteria.push(c.concern.criterion);
        }
    }
    let directives: Vec<&Directive> = concerns
        .iter()
        .map(|c| &c.concern.recommendation.implementation)
        .collect();

    UniversalImprovement {
        change_id: String::new(),
        element: lead.element.clone(),
        severity,
        change: lead.recommendation.change.clone(),
        rationale: lead.recommendation.rationale.clone(),
        profile_ids,
        criteria,
        implementation: merge_directives(&directives)
            .unwrap_or_else(|| lead.recommendation.implementation.clone()),
        concerns: concerns
            .iter()
            .map(|c| AttributedConcern {
                profile_id: c.profile_id.to_string(),
                concern: c.concern.clone(),
            })
            .collect(),
    }
}

fn category(tag: &str, mut members: Vec<&Candidate<'_>>) -> PriorityCategory {
    // Stable: equal severities keep report order.
    members.sort_by(|a, b| b.concern.severity.cmp(&a.concern.severity));
    PriorityCategory {
        tag: tag.to_string(),
        changes: members
            .into_iter()
            .enumerate()
            .map(|(n, c)| CategorizedChange {
                change_id: format!("{tag}-{}", n + 1),
                profile_id: c.profile_id.to_string(),
                concern: c.concern.clone(),
            })
            .collect(),
    }
}
