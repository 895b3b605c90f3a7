//! Teacher decisions on proposed changes.
//!
//! Decisions arrive from outside (typically a decisions JSON file) and are
//! matched against the proposal's change ids. A decision on `conflict-N`
//! covers every `conflict-N.M` resolution; a decision on a specific
//! resolution overrides it. Conflicts marked `requires_teacher_decision`
//! are the exception: their sides are alternatives, so only a decision on
//! one `conflict-N.M` selects anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::synthesis::{ResolutionStrategy, RevisionProposal};

use super::applier::ApprovedChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    /// Leave for later; treated as not approved.
    Defer,
}

impl Decision {
    pub fn is_approval(self) -> bool {
        matches!(self, Self::Approve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherDecision {
    pub change_id: String,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl TeacherDecision {
    pub fn new(change_id: impl Into<String>, decision: Decision) -> Self {
        Self {
            change_id: change_id.into(),
            decision,
            comment: None,
            decided_at: None,
        }
    }

    pub fn approve(change_id: impl Into<String>) -> Self {
        Self::new(change_id, Decision::Approve)
    }
}

/// The approved subset of a proposal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApprovalSelection {
    /// In proposal order.
    pub approved: Vec<ApprovedChange>,
    /// Decision ids that match nothing in the proposal.
    pub unmatched: Vec<String>,
    /// Conflicts approved as a whole whose sides are alternatives; approve
    /// one `conflict-N.M` instead.
    pub needs_choice: Vec<String>,
}

fn parent_id(change_id: &str) -> Option<&str> {
    change_id
        .rsplit_once('.')
        .map(|(parent, _)| parent)
        .filter(|p| p.starts_with("conflict-"))
}

/// Select the changes `decisions` approve. Later decisions on the same id
/// win over earlier ones.
pub fn approved_changes(
    proposal: &RevisionProposal,
    decisions: &[TeacherDecision],
) -> ApprovalSelection {
    let lookup = |id: &str| {
        decisions
            .iter()
            .rev()
            .find(|d| d.change_id == id)
            .map(|d| d.decision)
    };

    let must_choose: Vec<&str> = proposal
        .conflicts
        .iter()
        .filter(|c| c.resolution_strategy == ResolutionStrategy::RequiresTeacherDecision)
        .map(|c| c.change_id.as_str())
        .collect();

    let changes = proposal.changes();
    let approved = changes
        .iter()
        .filter(|c| {
            let own = lookup(c.change_id);
            let inherited = parent_id(c.change_id)
                .filter(|p| !must_choose.contains(p))
                .and_then(|p| lookup(p));
            own.or(inherited).is_some_and(Decision::is_approval)
        })
        .map(|c| ApprovedChange {
            change_id: c.change_id.to_string(),
            directive: c.directive.clone(),
        })
        .collect();

    let known = |id: &str| {
        changes
            .iter()
            .any(|c| c.change_id == id || parent_id(c.change_id) == Some(id))
    };
    let mut unmatched: Vec<String> = Vec::new();
    let mut needs_choice: Vec<String> = Vec::new();
    for d in decisions {
        if !known(&d.change_id) {
            if !unmatched.contains(&d.change_id) {
                warn!(change = %d.change_id, "decision matches no proposed change");
                unmatched.push(d.change_id.clone());
            }
        } else if must_choose.contains(&d.change_id.as_str())
            && lookup(&d.change_id).is_some_and(Decision::is_approval)
            && !needs_choice.contains(&d.change_id)
        {
            warn!(change = %d.change_id, "conflict needs one side approved, not both");
            needs_choice.push(d.change_id.clone());
        }
    }

    ApprovalSelection {
        approved,
        unmatched,
        needs_choice,
    }
}
