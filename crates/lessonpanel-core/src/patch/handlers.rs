//! Per-element patch handlers.
//!
//! Handlers only insert or restructure; none removes lesson content. Each
//! handler validates its target before touching the plan, so a failed
//! directive leaves the plan exactly as it was.

use crate::domain::{
    Activity, Directive, InstructionsDirective, LessonPlan, PacingCheckpoint, PacingDirective,
    Scaffold, ScaffoldingDirective, VocabularyDirective,
};

use tracing::warn;

use super::error::ApplyError;

/// Upper bound on checkpoints one pacing directive may insert.
pub const MAX_NEW_CHECKPOINTS: usize = 1_000;

/// Result of handling one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Applied,
    ManualReview,
    Failed(ApplyError),
}

/// Apply `directive` to `plan` in place.
pub fn apply_directive(plan: &mut LessonPlan, directive: &Directive) -> HandlerOutcome {
    let result = match directive {
        Directive::Vocabulary(d) => {
            add_vocabulary(plan, d);
            Ok(())
        }
        Directive::Scaffolding(d) => add_scaffolds(plan, d),
        Directive::Pacing(d) => add_checkpoints(plan, d),
        Directive::Instructions(d) => add_sub_steps(plan, d),
        Directive::Generic { .. } => return HandlerOutcome::ManualReview,
    };
    match result {
        Ok(()) => HandlerOutcome::Applied,
        Err(e) => HandlerOutcome::Failed(e),
    }
}

fn activity_mut<'a>(plan: &'a mut LessonPlan, id: &str) -> Result<&'a mut Activity, ApplyError> {
    plan.activities
        .as_mut()
        .and_then(|acts| acts.iter_mut().find(|a| a.id == id))
        .ok_or_else(|| ApplyError::UnknownActivity(id.to_string()))
}

/// Append terms not already listed; creates the vocabulary list if absent.
/// A listed term with no definition takes the directive's definition, if any.
fn add_vocabulary(plan: &mut LessonPlan, d: &VocabularyDirective) {
    for entry in &d.entries {
        let needle = entry.term.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let vocabulary = plan.vocabulary.get_or_insert_with(Vec::new);
        match vocabulary
            .iter_mut()
            .find(|v| v.term.trim().to_lowercase() == needle)
        {
            Some(existing) => {
                let blank = existing
                    .definition
                    .as_deref()
                    .map_or(true, |def| def.trim().is_empty());
                if blank && entry.definition.is_some() {
                    existing.definition = entry.definition.clone();
                }
            }
            None => vocabulary.push(entry.clone()),
        }
    }
}

fn add_scaffolds(plan: &mut LessonPlan, d: &ScaffoldingDirective) -> Result<(), ApplyError> {
    let activity = activity_mut(plan, &d.activity_id)?;
    for text in &d.entries {
        let exists = activity
            .scaffolds
            .iter()
            .any(|s| s.tier == d.tier && s.text == *text);
        if !exists {
            activity.scaffolds.push(Scaffold {
                text: text.clone(),
                tier: d.tier,
            });
        }
    }
    Ok(())
}

/// Checkpoints at every multiple of the interval strictly inside the
/// activity's duration, at most [`MAX_NEW_CHECKPOINTS`] of them. Existing
/// checkpoints are kept; the list stays sorted by minute.
fn add_checkpoints(plan: &mut LessonPlan, d: &PacingDirective) -> Result<(), ApplyError> {
    if d.interval_minutes == 0 {
        return Err(ApplyError::ZeroInterval);
    }
    let activity = activity_mut(plan, &d.activity_id)?;
    let duration = activity
        .duration_minutes
        .ok_or_else(|| ApplyError::MissingDuration(d.activity_id.clone()))?;

    let mut next = Some(d.interval_minutes);
    let mut added = 0;
    while let Some(minute) = next.filter(|m| *m < duration) {
        if added == MAX_NEW_CHECKPOINTS {
            warn!(
                activity = %d.activity_id,
                limit = MAX_NEW_CHECKPOINTS,
                "checkpoint limit reached"
            );
            break;
        }
        if !activity
            .pacing_checkpoints
            .iter()
            .any(|c| c.at_minute == minute)
        {
            activity.pacing_checkpoints.push(PacingCheckpoint {
                at_minute: minute,
                note: d.note.clone(),
            });
            added += 1;
        }
        next = minute.checked_add(d.interval_minutes);
    }
    activity.pacing_checkpoints.sort_by_key(|c| c.at_minute);
    Ok(())
}

fn add_sub_steps(plan: &mut LessonPlan, d: &InstructionsDirective) -> Result<(), ApplyError> {
    let activity = activity_mut(plan, &d.activity_id)?;
    let steps = activity
        .instructions
        .as_mut()
        .ok_or_else(|| ApplyError::MissingInstructions(d.activity_id.clone()))?;
    let len = steps.len();
    let step = steps
        .get_mut(d.step_index)
        .ok_or_else(|| ApplyError::StepOutOfRange {
            activity_id: d.activity_id.clone(),
            step_index: d.step_index,
            len,
        })?;
    for sub in &d.sub_steps {
        if !step.sub_steps.contains(sub) {
            step.sub_steps.push(sub.clone());
        }
    }
    Ok(())
}
