//! Structured lifecycle events for review runs.
//!
//! Each `emit_*` function logs one event with a stable `event` field so log
//! pipelines can filter on it. [`ReviewSpan`] scopes everything logged during
//! one orchestration run under its run id.

use tracing::{info, warn};

use crate::domain::{Criterion, IncompleteReason};

/// RAII guard that enters a run-scoped span.
///
/// ```ignore
/// let _span = ReviewSpan::enter(&run_id, &lesson_digest);
/// ```
pub struct ReviewSpan {
    _span: tracing::span::EnteredSpan,
}

impl ReviewSpan {
    pub fn enter(run_id: &str, lesson_digest: &str) -> Self {
        let span = tracing::info_span!(
            "lessonpanel.review",
            run_id = %run_id,
            lesson = %lesson_digest
        );
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_review_started(run_id: &str, profiles: usize) {
    info!(event = "review.started", run_id = %run_id, profiles = profiles);
}

pub fn emit_review_finished(run_id: &str, reports: usize, skipped: usize, cancelled: bool) {
    info!(
        event = "review.finished",
        run_id = %run_id,
        reports = reports,
        skipped = skipped,
        cancelled = cancelled,
    );
}

pub fn emit_profile_evaluated(profile_id: &str, rating: u8, concerns: usize, incomplete: usize) {
    info!(
        event = "profile.evaluated",
        profile = %profile_id,
        rating = rating,
        concerns = concerns,
        incomplete = incomplete,
    );
}

/// Warning level: a profile produced no report.
pub fn emit_profile_skipped(profile: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "profile.skipped", profile = %profile, reason = %reason);
}

pub fn emit_criterion_incomplete(
    profile_id: &str,
    criterion: Criterion,
    reason: &IncompleteReason,
) {
    info!(
        event = "criterion.incomplete",
        profile = %profile_id,
        criterion = %criterion,
        reason = %reason,
    );
}

pub fn emit_synthesis_completed(universal: usize, categories: usize, conflicts: usize) {
    info!(
        event = "synthesis.completed",
        universal = universal,
        categories = categories,
        conflicts = conflicts,
    );
}

pub fn emit_patch_applied(
    base_digest: &str,
    digest: &str,
    applied: usize,
    manual_review: usize,
    failed: usize,
) {
    info!(
        event = "patch.applied",
        base = %base_digest,
        digest = %digest,
        applied = applied,
        manual_review = manual_review,
        failed = failed,
    );
}
