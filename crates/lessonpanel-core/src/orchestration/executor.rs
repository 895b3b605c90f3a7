//! Bounded-parallel orchestration on tokio.
//!
//! Profiles share one read-only `Arc<LessonPlan>` and nothing else, so they
//! can run in any order. A semaphore caps concurrency; a [`CancelHandle`]
//! stops profiles that have not started and discards reports from those that
//! were still running when it fired.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{instrument, warn};

use crate::domain::{lesson_digest, FeedbackReport, LessonPlan};
use crate::evaluator::{evaluate_with_checks, SemanticChecks};
use crate::obs;
use crate::profiles::ProfileSlot;

use super::error::OrchestrationResult;
use super::runner::{loaded, OrchestrationRun, SkippedProfile};
use super::schema::validate_schema;

/// Configuration for a parallel evaluation batch.
#[derive(Debug, Clone)]
pub struct ParallelEvalConfig {
    /// Maximum number of profiles evaluated at once.
    pub max_concurrent: usize,
    pub checks: SemanticChecks,
}

impl Default for ParallelEvalConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            checks: SemanticChecks::default(),
        }
    }
}

/// Cooperative cancellation for a parallel run. Clones share one flag.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolves once the flag is set. Never resolves if the sender is gone.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

enum SlotOutcome {
    Report(FeedbackReport),
    Skipped(SkippedProfile),
}

/// Evaluate every loaded profile in `slots` concurrently.
///
/// Reports keep slot order regardless of completion order. After
/// cancellation the run is returned with `cancelled = true` and every
/// profile without a kept report listed as skipped.
#[instrument(skip_all, fields(profiles = slots.len(), max_concurrent = config.max_concurrent))]
pub async fn execute_profiles_parallel(
    slots: Vec<ProfileSlot>,
    plan: Arc<LessonPlan>,
    config: ParallelEvalConfig,
    cancel: CancelHandle,
) -> OrchestrationResult<OrchestrationRun> {
    validate_schema(&plan, loaded(&slots))?;

    let mut run = OrchestrationRun::start(lesson_digest(&plan)?);
    obs::emit_review_started(&run.run_id, slots.len());

    let sem = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(slots.len());

    for slot in slots {
        let profile = match slot {
            ProfileSlot::Loaded(p) => p,
            ProfileSlot::Failed(failure) => {
                tasks.push(Err(SkippedProfile::from_failure(&failure)));
                continue;
            }
        };
        let plan = Arc::clone(&plan);
        let sem = Arc::clone(&sem);
        let checks = config.checks.clone();
        let cancel = cancel.clone();
        let profile_id = profile.id.clone();

        let task = tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();

            if cancel.is_cancelled() {
                return SlotOutcome::Skipped(SkippedProfile::profile(
                    &profile.id,
                    "cancelled before evaluation started",
                ));
            }

            tokio::select! {
                report = evaluate_with_checks(&profile, &plan, &checks) => {
                    if cancel.is_cancelled() {
                        SlotOutcome::Skipped(SkippedProfile::profile(
                            &profile.id,
                            "cancelled; report discarded",
                        ))
                    } else {
                        SlotOutcome::Report(report)
                    }
                }
                _ = cancelled(cancel.subscribe()) => {
                    SlotOutcome::Skipped(SkippedProfile::profile(
                        &profile.id,
                        "cancelled during evaluation",
                    ))
                }
            }
        });
        tasks.push(Ok((profile_id, task)));
    }

    for task in tasks {
        match task {
            Err(skipped) => run.record_skip(skipped),
            Ok((profile_id, handle)) => match handle.await {
                Ok(SlotOutcome::Report(report)) => run.record_report(report),
                Ok(SlotOutcome::Skipped(skipped)) => run.record_skip(skipped),
                Err(e) => {
                    warn!(profile = %profile_id, error = %e, "evaluation task failed");
                    run.record_skip(SkippedProfile::profile(
                        &profile_id,
                        format!("evaluation task failed: {e}"),
                    ));
                }
            },
        }
    }

    run.cancelled = cancel.is_cancelled();
    Ok(run.finish())
}
