//! Parallel evaluation: ordering, cancellation and bounded semantic checks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lessonpanel_core::domain::{Activity, Criterion, IncompleteReason, LessonPlan};
use lessonpanel_core::evaluator::{evaluate_with_checks, Finding, SemanticCheck, SemanticChecks};
use lessonpanel_core::orchestration::{
    evaluate_all, execute_profiles_parallel, CancelHandle, OrchestrationError, ParallelEvalConfig,
};
use lessonpanel_core::profiles::{ProfileFormat, ProfileSlot, ProfileStore};

fn lesson() -> LessonPlan {
    let mut plan = LessonPlan::new("Ratios");
    let mut a = Activity::new("warmup", "Ratio tables");
    a.key_terms = vec!["ratio".into(), "rate".into(), "unit rate".into()];
    a.duration_minutes = Some(20);
    a.modality = Some("discussion".into());
    plan.activities = Some(vec![a]);
    plan
}

fn vocab_toml(id: &str) -> String {
    format!(
        r#"
id = "{id}"
priority_tag = "language_access"
evaluation_criteria = ["vocabulary_accessibility"]

[decision_rules.vocabulary_accessibility.thresholds]
high = 3
low = 1

[decision_rules.vocabulary_accessibility.recommendation]
change = "Add definitions for {{terms}}"
rationale = "Undefined terms"
"#
    )
}

fn store(ids: &[&str]) -> ProfileStore {
    let mut store = ProfileStore::new();
    for id in ids {
        store.insert_str(&format!("{id}.toml"), &vocab_toml(id), ProfileFormat::Toml);
    }
    store
}

/// Never finishes; reports each call on `started`.
struct StallingCheck {
    started: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl SemanticCheck for StallingCheck {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn check(
        &self,
        _plan: &LessonPlan,
        _criterion: Criterion,
    ) -> anyhow::Result<Vec<Finding>> {
        let _ = self.started.send(());
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

struct FailingCheck;

#[async_trait]
impl SemanticCheck for FailingCheck {
    fn name(&self) -> &str {
        "failing"
    }

    async fn check(
        &self,
        _plan: &LessonPlan,
        _criterion: Criterion,
    ) -> anyhow::Result<Vec<Finding>> {
        anyhow::bail!("model unavailable")
    }
}

#[tokio::test]
async fn test_parallel_reports_keep_profile_order() {
    let mut store = store(&["p1", "p2", "p3", "p4", "p5"]);
    store.insert_str("broken.toml", "id = ", ProfileFormat::Toml);

    let config = ParallelEvalConfig {
        max_concurrent: 2,
        ..ParallelEvalConfig::default()
    };
    let run = execute_profiles_parallel(
        store.slots().to_vec(),
        Arc::new(lesson()),
        config,
        CancelHandle::new(),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = run.reports.iter().map(|r| r.profile_id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].source.as_deref(), Some("broken.toml"));
    assert!(!run.cancelled);

    // Same reports as the sequential path.
    let sequential = evaluate_all(store.slots(), &lesson()).unwrap();
    assert_eq!(sequential.reports, run.reports);
}

#[tokio::test]
async fn test_cancel_before_start_skips_every_profile() {
    let store = store(&["p1", "p2"]);
    let cancel = CancelHandle::new();
    cancel.cancel();

    let run = execute_profiles_parallel(
        store.slots().to_vec(),
        Arc::new(lesson()),
        ParallelEvalConfig::default(),
        cancel,
    )
    .await
    .unwrap();

    assert!(run.cancelled);
    assert!(!run.is_complete());
    assert!(run.reports.is_empty());
    assert_eq!(run.skipped.len(), 2);
    assert!(run.skipped.iter().all(|s| s.reason.contains("cancelled")));
}

#[tokio::test]
async fn test_cancel_during_evaluation_keeps_partial_results() {
    let store = store(&["p1"]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let checks = SemanticChecks::new(Duration::from_secs(3600)).with(
        Criterion::VocabularyAccessibility,
        Arc::new(StallingCheck { started: tx }),
    );
    let config = ParallelEvalConfig {
        max_concurrent: 1,
        checks,
    };
    let cancel = CancelHandle::new();

    let handle = tokio::spawn(execute_profiles_parallel(
        store.slots().to_vec(),
        Arc::new(lesson()),
        config,
        cancel.clone(),
    ));
    rx.recv().await.unwrap();
    cancel.cancel();

    let run = handle.await.unwrap().unwrap();
    assert!(run.cancelled);
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].profile_id.as_deref(), Some("p1"));
    assert_eq!(run.skipped[0].reason, "cancelled during evaluation");
}

#[tokio::test(start_paused = true)]
async fn test_semantic_check_timeout_marks_criterion_incomplete() {
    let store = store(&["p1"]);
    let ProfileSlot::Loaded(profile) = &store.slots()[0] else {
        panic!("profile failed to load");
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let checks = SemanticChecks::new(Duration::from_millis(50)).with(
        Criterion::VocabularyAccessibility,
        Arc::new(StallingCheck { started: tx }),
    );

    let report = evaluate_with_checks(profile, &lesson(), &checks).await;
    assert!(report.concerns.is_empty());
    assert_eq!(report.incomplete.len(), 1);
    assert_eq!(
        report.incomplete[0].reason,
        IncompleteReason::Timeout { after_ms: 50 }
    );
    assert_eq!(report.rating, 5);
}

#[tokio::test]
async fn test_failing_check_marks_criterion_incomplete() {
    let store = store(&["p1"]);
    let ProfileSlot::Loaded(profile) = &store.slots()[0] else {
        panic!("profile failed to load");
    };
    let checks = SemanticChecks::default()
        .with(Criterion::VocabularyAccessibility, Arc::new(FailingCheck));

    let report = evaluate_with_checks(profile, &lesson(), &checks).await;
    match &report.incomplete[0].reason {
        IncompleteReason::ProbeFailed { detail } => assert!(detail.contains("model unavailable")),
        other => panic!("unexpected reason: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_common_field_fails_the_run() {
    let store = store(&["p1"]);
    let mut plan = lesson();
    plan.activities = None;

    let err = execute_profiles_parallel(
        store.slots().to_vec(),
        Arc::new(plan),
        ParallelEvalConfig::default(),
        CancelHandle::new(),
    )
    .await
    .unwrap_err();
    match err {
        OrchestrationError::SchemaValidation { missing } => {
            assert_eq!(missing, vec!["/activities".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}
