//! Lessonpanel Core Library
//!
//! Evaluates a lesson plan against a panel of declarative learner profiles,
//! synthesizes their feedback into one revision proposal, and applies the
//! changes a teacher approves as a new lesson version.

pub mod config;
pub mod domain;
pub mod evaluator;
pub mod obs;
pub mod orchestration;
pub mod patch;
pub mod profiles;
pub mod reporting;
pub mod synthesis;
pub mod telemetry;

pub use config::PanelConfig;

pub use domain::{
    compute_rating, lesson_digest, Activity, Concern, Criterion, Directive, DirectiveElement,
    FeedbackReport, IncompleteReason, LessonPlan, PanelError, Result, Severity, SupportTier,
};

pub use evaluator::{evaluate, evaluate_with_checks, SemanticCheck, SemanticChecks};

pub use orchestration::{
    evaluate_all, execute_profiles_parallel, CancelHandle, OrchestrationError, OrchestrationRun,
    ParallelEvalConfig, SkippedProfile,
};

pub use patch::{
    apply, approved_changes, ApprovedChange, Decision, LedgerError, PatchOutcome, PlanLedger,
    TeacherDecision,
};

pub use profiles::{EvaluatorProfile, ProfileError, ProfileFormat, ProfileSlot, ProfileStore};

pub use synthesis::{render_proposal_md, synthesize, RevisionProposal, SynthesisConfig};

pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
