//! Domain models for lessonpanel.
//!
//! Canonical definitions for the core entities:
//! - `LessonPlan`: the artifact under review (read-only to evaluators)
//! - `Criterion`: one named axis of evaluation
//! - `Concern` / `FeedbackReport`: one profile's structured feedback
//! - `Directive`: the machine-actionable patch payload behind a concern
//! - digests: content addressing for lesson versions

pub mod concern;
pub mod criterion;
pub mod digest;
pub mod directive;
pub mod error;
pub mod lesson;

pub use concern::{
    compute_rating, Concern, EvaluationIncomplete, Evidence, FeedbackReport, IncompleteReason,
    Recommendation, Severity,
};
pub use criterion::Criterion;
pub use digest::{canonical_digest, lesson_digest};
pub use directive::{
    Directive, DirectiveElement, InstructionsDirective, PacingDirective, ScaffoldingDirective,
    VocabularyDirective,
};
pub use error::{PanelError, Result};
pub use lesson::{
    Activity, ArtifactField, CognitiveLevel, InstructionStep, LessonPlan, Objective,
    PacingCheckpoint, Scaffold, SupportTier, VocabularyEntry,
};
