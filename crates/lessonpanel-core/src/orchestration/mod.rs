//! Running every profile against one lesson.
//!
//! # Module layout
//!
//! - [`error`]: `OrchestrationError`, `OrchestrationResult`
//! - [`schema`]: artifact-wide required-field check
//! - [`runner`]: sequential `evaluate_all`, `OrchestrationRun`
//! - [`executor`]: `execute_profiles_parallel`, `ParallelEvalConfig`, `CancelHandle`

pub mod error;
pub mod executor;
pub mod runner;
pub mod schema;

pub use error::{OrchestrationError, OrchestrationResult};
pub use executor::{execute_profiles_parallel, CancelHandle, ParallelEvalConfig};
pub use runner::{evaluate_all, evaluate_profiles, OrchestrationRun, SkippedProfile};
pub use schema::{common_required_fields, validate_schema, BASE_FIELDS};
