//! Per-profile lesson evaluation.
//!
//! - [`detectors`]: shared, profile-independent measurements
//! - [`dispatch`]: criterion → detector table and directive construction
//! - [`engine`]: thresholds, trigger conditions, templates and rating
//! - [`probe`]: optional async semantic checks bounded by a timeout

pub mod detectors;
pub mod dispatch;
pub mod engine;
pub mod probe;

pub use detectors::{split_actions, ActivityRef, Finding, FindingDetail, MissingField};
pub use dispatch::{detector_for, Detector};
pub use engine::{evaluate, CriterionOutcome};
pub use probe::{evaluate_with_checks, SemanticCheck, SemanticChecks, DEFAULT_PROBE_TIMEOUT};
