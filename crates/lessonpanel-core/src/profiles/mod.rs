//! Evaluator profiles ("personas").
//!
//! A profile declares which criteria it cares about and, per criterion, the
//! severity thresholds and recommendation wording to use. Detection logic is
//! shared by every profile and lives in [`crate::evaluator`].

pub mod definition;
pub mod error;
pub mod store;

pub use definition::{
    Comparison, DecisionRule, EvaluatorProfile, ProfileDefinition, RecommendationTemplate,
    SeverityThresholds, TriggerConditions,
};
pub use error::{ProfileError, ProfileResult};
pub use store::{
    load_profile_str, parse_definition, ProfileFailure, ProfileFormat, ProfileSlot, ProfileStore,
};
