//! Artifact-wide schema validation.
//!
//! A lesson is only rejected outright when it lacks a field that *every*
//! loaded profile needs, or the base fields (a non-empty title and an
//! activity list). A field needed by only some profiles is handled per
//! criterion as an incomplete evaluation instead.

use std::collections::BTreeSet;

use crate::domain::{ArtifactField, LessonPlan};
use crate::profiles::EvaluatorProfile;

use super::error::{OrchestrationError, OrchestrationResult};

/// Fields every lesson must carry regardless of profiles.
pub const BASE_FIELDS: [ArtifactField; 2] = [ArtifactField::Title, ArtifactField::Activities];

fn profile_fields(profile: &EvaluatorProfile) -> BTreeSet<ArtifactField> {
    profile
        .evaluation_criteria
        .iter()
        .flat_map(|c| c.required_fields().iter().copied())
        .collect()
}

/// Base fields plus the intersection of each profile's required fields.
pub fn common_required_fields<'a>(
    profiles: impl IntoIterator<Item = &'a EvaluatorProfile>,
) -> BTreeSet<ArtifactField> {
    let shared = profiles
        .into_iter()
        .map(profile_fields)
        .reduce(|acc, next| acc.intersection(&next).copied().collect())
        .unwrap_or_default();

    BASE_FIELDS.into_iter().chain(shared).collect()
}

/// Fail with [`OrchestrationError::SchemaValidation`] listing the JSON
/// pointers of every missing common field.
pub fn validate_schema<'a>(
    plan: &LessonPlan,
    profiles: impl IntoIterator<Item = &'a EvaluatorProfile>,
) -> OrchestrationResult<()> {
    let missing: Vec<String> = common_required_fields(profiles)
        .into_iter()
        .filter_map(|field| plan.missing_field(field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OrchestrationError::SchemaValidation { missing })
    }
}
