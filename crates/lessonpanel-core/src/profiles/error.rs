//! Error types for profile loading.

/// Errors produced while loading or validating evaluator profiles.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("configuration error in profile {profile_id}: {reason}")]
    Configuration { profile_id: String, reason: String },

    #[error("could not parse profile {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    #[error("duplicate profile id: {0}")]
    DuplicateProfile(String),

    #[error("unsupported profile file extension: {0}")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfileError {
    pub(crate) fn config(profile_id: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            profile_id: profile_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for profile operations.
pub type ProfileResult<T> = std::result::Result<T, ProfileError>;
