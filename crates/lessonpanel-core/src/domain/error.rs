//! Domain-level error taxonomy for lessonpanel.

/// Lessonpanel domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for lessonpanel domain operations.
pub type Result<T> = std::result::Result<T, PanelError>;
