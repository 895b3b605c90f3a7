//! Error types for orchestration.

/// Errors that abort a whole orchestration run.
///
/// Anything local to one profile or one criterion is recorded on the run
/// instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("lesson is missing fields every profile requires: {}", missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::PanelError),
}

/// Result type for orchestration operations.
pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;
