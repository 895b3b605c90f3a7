//! Error types for patch application and the version ledger.

/// Why one directive could not be applied. Recorded per change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("no activity with id {0}")]
    UnknownActivity(String),

    #[error("activity {0} has no duration to place checkpoints in")]
    MissingDuration(String),

    #[error("pacing interval must be positive")]
    ZeroInterval,

    #[error("activity {0} has no instructions")]
    MissingInstructions(String),

    #[error("activity {activity_id} has {len} instruction steps; step {step_index} does not exist")]
    StepOutOfRange {
        activity_id: String,
        step_index: usize,
        len: usize,
    },
}

/// Errors produced by the plan ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("stale base version: head is {head}, commit was based on {base}")]
    StaleBase { head: String, base: String },

    #[error("unknown lesson version: {0}")]
    UnknownVersion(String),

    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::PanelError),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
