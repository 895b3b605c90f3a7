//! Applying approved changes to produce a new lesson version.
//!
//! # Module layout
//!
//! - [`handlers`]: one insert-only handler per directive element
//! - [`applier`]: `apply`, `PatchOutcome`, `ApprovedChange`
//! - [`approval`]: `TeacherDecision`, `approved_changes`
//! - [`ledger`]: `PlanLedger` of digest-keyed versions
//! - [`error`]: `ApplyError`, `LedgerError`

pub mod applier;
pub mod approval;
pub mod error;
pub mod handlers;
pub mod ledger;

pub use applier::{apply, ApprovedChange, FailedChange, ManualReview, PatchOutcome};
pub use approval::{approved_changes, ApprovalSelection, Decision, TeacherDecision};
pub use error::{ApplyError, LedgerError, LedgerResult};
pub use handlers::{apply_directive, HandlerOutcome};
pub use ledger::{PlanLedger, PlanVersion};
