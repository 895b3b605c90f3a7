//! Synthesis: N feedback reports → one revision proposal.
//!
//! # Module layout
//!
//! - [`agreement`]: recommendation keys, cross-profile grouping, directive merging
//! - [`conflict`]: stance heuristic, opposition rules, resolution strategies
//! - [`proposal`]: `RevisionProposal`, `SynthesisConfig`, `synthesize`
//! - [`render`]: `render_proposal_md`

pub mod agreement;
pub mod conflict;
pub mod proposal;
pub mod render;

pub use agreement::{merge_directives, recommendation_key};
pub use conflict::{
    classify_change, concern_stance, opposes, Polarity, ResolutionStrategy, Stance, Trait,
};
pub use proposal::{
    synthesize, AttributedConcern, CategorizedChange, Conflict, OpposingConcern,
    PriorityCategory, ProposedChange, ResolutionChange, RevisionProposal, SynthesisConfig,
    UniversalImprovement, DEFAULT_AGREEMENT_THRESHOLD, DEFAULT_CATEGORY_ORDER,
    DEFAULT_KEY_PREFIX_LEN,
};
pub use render::render_proposal_md;
