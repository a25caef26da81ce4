//! Decision Records
//!
//! Immutable, content-addressed statements about the canon:
//! - Canon proposals
//! - Acceptance decisions backed by a consensus verdict
//! - Integrity checks and reload from canonical bytes

pub mod composer;
pub mod record;

pub use composer::{
    compose, compose_acceptance_decision, compose_canon_proposal, DecisionDraft,
};
pub use record::{DecisionKind, DecisionRecord, RecordId};
