//! Consensus Module
//!
//! Decides whether independent runs of one job agree:
//! - Execution results as opaque structured outputs
//! - Canonical-hash grouping with a configurable quorum
//! - Verdicts that expose every disagreeing group

pub mod comparator;
pub mod quorum;
pub mod result;

pub use comparator::{compare, validate_against_canon, CanonCheck, Comparator, ConsensusVerdict};
pub use quorum::QuorumPolicy;
pub use result::ExecutionResult;
