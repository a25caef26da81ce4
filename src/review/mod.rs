//! Review Workflow
//!
//! Gates when a decision record becomes authoritative:
//! - Pending records move once to Approved or Rejected
//! - Per-record serialized transitions
//! - Append-only audit log

pub mod state;
pub mod workflow;

pub use state::{ReviewDecision, ReviewState, ReviewStats, TransitionRecord};
pub use workflow::ReviewWorkflow;
