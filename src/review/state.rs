//! Review states and the transition log entry.

use crate::core::Timestamp;
use crate::decision::RecordId;
use serde::{Deserialize, Serialize};

/// Review state of a decision record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Pending,
    Approved,
    Rejected,
}

impl ReviewState {
    /// Approved and Rejected are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Approved | ReviewState::Rejected)
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewState::Pending => write!(f, "pending"),
            ReviewState::Approved => write!(f, "approved"),
            ReviewState::Rejected => write!(f, "rejected"),
        }
    }
}

/// A reviewer's decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    /// State this decision leads to.
    pub fn target(&self) -> ReviewState {
        match self {
            ReviewDecision::Approve => ReviewState::Approved,
            ReviewDecision::Reject => ReviewState::Rejected,
        }
    }
}

/// One entry in the audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub record_id: RecordId,
    /// `None` for the submission entry
    pub from: Option<ReviewState>,
    pub to: ReviewState,
    pub actor: String,
    pub reason: Option<String>,
    pub at: Timestamp,
}

/// Counts per state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}
