//! Decision record composer.
//!
//! Validates a proposal and seals it into a content-addressed record.

use crate::canon::{canonical_hash, canonicalize, CanonicalValue};
use crate::consensus::ConsensusVerdict;
use crate::core::{now, ContentHash, Error, Result, Timestamp};
use crate::decision::record::{DecisionContent, DecisionKind, DecisionRecord};
use chrono::SubsecRound;
use tracing::info;

/// Inputs for one decision record.
#[derive(Clone, Debug)]
pub struct DecisionDraft {
    pub kind: DecisionKind,
    pub current_canon_ref: ContentHash,
    pub proposed_change: CanonicalValue,
    pub rationale: String,
    pub author: String,
    pub consensus_ref: Option<ConsensusVerdict>,
}

impl DecisionDraft {
    /// Compose the record stamped with the current time.
    pub fn compose(self) -> Result<DecisionRecord> {
        self.compose_at(now())
    }

    /// Compose the record with an explicit creation time.
    pub fn compose_at(self, created_at: Timestamp) -> Result<DecisionRecord> {
        if self.rationale.trim().is_empty() {
            return Err(Error::InvalidDecision("rationale must not be empty".into()));
        }
        if self.author.trim().is_empty() {
            return Err(Error::InvalidDecision("author must not be empty".into()));
        }

        canonicalize(&self.proposed_change).map_err(|e| match e {
            Error::Canonicalization { path, reason } => Error::Canonicalization {
                path: path.replacen('$', "$.proposed_change", 1),
                reason,
            },
            other => other,
        })?;

        if let Some(verdict) = &self.consensus_ref {
            check_verdict(verdict)?;
        }
        if self.kind == DecisionKind::AcceptanceDecision {
            match &self.consensus_ref {
                None => {
                    return Err(Error::InvalidDecision(
                        "acceptance decision requires a consensus verdict".into(),
                    ))
                }
                Some(verdict) if !verdict.consensus_reached => {
                    return Err(Error::InvalidDecision(format!(
                        "acceptance decision requires consensus; job {} has {} disagreeing groups",
                        verdict.job_id,
                        verdict.groups.len()
                    )))
                }
                Some(_) => {}
            }
        }

        let record = DecisionRecord::seal(DecisionContent {
            kind: self.kind,
            current_canon_ref: self.current_canon_ref,
            proposed_change: self.proposed_change,
            rationale: self.rationale,
            author: self.author,
            created_at: created_at.trunc_subsecs(6),
            consensus_ref: self.consensus_ref,
        })?;

        info!(
            record_id = %record.record_id().short(),
            kind = %record.kind(),
            author = %record.author(),
            "decision record composed"
        );
        Ok(record)
    }
}

/// Re-derive a verdict's outcome from its own groups.
///
/// Verdicts are plain data, so a claimed winner is only trusted when it is
/// the single group meeting the recorded quorum and the carried output
/// hashes to it.
fn check_verdict(verdict: &ConsensusVerdict) -> Result<()> {
    let inconsistent = |what: &str| {
        Err(Error::InvalidDecision(format!(
            "inconsistent consensus verdict for job {}: {what}",
            verdict.job_id
        )))
    };

    let counted: usize = verdict.groups.values().map(|runs| runs.len()).sum();
    if counted != verdict.total_results || verdict.groups.values().any(|runs| runs.is_empty()) {
        return inconsistent("group sizes do not add up to the result count");
    }
    if verdict.quorum_required == 0 {
        return inconsistent("quorum of zero");
    }
    let qualifying: Vec<&ContentHash> = verdict
        .groups
        .iter()
        .filter(|(_, runs)| runs.len() >= verdict.quorum_required)
        .map(|(hash, _)| hash)
        .collect();
    let derived_winner = match qualifying.as_slice() {
        [single] => Some(*single),
        _ => None,
    };

    if verdict.consensus_reached != derived_winner.is_some()
        || verdict.winning_hash.as_ref() != derived_winner
    {
        return inconsistent("winner does not match the groups and quorum");
    }

    match (&verdict.winning_hash, &verdict.canonical_output) {
        (Some(winner), Some(output)) => {
            if &canonical_hash(output)? != winner {
                return inconsistent("canonical output does not hash to the winning group");
            }
        }
        (None, None) => {}
        _ => return inconsistent("canonical output without a winner"),
    }
    Ok(())
}

/// Compose a decision record.
pub fn compose(
    kind: DecisionKind,
    current_canon_ref: ContentHash,
    proposed_change: CanonicalValue,
    rationale: &str,
    author: &str,
    consensus_ref: Option<ConsensusVerdict>,
) -> Result<DecisionRecord> {
    DecisionDraft {
        kind,
        current_canon_ref,
        proposed_change,
        rationale: rationale.to_string(),
        author: author.to_string(),
        consensus_ref,
    }
    .compose()
}

/// Propose a change against the current canon value.
pub fn compose_canon_proposal(
    current_canon: &CanonicalValue,
    proposed_change: CanonicalValue,
    rationale: &str,
    author: &str,
) -> Result<DecisionRecord> {
    let current_canon_ref = canonical_hash(current_canon)?;
    compose(
        DecisionKind::CanonProposal,
        current_canon_ref,
        proposed_change,
        rationale,
        author,
        None,
    )
}

/// Accept the winning output of a verdict as the proposed change.
pub fn compose_acceptance_decision(
    verdict: ConsensusVerdict,
    current_canon_ref: ContentHash,
    rationale: &str,
    author: &str,
) -> Result<DecisionRecord> {
    let proposed_change = verdict.canonical_output.clone().unwrap_or_default();
    compose(
        DecisionKind::AcceptanceDecision,
        current_canon_ref,
        proposed_change,
        rationale,
        author,
        Some(verdict),
    )
}
