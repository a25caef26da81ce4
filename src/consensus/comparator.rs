//! Hash-equality comparator over independent execution results.
//!
//! Every `raw_output` is canonicalized and hashed; runs are grouped by
//! hash and a group wins only when it is the single group meeting the
//! configured quorum.

use crate::canon::{canonical_hash, CanonicalValue};
use crate::consensus::quorum::QuorumPolicy;
use crate::consensus::result::ExecutionResult;
use crate::core::{ContentHash, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Outcome of comparing one job's results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusVerdict {
    /// Job the results belong to
    pub job_id: String,
    /// Run IDs grouped by the content hash of their output
    pub groups: BTreeMap<ContentHash, BTreeSet<String>>,
    /// Whether a single group met the quorum
    pub consensus_reached: bool,
    /// Hash of the winning group
    pub winning_hash: Option<ContentHash>,
    /// Number of results compared
    pub total_results: usize,
    /// Group size the quorum demanded
    pub quorum_required: usize,
    /// Output of the winning group
    pub canonical_output: Option<CanonicalValue>,
}

impl ConsensusVerdict {
    /// Groups that did not win, for reviewer inspection.
    pub fn discrepancies(&self) -> Vec<(&ContentHash, &BTreeSet<String>)> {
        self.groups
            .iter()
            .filter(|(hash, _)| Some(*hash) != self.winning_hash.as_ref())
            .collect()
    }

    /// Size of the largest group.
    pub fn largest_group(&self) -> usize {
        self.groups.values().map(|g| g.len()).max().unwrap_or(0)
    }
}

/// Result of checking one output against an expected canonical output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonCheck {
    pub matches: bool,
    pub actual_hash: ContentHash,
    pub expected_hash: ContentHash,
}

/// Groups execution results by canonical hash.
#[derive(Clone, Debug, Default)]
pub struct Comparator {
    policy: QuorumPolicy,
}

impl Comparator {
    /// Create a comparator with a quorum policy.
    pub fn new(policy: QuorumPolicy) -> Self {
        Self { policy }
    }

    /// The configured quorum policy.
    pub fn policy(&self) -> QuorumPolicy {
        self.policy
    }

    /// Compare a complete batch of results for one job.
    pub fn compare(&self, results: &[ExecutionResult]) -> Result<ConsensusVerdict> {
        let first = results
            .first()
            .ok_or_else(|| Error::ComparatorInput("at least one result is required".into()))?;
        let job_id = first.job_id.clone();

        let mut groups: BTreeMap<ContentHash, BTreeSet<String>> = BTreeMap::new();
        let mut outputs: BTreeMap<ContentHash, &CanonicalValue> = BTreeMap::new();
        let mut seen_runs = BTreeSet::new();

        for result in results {
            if result.job_id != job_id {
                return Err(Error::ComparatorInput(format!(
                    "mixed jobs in one batch: expected {}, got {} (run {})",
                    job_id, result.job_id, result.run_id
                )));
            }
            if !seen_runs.insert(result.run_id.as_str()) {
                return Err(Error::ComparatorInput(format!(
                    "duplicate run_id {} for job {}",
                    result.run_id, job_id
                )));
            }

            let hash = canonical_hash(&result.raw_output).map_err(|e| match e {
                Error::Canonicalization { path, reason } => Error::Canonicalization {
                    path: format!("run {}: {}", result.run_id, path),
                    reason,
                },
                other => other,
            })?;

            outputs.entry(hash.clone()).or_insert(&result.raw_output);
            groups.entry(hash).or_default().insert(result.run_id.clone());
        }

        let total = results.len();
        // A lone result trivially agrees with itself under any policy.
        let required = if total == 1 {
            1
        } else {
            self.policy.required(total)
        };
        let qualifying: Vec<&ContentHash> = groups
            .iter()
            .filter(|(_, runs)| runs.len() >= required)
            .map(|(hash, _)| hash)
            .collect();

        // Two groups meeting a low quorum is a tie, never a winner.
        let winning_hash = match qualifying.as_slice() {
            [single] => Some((*single).clone()),
            _ => None,
        };
        let canonical_output = winning_hash
            .as_ref()
            .and_then(|h| outputs.get(h))
            .map(|v| (*v).clone());

        let verdict = ConsensusVerdict {
            job_id,
            consensus_reached: winning_hash.is_some(),
            winning_hash,
            total_results: total,
            quorum_required: required,
            groups,
            canonical_output,
        };

        if verdict.consensus_reached {
            info!(
                job_id = %verdict.job_id,
                total = total,
                groups = verdict.groups.len(),
                "consensus reached"
            );
        } else {
            info!(
                job_id = %verdict.job_id,
                total = total,
                groups = verdict.groups.len(),
                largest = verdict.largest_group(),
                required = required,
                "no consensus"
            );
        }
        debug!(policy = %self.policy, "comparison complete");

        Ok(verdict)
    }
}

/// Compare with the default (unanimous) quorum.
pub fn compare(results: &[ExecutionResult]) -> Result<ConsensusVerdict> {
    Comparator::default().compare(results)
}

/// Check a single result against an expected canonical output.
pub fn validate_against_canon(
    result: &ExecutionResult,
    expected_output: &CanonicalValue,
) -> Result<CanonCheck> {
    let actual_hash = canonical_hash(&result.raw_output)?;
    let expected_hash = canonical_hash(expected_output)?;
    Ok(CanonCheck {
        matches: actual_hash == expected_hash,
        actual_hash,
        expected_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(run: &str, json: &str) -> ExecutionResult {
        ExecutionResult::with_run_id("job-1", run, CanonicalValue::from_json_str(json).unwrap())
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(compare(&[]), Err(Error::ComparatorInput(_))));
    }

    #[test]
    fn test_single_result_trivial_consensus() {
        let verdict = compare(&[result("r1", r#"{"result": 42}"#)]).unwrap();
        assert!(verdict.consensus_reached);
        assert_eq!(verdict.groups.len(), 1);
        assert_eq!(
            verdict.canonical_output,
            Some(CanonicalValue::from_json_str(r#"{"result": 42}"#).unwrap())
        );
        assert!(verdict.discrepancies().is_empty());
    }

    #[test]
    fn test_identical_outputs_one_group() {
        let results = vec![
            result("r1", r#"{"result": 42}"#),
            result("r2", r#"{"result": 42.0}"#),
            result("r3", r#"{"result": 42}"#),
        ];
        let verdict = compare(&results).unwrap();
        assert!(verdict.consensus_reached);
        assert_eq!(verdict.groups.len(), 1);
        let runs = verdict.groups.values().next().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(verdict.winning_hash.as_ref(), verdict.groups.keys().next());
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let results = vec![
            result("r1", r#"{"data": {"values": [1, 2, 3], "metadata": {"count": 3}}}"#),
            result("r2", r#"{"data": {"metadata": {"count": 3}, "values": [1, 2, 3]}}"#),
        ];
        assert!(compare(&results).unwrap().consensus_reached);
    }

    #[test]
    fn test_even_split_is_not_consensus() {
        let results = vec![
            result("r1", r#"{"v": 1}"#),
            result("r2", r#"{"v": 1}"#),
            result("r3", r#"{"v": 2}"#),
            result("r4", r#"{"v": 2}"#),
        ];
        for policy in [
            QuorumPolicy::Unanimous,
            QuorumPolicy::Majority,
            QuorumPolicy::AtLeast(2),
        ] {
            let verdict = Comparator::new(policy).compare(&results).unwrap();
            assert!(!verdict.consensus_reached, "policy {policy}");
            assert!(verdict.winning_hash.is_none());
            assert_eq!(verdict.groups.len(), 2);
            assert_eq!(verdict.discrepancies().len(), 2);
        }
    }

    #[test]
    fn test_partial_quorum_scenario() {
        let results = vec![
            result("r1", r#"{"a":1,"b":2}"#),
            result("r2", r#"{"b":2,"a":1}"#),
            result("r3", r#"{"a":1,"b":3}"#),
        ];
        let h1 = canonical_hash(&CanonicalValue::from_json_str(r#"{"a":1,"b":2}"#).unwrap()).unwrap();

        let verdict = Comparator::new(QuorumPolicy::AtLeast(2)).compare(&results).unwrap();
        assert!(verdict.consensus_reached);
        assert_eq!(verdict.winning_hash, Some(h1.clone()));
        assert_eq!(verdict.groups[&h1].len(), 2);
        assert_eq!(verdict.discrepancies().len(), 1);

        let strict = compare(&results).unwrap();
        assert!(!strict.consensus_reached);
        assert_eq!(strict.groups.len(), 2);
    }

    #[test]
    fn test_single_result_consensus_under_any_policy() {
        for policy in [
            QuorumPolicy::Unanimous,
            QuorumPolicy::Majority,
            QuorumPolicy::AtLeast(2),
            QuorumPolicy::AtLeast(5),
        ] {
            let verdict = Comparator::new(policy).compare(&[result("r1", "7")]).unwrap();
            assert!(verdict.consensus_reached, "policy {policy}");
            assert_eq!(verdict.quorum_required, 1);
        }
    }

    #[test]
    fn test_at_least_above_total_never_wins() {
        let results = vec![result("r1", "1"), result("r2", "1")];
        let verdict = Comparator::new(QuorumPolicy::AtLeast(3)).compare(&results).unwrap();
        assert!(!verdict.consensus_reached);
        assert_eq!(verdict.quorum_required, 3);
    }

    #[test]
    fn test_mixed_jobs_rejected() {
        let mut other = result("r2", "1");
        other.job_id = "job-2".into();
        let err = compare(&[result("r1", "1"), other]).unwrap_err();
        assert!(matches!(err, Error::ComparatorInput(_)));
    }

    #[test]
    fn test_duplicate_run_rejected() {
        let err = compare(&[result("r1", "1"), result("r1", "1")]).unwrap_err();
        assert!(matches!(err, Error::ComparatorInput(_)));
    }

    #[test]
    fn test_non_canonical_output_surfaces_run_and_path() {
        let bad = ExecutionResult::with_run_id(
            "job-1",
            "r2",
            CanonicalValue::mapping().with_entry("score", f64::NAN),
        );
        match compare(&[result("r1", "1"), bad]).unwrap_err() {
            Error::Canonicalization { path, .. } => {
                assert!(path.contains("r2"));
                assert!(path.contains("$.score"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_against_canon() {
        let r = result("r1", r#"{"value": 100}"#);
        let ok = validate_against_canon(&r, &CanonicalValue::from_json_str(r#"{"value": 100}"#).unwrap())
            .unwrap();
        assert!(ok.matches);
        let bad = validate_against_canon(&r, &CanonicalValue::from_json_str(r#"{"value": 200}"#).unwrap())
            .unwrap();
        assert!(!bad.matches);
        assert_ne!(bad.actual_hash, bad.expected_hash);
    }

    #[test]
    fn test_verdict_serializes_groups_by_hex() {
        let verdict = compare(&[result("r1", "1")]).unwrap();
        let json = serde_json::to_value(&verdict).unwrap();
        let groups = json["groups"].as_object().unwrap();
        assert_eq!(groups.keys().next().unwrap().len(), 64);
        let back: ConsensusVerdict = serde_json::from_value(json).unwrap();
        assert_eq!(back, verdict);
    }
}
