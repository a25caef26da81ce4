//! Review workflow state machine.
//!
//! Each record gets its own lock so transitions on one record are
//! serialized while different records proceed independently. The
//! transition log is kept apart from the current-state lookup and only
//! ever appended to.

use crate::core::{now, Error, Result};
use crate::decision::{DecisionRecord, RecordId};
use crate::review::state::{ReviewDecision, ReviewState, ReviewStats, TransitionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// In-process review workflow.
#[derive(Default)]
pub struct ReviewWorkflow {
    states: RwLock<HashMap<RecordId, Arc<Mutex<ReviewState>>>>,
    log: Mutex<HashMap<RecordId, Vec<TransitionRecord>>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("review workflow lock poisoned".into())
}

impl ReviewWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record for review in the Pending state.
    pub fn submit(&self, record: &DecisionRecord) -> Result<()> {
        record.verify_integrity()?;
        let record_id = record.record_id().clone();

        let mut states = self.states.write().map_err(poisoned)?;
        if states.contains_key(&record_id) {
            return Err(Error::invalid_transition(&record_id, "already submitted"));
        }
        self.append(TransitionRecord {
            record_id: record_id.clone(),
            from: None,
            to: ReviewState::Pending,
            actor: record.author().to_string(),
            reason: None,
            at: now(),
        })?;
        states.insert(record_id.clone(), Arc::new(Mutex::new(ReviewState::Pending)));

        info!(record_id = %record_id.short(), kind = %record.kind(), "decision submitted for review");
        Ok(())
    }

    /// Move a Pending record to Approved or Rejected.
    pub fn transition(
        &self,
        record_id: &RecordId,
        reviewer: &str,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<ReviewState> {
        if reviewer.trim().is_empty() {
            return Err(Error::invalid_transition(record_id, "reviewer identity must not be empty"));
        }
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if decision == ReviewDecision::Reject && reason.is_none() {
            return Err(Error::invalid_transition(record_id, "rejection requires a reason"));
        }

        let entry = self
            .states
            .read()
            .map_err(poisoned)?
            .get(record_id)
            .cloned()
            .ok_or_else(|| Error::invalid_transition(record_id, "unknown record"))?;

        let mut state = entry.lock().map_err(poisoned)?;
        if state.is_terminal() {
            return Err(Error::invalid_transition(
                record_id,
                format!("already {}", *state),
            ));
        }

        let to = decision.target();
        self.append(TransitionRecord {
            record_id: record_id.clone(),
            from: Some(*state),
            to,
            actor: reviewer.to_string(),
            reason: reason.map(str::to_string),
            at: now(),
        })?;
        *state = to;

        info!(record_id = %record_id.short(), reviewer = %reviewer, state = %to, "review transition");
        Ok(to)
    }

    /// Current state, or `None` for an unknown record.
    pub fn current_state(&self, record_id: &RecordId) -> Result<Option<ReviewState>> {
        let entry = self.states.read().map_err(poisoned)?.get(record_id).cloned();
        match entry {
            Some(entry) => Ok(Some(*entry.lock().map_err(poisoned)?)),
            None => Ok(None),
        }
    }

    /// Transitions recorded for one record, oldest first.
    pub fn history(&self, record_id: &RecordId) -> Result<Vec<TransitionRecord>> {
        Ok(self
            .log
            .lock()
            .map_err(poisoned)?
            .get(record_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Records still awaiting review, in id order.
    pub fn pending(&self) -> Result<Vec<RecordId>> {
        let entries: Vec<(RecordId, Arc<Mutex<ReviewState>>)> = self
            .states
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut pending = Vec::new();
        for (id, entry) in entries {
            if *entry.lock().map_err(poisoned)? == ReviewState::Pending {
                pending.push(id);
            }
        }
        pending.sort();
        Ok(pending)
    }

    pub fn stats(&self) -> Result<ReviewStats> {
        let states = self.states.read().map_err(poisoned)?;
        let mut stats = ReviewStats {
            total: states.len(),
            ..Default::default()
        };
        for entry in states.values() {
            match *entry.lock().map_err(poisoned)? {
                ReviewState::Pending => stats.pending += 1,
                ReviewState::Approved => stats.approved += 1,
                ReviewState::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }

    fn append(&self, entry: TransitionRecord) -> Result<()> {
        self.log
            .lock()
            .map_err(poisoned)?
            .entry(entry.record_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::CanonicalValue;
    use crate::decision::compose_canon_proposal;

    fn record(title: &str) -> DecisionRecord {
        compose_canon_proposal(
            &CanonicalValue::mapping(),
            CanonicalValue::mapping().with_entry("title", title),
            "Rename",
            "alice",
        )
        .unwrap()
    }

    #[test]
    fn test_submit_and_approve() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        workflow.submit(&r).unwrap();
        assert_eq!(workflow.current_state(r.record_id()).unwrap(), Some(ReviewState::Pending));

        let state = workflow
            .transition(r.record_id(), "bob", ReviewDecision::Approve, None)
            .unwrap();
        assert_eq!(state, ReviewState::Approved);
        assert_eq!(workflow.current_state(r.record_id()).unwrap(), Some(ReviewState::Approved));
    }

    #[test]
    fn test_terminal_state_is_final() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        workflow.submit(&r).unwrap();
        workflow
            .transition(r.record_id(), "bob", ReviewDecision::Approve, None)
            .unwrap();

        let err = workflow
            .transition(r.record_id(), "carol", ReviewDecision::Reject, Some("changed my mind"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(workflow.current_state(r.record_id()).unwrap(), Some(ReviewState::Approved));
    }

    #[test]
    fn test_reject_requires_reason() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        workflow.submit(&r).unwrap();
        assert!(workflow
            .transition(r.record_id(), "bob", ReviewDecision::Reject, None)
            .is_err());
        assert!(workflow
            .transition(r.record_id(), "bob", ReviewDecision::Reject, Some("  "))
            .is_err());
        assert_eq!(
            workflow
                .transition(r.record_id(), "bob", ReviewDecision::Reject, Some("Wrong field"))
                .unwrap(),
            ReviewState::Rejected
        );
    }

    #[test]
    fn test_unknown_record_and_empty_reviewer() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        assert!(matches!(
            workflow.transition(r.record_id(), "bob", ReviewDecision::Approve, None),
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(workflow.current_state(r.record_id()).unwrap(), None);

        workflow.submit(&r).unwrap();
        assert!(workflow
            .transition(r.record_id(), "", ReviewDecision::Approve, None)
            .is_err());
    }

    #[test]
    fn test_double_submit_rejected() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        workflow.submit(&r).unwrap();
        assert!(matches!(workflow.submit(&r), Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_history_is_append_only() {
        let workflow = ReviewWorkflow::new();
        let r = record("A");
        workflow.submit(&r).unwrap();
        workflow
            .transition(r.record_id(), "bob", ReviewDecision::Reject, Some("Wrong field"))
            .unwrap();
        let _ = workflow.transition(r.record_id(), "carol", ReviewDecision::Approve, None);

        let history = workflow.history(r.record_id()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, None);
        assert_eq!(history[0].to, ReviewState::Pending);
        assert_eq!(history[0].actor, "alice");
        assert_eq!(history[1].from, Some(ReviewState::Pending));
        assert_eq!(history[1].to, ReviewState::Rejected);
        assert_eq!(history[1].reason.as_deref(), Some("Wrong field"));
    }

    #[test]
    fn test_pending_and_stats() {
        let workflow = ReviewWorkflow::new();
        let (a, b, c) = (record("A"), record("B"), record("C"));
        for r in [&a, &b, &c] {
            workflow.submit(r).unwrap();
        }
        workflow
            .transition(a.record_id(), "bob", ReviewDecision::Approve, None)
            .unwrap();
        workflow
            .transition(b.record_id(), "bob", ReviewDecision::Reject, Some("No"))
            .unwrap();

        assert_eq!(workflow.pending().unwrap(), vec![c.record_id().clone()]);
        assert_eq!(
            workflow.stats().unwrap(),
            ReviewStats {
                pending: 1,
                approved: 1,
                rejected: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_concurrent_reviewers_one_wins() {
        let workflow = Arc::new(ReviewWorkflow::new());
        let r = record("A");
        workflow.submit(&r).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let workflow = workflow.clone();
                let id = r.record_id().clone();
                std::thread::spawn(move || {
                    let decision = if i % 2 == 0 {
                        ReviewDecision::Approve
                    } else {
                        ReviewDecision::Reject
                    };
                    workflow
                        .transition(&id, &format!("reviewer-{i}"), decision, Some("race"))
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(workflow.history(r.record_id()).unwrap().len(), 2);
    }
}
