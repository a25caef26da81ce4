//! Execution results handed to the comparator.

use crate::canon::CanonicalValue;
use crate::core::{now, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One run's output for one job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Job that spawned the run
    pub job_id: String,
    /// Run identifier, unique within the job
    pub run_id: String,
    /// Opaque structured output of the run
    pub raw_output: CanonicalValue,
    /// When the run produced its output
    pub produced_at: Timestamp,
}

impl ExecutionResult {
    /// Create a result with a freshly generated run ID.
    pub fn new(job_id: &str, raw_output: CanonicalValue) -> Self {
        Self::with_run_id(job_id, &Uuid::new_v4().to_string(), raw_output)
    }

    /// Create a result for a known run.
    pub fn with_run_id(job_id: &str, run_id: &str, raw_output: CanonicalValue) -> Self {
        Self {
            job_id: job_id.to_string(),
            run_id: run_id.to_string(),
            raw_output,
            produced_at: now(),
        }
    }
}
