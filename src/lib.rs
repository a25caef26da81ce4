//! # Datanet - Canonical Decisions from Independent Results
//!
//! Reduces independently produced results to a tamper-evident, reviewable
//! decision:
//! - **Canon**: deterministic canonical bytes and SHA-256 content hashes
//! - **Consensus**: quorum comparison of execution results
//! - **Decision**: immutable, content-addressed decision records
//! - **Signing**: detached and token signatures over canonical bytes
//! - **Review**: Pending to Approved/Rejected state machine with audit log
//! - **Storage**: key/bytes backends and a record store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use datanet::canon::CanonicalValue;
//! use datanet::consensus::{Comparator, ExecutionResult, QuorumPolicy};
//! use datanet::decision::compose_acceptance_decision;
//! use datanet::signing::{InMemoryKeyring, SignerConfig, SigningMaterial};
//! use std::sync::Arc;
//!
//! fn main() -> datanet::Result<()> {
//!     let results = vec![
//!         ExecutionResult::new("job-1", CanonicalValue::from_json_str(r#"{"a":1,"b":[1,2]}"#)?),
//!         ExecutionResult::new("job-1", CanonicalValue::from_json_str(r#"{"b":[1,2],"a":1.0}"#)?),
//!     ];
//!     let verdict = Comparator::new(QuorumPolicy::Unanimous).compare(&results)?;
//!     assert!(verdict.consensus_reached);
//!
//!     let canon = datanet::canon::canonical_hash(&CanonicalValue::mapping())?;
//!     let record = compose_acceptance_decision(verdict, canon, "Runs agree", "ops-bot")?;
//!
//!     let keys = InMemoryKeyring::new()
//!         .with_signing("ops-bot", SigningMaterial::ed25519_from_bytes(&[7u8; 32]))?;
//!     let signer = SignerConfig::default().build(Arc::new(keys));
//!     let signature = signer.sign_record(&record, "ops-bot")?;
//!     assert!(signer.verify_record(&record, &signature));
//!     Ok(())
//! }
//! ```

pub mod canon;
pub mod config;
pub mod consensus;
pub mod core;
pub mod decision;
pub mod review;
pub mod signing;
pub mod storage;
pub mod telemetry;

pub use crate::core::error::{Error, Result};
pub use crate::core::types::ContentHash;
pub use config::DatanetConfig;
