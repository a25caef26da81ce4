//! Storage Module
//!
//! Opaque key to bytes storage and the record store built on it:
//! - Async backend trait with memory and local-filesystem backends
//! - Configuration-driven backend selection
//! - Records stored beside their signatures
//! - Content-addressed canonical objects

pub mod backend;
pub mod config;
pub mod factory;
pub mod local;
pub mod memory;
pub mod record_store;

pub use backend::{validate_key, StorageBackend, StorageKind};
pub use config::{LocalConfig, StorageConfig};
pub use factory::create_storage;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use record_store::{RecordStore, StoredRecord};
