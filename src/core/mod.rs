//! Core utilities and common types for datanet.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
