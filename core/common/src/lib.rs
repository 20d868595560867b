//! Common utilities and types shared across SeedKeeper modules.
//!
//! This module provides foundational types that are used throughout the
//! custody engine, ensuring consistency and type safety.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CustodyMode, ReferenceId, SecretString};
