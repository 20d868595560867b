//! Common error types for SeedKeeper.
//!
//! Error messages are written so that no variant can ever carry plaintext
//! seed or passphrase material.

use thiserror::Error;

/// Top-level error type for SeedKeeper operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication tag did not verify: wrong passphrase, corrupted data,
    /// or tampering. Decryption never yields garbage plaintext.
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Too many retrieval attempts inside the current rate-limit window.
    #[error("Too many retrieval attempts; retry in {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds until the current window expires.
        retry_after_secs: u64,
    },

    /// Cryptographic operation failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage backend operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Durable snapshot could not be parsed. Handled internally by
    /// discarding the snapshot; never surfaced as fatal to callers.
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
