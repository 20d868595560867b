//! Secret entry model and its persisted form.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::Instant;

use seedkeeper_common::CustodyMode;

/// One stored seed: the encrypted bundle, its IV, and lifecycle metadata.
///
/// The bundle carries the key-derivation salt prepended to the ciphertext,
/// so the ciphertext/salt/iv triple can never be partially lost.
#[derive(Debug, Clone)]
pub(crate) struct SecretEntry {
    /// salt || ciphertext || tag.
    pub bundle: Vec<u8>,
    /// Fresh-per-encryption nonce.
    pub iv: Vec<u8>,
    /// How the entry's passphrase is obtained. Immutable after creation.
    pub custody_mode: CustodyMode,
    /// Bumped on every successful retrieval; drives expiry.
    pub last_accessed: Instant,
}

/// Metadata about a stored entry, without any secret material.
///
/// Lets callers decide whether to prompt for a custom passphrase before
/// attempting retrieval.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo {
    /// How the entry's passphrase is obtained.
    pub custody_mode: CustodyMode,
    /// When the entry was last stored or retrieved.
    pub last_accessed: Instant,
}

/// Persisted form of one entry. Byte arrays serialize as arrays of small
/// integers for JSON compatibility.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedEntry {
    pub bundle: Vec<u8>,
    pub iv: Vec<u8>,
    pub custody_mode: CustodyMode,
}

/// Durable snapshot of the whole registry, keyed by reference ID.
///
/// `last_accessed` is deliberately absent: it resets to load time, so a
/// freshly restored session gets the full expiry budget.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub entries: HashMap<String, PersistedEntry>,
}
