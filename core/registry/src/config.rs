//! Custody registry configuration.

use std::time::Duration;

use seedkeeper_crypto::KdfParams;

/// Durable storage key holding the serialized entry snapshot.
pub const DEFAULT_DURABLE_KEY: &str = "seedkeeper_wallet_data";

/// Volatile storage key holding the session auto-passphrase.
pub const DEFAULT_VOLATILE_KEY: &str = "seedkeeper_session_key";

/// Configuration for a [`crate::SeedRegistry`] instance.
///
/// Defaults carry the production constants: 24-hour entry expiry with an
/// hourly sweep, and a fixed 60-second window allowing 5 retrieval attempts.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Durable key under which the entry snapshot is persisted.
    pub durable_key: String,
    /// Volatile key under which the session passphrase is cached.
    pub volatile_key: String,
    /// Entries idle longer than this are removed by the expiry sweep.
    pub max_entry_age: Duration,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
    /// Maximum retrieval attempts per rate-limit window.
    pub max_attempts: u32,
    /// Length of the fixed rate-limit window.
    pub attempt_window: Duration,
    /// Key-derivation parameters used for all entries.
    pub kdf_params: KdfParams,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            durable_key: DEFAULT_DURABLE_KEY.to_string(),
            volatile_key: DEFAULT_VOLATILE_KEY.to_string(),
            max_entry_age: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            max_attempts: 5,
            attempt_window: Duration::from_secs(60),
            kdf_params: KdfParams::standard(),
        }
    }
}
