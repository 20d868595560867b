//! Key derivation using PBKDF2-HMAC-SHA-256.
//!
//! PBKDF2 is computationally expensive by design to resist offline
//! brute-force attacks against a captured ciphertext bundle.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::keys::{Salt, SealKey, KEY_LENGTH};
use seedkeeper_common::{Error, Result};

/// Parameters for PBKDF2 key derivation.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Number of PBKDF2 iterations.
    pub iterations: u32,
}

impl KdfParams {
    /// Production parameters (OWASP target for PBKDF2-HMAC-SHA-256).
    pub fn standard() -> Self {
        Self {
            iterations: 310_000,
        }
    }

    /// Minimum acceptable parameters for interactive use.
    pub fn interactive() -> Self {
        Self {
            iterations: 100_000,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Derive a 256-bit seal key from a passphrase and salt.
///
/// # Preconditions
/// - `passphrase` must not be empty
/// - `params.iterations` must be non-zero
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if passphrase is empty or iterations is zero
///
/// # Security
/// - Passphrase is not stored or logged
/// - Key material is zeroized when the returned key drops
pub fn derive_key(passphrase: &str, salt: &Salt, params: &KdfParams) -> Result<SealKey> {
    if passphrase.is_empty() {
        return Err(Error::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }
    if params.iterations == 0 {
        return Err(Error::Crypto("KDF iteration count is zero".to_string()));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut key_bytes,
    );

    Ok(SealKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = Salt::from_bytes([42u8; 16]);

        let key1 = derive_key("test-passphrase-123", &salt, &fast_params()).unwrap();
        let key2 = derive_key("test-passphrase-123", &salt, &fast_params()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let salt1 = Salt::from_bytes([1u8; 16]);
        let salt2 = Salt::from_bytes([2u8; 16]);

        let key1 = derive_key("test-passphrase-123", &salt1, &fast_params()).unwrap();
        let key2 = derive_key("test-passphrase-123", &salt2, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_passphrase() {
        let salt = Salt::from_bytes([42u8; 16]);

        let key1 = derive_key("passphrase1", &salt, &fast_params()).unwrap();
        let key2 = derive_key("passphrase2", &salt, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_empty_passphrase_fails() {
        let salt = Salt::generate();
        assert!(derive_key("", &salt, &fast_params()).is_err());
    }

    #[test]
    fn test_derive_key_zero_iterations_fails() {
        let salt = Salt::generate();
        let params = KdfParams { iterations: 0 };
        assert!(derive_key("passphrase", &salt, &params).is_err());
    }
}
