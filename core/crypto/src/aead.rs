//! Authenticated encryption using AES-256-GCM.
//!
//! Each encryption generates a fresh random salt and IV, and returns the
//! salt prepended to the ciphertext so that decryption is self-contained
//! given the bundle, the IV, and the passphrase.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm,
};

use crate::kdf::{derive_key, KdfParams};
use crate::keys::{Salt, SALT_LENGTH};
use seedkeeper_common::{Error, Result};

/// IV (nonce) size for AES-256-GCM (12 bytes).
pub const IV_LENGTH: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_LENGTH: usize = 16;

/// Output of a single encryption.
#[derive(Debug, Clone)]
pub struct SealedSecret {
    /// Salt prepended to the authenticated ciphertext: salt || ciphertext || tag.
    pub bundle: Vec<u8>,
    /// IV used for this encryption; fresh per call, never reused.
    pub iv: [u8; IV_LENGTH],
}

/// Encrypt a plaintext secret under a passphrase.
///
/// # Preconditions
/// - `passphrase` must not be empty
///
/// # Postconditions
/// - Returns salt || ciphertext || tag as one bundle, plus the IV
/// - Salt and IV are randomly generated per call
///
/// # Errors
/// - Returns error if key derivation or encryption fails
///
/// # Security
/// - A fresh salt and IV are generated on every call, so encrypting the
///   same plaintext twice yields unrelated ciphertexts
pub fn encrypt(plaintext: &str, passphrase: &str, params: &KdfParams) -> Result<SealedSecret> {
    let salt = Salt::generate();
    let key = derive_key(passphrase, &salt, params)?;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| Error::Crypto("Encryption failed".to_string()))?;

    // Prepend salt to ciphertext
    let mut bundle = Vec::with_capacity(SALT_LENGTH + ciphertext.len());
    bundle.extend_from_slice(salt.as_bytes());
    bundle.extend_from_slice(&ciphertext);

    let mut iv = [0u8; IV_LENGTH];
    iv.copy_from_slice(&nonce);

    Ok(SealedSecret { bundle, iv })
}

/// Decrypt a ciphertext bundle under a passphrase.
///
/// # Preconditions
/// - `bundle` must be salt || ciphertext || tag as produced by [`encrypt`]
/// - `iv` must be the IV returned alongside the bundle
///
/// # Postconditions
/// - Returns the original plaintext only if the authentication tag verifies
///
/// # Errors
/// - `DecryptionFailed` on tag mismatch, truncated bundle, wrong passphrase,
///   or tampered data; never returns garbage plaintext
/// - `InvalidInput` if the IV has the wrong length
pub fn decrypt(bundle: &[u8], iv: &[u8], passphrase: &str, params: &KdfParams) -> Result<String> {
    if iv.len() != IV_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Invalid IV length: expected {}, got {}",
            IV_LENGTH,
            iv.len()
        )));
    }
    if bundle.len() < SALT_LENGTH + TAG_LENGTH {
        // Too short to contain a salt and an authenticated ciphertext
        return Err(Error::DecryptionFailed);
    }

    let (salt_bytes, ciphertext) = bundle.split_at(SALT_LENGTH);
    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(salt_bytes);

    let key = derive_key(passphrase, &Salt::from_bytes(salt), params)?;
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    let plaintext = cipher
        .decrypt(GenericArray::from_slice(iv), ciphertext)
        .map_err(|_| Error::DecryptionFailed)?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::Crypto("Decrypted data is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fast_params() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let sealed = encrypt("Hello, World!", "passphrase", &fast_params()).unwrap();
        let plaintext = decrypt(&sealed.bundle, &sealed.iv, "passphrase", &fast_params()).unwrap();

        assert_eq!(plaintext, "Hello, World!");
    }

    #[test]
    fn test_seed_roundtrip() {
        // 64-hex-char wallet seed, the primary payload of the custody engine
        let seed = "1A2B".repeat(16);
        assert_eq!(seed.len(), 64);

        let sealed = encrypt(&seed, "passphrase", &fast_params()).unwrap();
        let plaintext = decrypt(&sealed.bundle, &sealed.iv, "passphrase", &fast_params()).unwrap();

        assert_eq!(plaintext, seed);
    }

    #[test]
    fn test_bundle_layout() {
        let sealed = encrypt("Test message", "passphrase", &fast_params()).unwrap();

        // Bundle is salt + plaintext + tag; IV travels separately
        assert_eq!(sealed.bundle.len(), SALT_LENGTH + "Test message".len() + TAG_LENGTH);
        assert_eq!(sealed.iv.len(), IV_LENGTH);
    }

    #[test]
    fn test_fresh_salt_and_iv_each_time() {
        let s1 = encrypt("Same plaintext", "passphrase", &fast_params()).unwrap();
        let s2 = encrypt("Same plaintext", "passphrase", &fast_params()).unwrap();

        // Salts should be different
        assert_ne!(&s1.bundle[..SALT_LENGTH], &s2.bundle[..SALT_LENGTH]);
        // IVs should be different
        assert_ne!(s1.iv, s2.iv);
        // Ciphertexts should be different
        assert_ne!(s1.bundle, s2.bundle);
    }

    #[test]
    fn test_wrong_passphrase_fails_closed() {
        let sealed = encrypt("Secret data", "hunter2", &fast_params()).unwrap();
        let result = decrypt(&sealed.bundle, &sealed.iv, "hunter3", &fast_params());

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_bundle_fails() {
        let mut sealed = encrypt("Important data", "passphrase", &fast_params()).unwrap();
        // Flip a bit inside the ciphertext portion
        let idx = SALT_LENGTH + 3;
        sealed.bundle[idx] ^= 0xFF;

        let result = decrypt(&sealed.bundle, &sealed.iv, "passphrase", &fast_params());
        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_salt_fails() {
        let mut sealed = encrypt("Important data", "passphrase", &fast_params()).unwrap();
        sealed.bundle[0] ^= 0xFF;

        let result = decrypt(&sealed.bundle, &sealed.iv, "passphrase", &fast_params());
        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_truncated_bundle_fails() {
        let sealed = encrypt("data", "passphrase", &fast_params()).unwrap();
        let result = decrypt(&sealed.bundle[..SALT_LENGTH + 4], &sealed.iv, "passphrase", &fast_params());

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_wrong_iv_length_rejected() {
        let sealed = encrypt("data", "passphrase", &fast_params()).unwrap();
        let result = decrypt(&sealed.bundle, &sealed.iv[..8], "passphrase", &fast_params());

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_plaintext() {
        let sealed = encrypt("", "passphrase", &fast_params()).unwrap();
        let plaintext = decrypt(&sealed.bundle, &sealed.iv, "passphrase", &fast_params()).unwrap();

        assert_eq!(plaintext, "");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_roundtrip(plaintext in ".{0,128}", passphrase in "[a-zA-Z0-9]{1,32}") {
            let params = fast_params();
            let sealed = encrypt(&plaintext, &passphrase, &params).unwrap();
            let recovered = decrypt(&sealed.bundle, &sealed.iv, &passphrase, &params).unwrap();
            prop_assert_eq!(recovered, plaintext);
        }
    }
}
