//! Cryptographic engine for SeedKeeper.
//!
//! This module provides:
//! - Key derivation using PBKDF2-HMAC-SHA-256
//! - Authenticated encryption using AES-256-GCM
//! - Secure key management with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption fails closed on any authentication failure

pub mod aead;
pub mod kdf;
pub mod keys;

pub use aead::{decrypt, encrypt, SealedSecret, IV_LENGTH, TAG_LENGTH};
pub use kdf::{derive_key, KdfParams};
pub use keys::{Salt, SealKey, KEY_LENGTH, SALT_LENGTH};
