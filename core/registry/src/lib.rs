//! Custody registry for SeedKeeper.
//!
//! This module provides:
//! - The [`SeedRegistry`] lifecycle API: store, retrieve, describe, wipe
//! - Passphrase acquisition policy (session-auto vs caller-supplied)
//! - Retrieval rate limiting and background entry expiry
//! - The reconnection state machine consumed by the wallet session
//!
//! # Architecture
//! The registry sits between the wallet session and the storage backends,
//! owning the in-memory entry map and mediating every access to encrypted
//! seed material.

pub mod config;
pub mod entry;
pub mod reconnect;
pub mod registry;

pub use config::RegistryConfig;
pub use entry::EntryInfo;
pub use reconnect::{Reconnect, ReconnectFlow};
pub use registry::{Custody, SeedRegistry};
