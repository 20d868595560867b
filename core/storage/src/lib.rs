//! Storage abstraction for SeedKeeper.
//!
//! The custody registry persists state through two narrow key-value
//! interfaces so it stays storage-agnostic and testable with in-memory
//! fakes:
//! - [`DurableKv`]: per-origin durable storage (survives restarts)
//! - [`VolatileKv`]: tab-scoped volatile storage (survives reloads only)
//!
//! # Design Principles
//! - Backend isolation: no backend-specific logic in registry or crypto
//! - Async operations: all I/O is async
//! - Key names are stored in the clear; only secret payloads are encrypted

pub mod kv;
pub mod local;
pub mod memory;

pub use kv::{DurableKv, VolatileKv};
pub use local::FileKv;
pub use memory::MemoryKv;
