//! Reconnection decision flow.
//!
//! At startup the wallet session asks whether a previously stored seed can
//! be silently restored or requires explicit password entry. A durable
//! pointer key remembers the active reference across sessions; this module
//! walks the decision states:
//!
//! `NoStoredSecret` -> `CheckingCustody` -> { `AutoRestorable`,
//! `AwaitingPassword` } -> `Restored` | `Abandoned`
//!
//! The transient states (`CheckingCustody`, `AutoRestorable`) resolve
//! inside [`ReconnectFlow::begin`]; callers only observe the resting states
//! carried by [`Reconnect`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::{Custody, SeedRegistry};
use seedkeeper_common::{CustodyMode, ReferenceId, Result, SecretString};
use seedkeeper_storage::DurableKv;

/// Durable key holding the reference of the active wallet seed.
pub const DEFAULT_POINTER_KEY: &str = "seedkeeper_seed_ref";

/// Resting state of the reconnection flow.
#[derive(Debug)]
pub enum Reconnect {
    /// No durable reference present; nothing to restore.
    NoStoredSecret,
    /// The stored entry needs a caller-supplied passphrase. No decryption
    /// is attempted until one arrives via [`ReconnectFlow::submit_password`].
    AwaitingPassword {
        /// Pending reference, kept so the caller can submit or cancel.
        reference: ReferenceId,
    },
    /// The seed was recovered and can be handed to the wallet session.
    Restored {
        /// The restored reference; its pointer stays persisted.
        reference: ReferenceId,
        /// Recovered plaintext seed.
        secret: SecretString,
    },
    /// The stored reference was given up on and its pointer removed.
    Abandoned,
}

/// Drives reconnection decisions against a [`SeedRegistry`].
pub struct ReconnectFlow<'a> {
    registry: &'a SeedRegistry,
    durable: Arc<dyn DurableKv>,
    pointer_key: String,
}

impl<'a> ReconnectFlow<'a> {
    /// Create a flow over the given registry and durable store.
    pub fn new(registry: &'a SeedRegistry, durable: Arc<dyn DurableKv>) -> Self {
        Self {
            registry,
            durable,
            pointer_key: DEFAULT_POINTER_KEY.to_string(),
        }
    }

    /// Use a non-default durable key for the reference pointer.
    pub fn with_pointer_key(mut self, key: impl Into<String>) -> Self {
        self.pointer_key = key.into();
        self
    }

    /// Persist `reference` as the active seed, to be restored next startup.
    pub async fn remember(&self, reference: &ReferenceId) -> Result<()> {
        self.durable.set(&self.pointer_key, reference.as_str()).await
    }

    /// Remove the persisted reference pointer.
    pub async fn forget(&self) -> Result<()> {
        self.durable.remove(&self.pointer_key).await
    }

    /// Resolve the startup decision.
    ///
    /// - no pointer: `NoStoredSecret`
    /// - pointer to an unknown or expired entry: pointer removed, `Abandoned`
    /// - auto-custody entry: retrieval is attempted immediately; success is
    ///   `Restored`, failure (abnormal) removes the pointer and yields
    ///   `Abandoned`
    /// - custom-custody entry: `AwaitingPassword`, nothing is decrypted
    pub async fn begin(&self) -> Result<Reconnect> {
        let Some(raw) = self.durable.get(&self.pointer_key).await? else {
            return Ok(Reconnect::NoStoredSecret);
        };
        let Ok(reference) = ReferenceId::new(raw) else {
            self.forget().await?;
            return Ok(Reconnect::Abandoned);
        };

        let Some(info) = self.registry.describe(&reference).await? else {
            debug!(reference = %reference, "stored reference no longer known");
            self.forget().await?;
            return Ok(Reconnect::Abandoned);
        };

        match info.custody_mode {
            CustodyMode::Auto => match self.registry.retrieve(&reference, Custody::Auto).await {
                Ok(Some(secret)) => {
                    info!(reference = %reference, "wallet seed auto-restored");
                    Ok(Reconnect::Restored { reference, secret })
                }
                Ok(None) => {
                    self.forget().await?;
                    Ok(Reconnect::Abandoned)
                }
                Err(err) => {
                    warn!(reference = %reference, %err, "auto-restore failed; abandoning reference");
                    self.forget().await?;
                    Ok(Reconnect::Abandoned)
                }
            },
            CustodyMode::Custom => Ok(Reconnect::AwaitingPassword { reference }),
        }
    }

    /// Attempt restoration of a pending reference with a caller-supplied
    /// passphrase.
    ///
    /// # Errors
    /// - `DecryptionFailed` on a wrong passphrase: the pointer is kept so
    ///   the caller can re-prompt
    /// - `RateLimited` when attempts are exhausted
    pub async fn submit_password(
        &self,
        reference: &ReferenceId,
        passphrase: &str,
    ) -> Result<Reconnect> {
        match self
            .registry
            .retrieve(reference, Custody::Custom(passphrase))
            .await?
        {
            Some(secret) => {
                info!(reference = %reference, "wallet seed restored with password");
                Ok(Reconnect::Restored {
                    reference: reference.clone(),
                    secret,
                })
            }
            None => {
                self.forget().await?;
                Ok(Reconnect::Abandoned)
            }
        }
    }

    /// Give up on a pending reference without ever capturing a passphrase.
    ///
    /// Treated as an explicit logout: the pointer is removed.
    pub async fn cancel(&self) -> Result<Reconnect> {
        self.forget().await?;
        Ok(Reconnect::Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use seedkeeper_common::Error;
    use seedkeeper_crypto::KdfParams;
    use seedkeeper_storage::MemoryKv;

    const SEED: &str = "1A2B3C4D5E6F70811A2B3C4D5E6F70811A2B3C4D5E6F70811A2B3C4D5E6F7081";

    fn test_registry() -> (SeedRegistry, MemoryKv) {
        let durable = MemoryKv::new();
        let config = RegistryConfig {
            kdf_params: KdfParams { iterations: 1_000 },
            ..RegistryConfig::default()
        };
        let registry = SeedRegistry::new(
            config,
            Arc::new(durable.clone()),
            Arc::new(MemoryKv::new()),
        );
        (registry, durable)
    }

    #[tokio::test]
    async fn test_no_pointer_means_no_stored_secret() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable));

        assert!(matches!(flow.begin().await.unwrap(), Reconnect::NoStoredSecret));
    }

    #[tokio::test]
    async fn test_auto_entry_restores_silently() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable.clone()));

        let reference = registry.store(SEED, Custody::Auto).await.unwrap();
        flow.remember(&reference).await.unwrap();

        match flow.begin().await.unwrap() {
            Reconnect::Restored { reference: restored, secret } => {
                assert_eq!(restored, reference);
                assert_eq!(secret.as_str(), SEED);
            }
            other => panic!("expected Restored, got {:?}", other),
        }

        // Restoration keeps the pointer for the next startup
        assert!(durable.get(DEFAULT_POINTER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_custom_entry_awaits_password() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable.clone()));

        let reference = registry.store(SEED, Custody::Custom("hunter2")).await.unwrap();
        flow.remember(&reference).await.unwrap();

        let pending = match flow.begin().await.unwrap() {
            Reconnect::AwaitingPassword { reference } => reference,
            other => panic!("expected AwaitingPassword, got {:?}", other),
        };
        assert_eq!(pending, reference);

        // A wrong passphrase propagates and keeps the pointer for re-prompting
        let wrong = flow.submit_password(&pending, "hunter3").await;
        assert!(matches!(wrong, Err(Error::DecryptionFailed)));
        assert!(durable.get(DEFAULT_POINTER_KEY).await.unwrap().is_some());

        match flow.submit_password(&pending, "hunter2").await.unwrap() {
            Reconnect::Restored { secret, .. } => assert_eq!(secret.as_str(), SEED),
            other => panic!("expected Restored, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_is_logout() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable.clone()));

        let reference = registry.store(SEED, Custody::Custom("hunter2")).await.unwrap();
        flow.remember(&reference).await.unwrap();

        assert!(matches!(flow.cancel().await.unwrap(), Reconnect::Abandoned));
        assert_eq!(durable.get(DEFAULT_POINTER_KEY).await.unwrap(), None);
        assert!(matches!(flow.begin().await.unwrap(), Reconnect::NoStoredSecret));
    }

    #[tokio::test]
    async fn test_stale_pointer_abandoned() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable.clone()));

        // Pointer to a reference the registry never heard of
        flow.remember(&ReferenceId::generate()).await.unwrap();

        assert!(matches!(flow.begin().await.unwrap(), Reconnect::Abandoned));
        assert_eq!(durable.get(DEFAULT_POINTER_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_custom_pointer_key() {
        let (registry, durable) = test_registry();
        let flow = ReconnectFlow::new(&registry, Arc::new(durable.clone()))
            .with_pointer_key("other_ref");

        let reference = registry.store(SEED, Custody::Auto).await.unwrap();
        flow.remember(&reference).await.unwrap();

        assert!(durable.get("other_ref").await.unwrap().is_some());
        assert!(matches!(flow.begin().await.unwrap(), Reconnect::Restored { .. }));
    }
}
