//! The custody registry: lifecycle of encrypted seed entries.
//!
//! Owns the in-memory entry map, mirrors it to durable storage as a JSON
//! snapshot, mediates passphrase acquisition, throttles retrieval attempts,
//! and expires idle entries on a background task.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::entry::{EntryInfo, PersistedEntry, SecretEntry, Snapshot};
use seedkeeper_common::{CustodyMode, Error, ReferenceId, Result, SecretString};
use seedkeeper_crypto::{decrypt, encrypt};
use seedkeeper_storage::{DurableKv, VolatileKv};

/// How the passphrase for an operation is obtained.
///
/// Resolved exactly once at the top of `store`/`retrieve`: a supplied
/// passphrase always wins, otherwise the session auto-passphrase is used.
#[derive(Debug, Clone, Copy)]
pub enum Custody<'a> {
    /// Use the session-scoped auto-generated passphrase.
    Auto,
    /// Use a caller-supplied passphrase.
    Custom(&'a str),
}

impl Custody<'_> {
    /// The custody mode recorded on entries created under this resolution.
    pub fn mode(&self) -> CustodyMode {
        match self {
            Custody::Auto => CustodyMode::Auto,
            Custody::Custom(_) => CustodyMode::Custom,
        }
    }
}

/// Process-wide retrieval throttle: a fixed window, not a sliding one.
#[derive(Debug, Default)]
struct AttemptWindow {
    count: u32,
    window_started: Option<Instant>,
}

impl AttemptWindow {
    /// Count one attempt. Fails once more than `max_attempts` fall inside
    /// the current window; the window resets only after it fully elapses.
    fn check(&mut self, now: Instant, window: Duration, max_attempts: u32) -> Result<()> {
        match self.window_started {
            Some(started) if now.duration_since(started) < window => {
                self.count += 1;
                if self.count > max_attempts {
                    let remaining = window.saturating_sub(now.duration_since(started));
                    return Err(Error::RateLimited {
                        retry_after_secs: remaining.as_secs().max(1),
                    });
                }
            }
            _ => {
                self.window_started = Some(now);
                self.count = 1;
            }
        }
        Ok(())
    }
}

/// Mutable registry state behind one lock. Within a single operation there
/// is no yield between reading an entry and updating it, so no caller can
/// observe a half-updated entry.
#[derive(Default)]
struct RegistryState {
    entries: HashMap<ReferenceId, SecretEntry>,
    session_passphrase: Option<SecretString>,
    attempts: AttemptWindow,
}

struct Inner {
    config: RegistryConfig,
    durable: Arc<dyn DurableKv>,
    volatile: Arc<dyn VolatileKv>,
    state: RwLock<RegistryState>,
    init: OnceCell<()>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// The custody registry.
///
/// One instance owns all stored entries, the session passphrase, and the
/// rate-limit counter; collaborators receive it by reference rather than
/// through ambient singletons, so tests can run isolated registries side
/// by side.
pub struct SeedRegistry {
    inner: Arc<Inner>,
}

impl SeedRegistry {
    /// Create a registry over the given storage backends.
    ///
    /// No I/O happens here; the durable snapshot is loaded lazily by
    /// [`SeedRegistry::ensure_initialized`] (which every operation calls).
    pub fn new(
        config: RegistryConfig,
        durable: Arc<dyn DurableKv>,
        volatile: Arc<dyn VolatileKv>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                durable,
                volatile,
                state: RwLock::new(RegistryState::default()),
                init: OnceCell::new(),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Idempotent one-time load of the durable snapshot.
    ///
    /// Concurrent callers before the first load completes all await the
    /// same single load; none observes partial state. A corrupted snapshot
    /// is discarded wholesale (logged, never fatal) and its durable key
    /// removed. The first successful call also starts the background
    /// expiry sweep.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.inner
            .init
            .get_or_try_init(|| self.inner.load_snapshot())
            .await?;
        self.start_sweeper();
        Ok(())
    }

    /// Encrypt and store a plaintext secret, returning its opaque reference.
    ///
    /// # Postconditions
    /// - The entry is persisted in the durable snapshot
    /// - Expired entries are opportunistically swept
    ///
    /// # Errors
    /// - Encryption or storage failure
    /// - Empty custom passphrase
    pub async fn store(&self, plaintext: &str, custody: Custody<'_>) -> Result<ReferenceId> {
        self.ensure_initialized().await?;

        let mode = custody.mode();
        let passphrase = self.inner.resolve_passphrase(custody).await?;
        let sealed = encrypt(plaintext, passphrase.as_str(), &self.inner.config.kdf_params)?;

        let reference = ReferenceId::generate();
        {
            let mut state = self.inner.state.write().await;
            state.entries.insert(
                reference.clone(),
                SecretEntry {
                    bundle: sealed.bundle,
                    iv: sealed.iv.to_vec(),
                    custody_mode: mode,
                    last_accessed: Instant::now(),
                },
            );
        }

        self.inner.sweep_expired().await?;
        self.inner.persist_snapshot().await?;

        debug!(reference = %reference, mode = ?mode, "secret stored");
        Ok(reference)
    }

    /// Decrypt and return the secret behind `reference`.
    ///
    /// Returns `None` for an unknown reference; that is an expected miss,
    /// checked before the rate limiter. Known references count against the
    /// process-wide attempt window and bump `last_accessed`.
    ///
    /// # Errors
    /// - `RateLimited` once the attempt window is exhausted
    /// - `DecryptionFailed` on a wrong passphrase or corrupted entry
    pub async fn retrieve(
        &self,
        reference: &ReferenceId,
        custody: Custody<'_>,
    ) -> Result<Option<SecretString>> {
        self.ensure_initialized().await?;

        let (bundle, iv) = {
            let mut guard = self.inner.state.write().await;
            let state = &mut *guard;
            if !state.entries.contains_key(reference) {
                return Ok(None);
            }
            state.attempts.check(
                Instant::now(),
                self.inner.config.attempt_window,
                self.inner.config.max_attempts,
            )?;
            let Some(entry) = state.entries.get_mut(reference) else {
                return Ok(None);
            };
            entry.last_accessed = Instant::now();
            (entry.bundle.clone(), entry.iv.clone())
        };

        let passphrase = self.inner.resolve_passphrase(custody).await?;
        let plaintext = decrypt(&bundle, &iv, passphrase.as_str(), &self.inner.config.kdf_params)?;

        debug!(reference = %reference, "secret retrieved");
        Ok(Some(SecretString::new(plaintext)))
    }

    /// Metadata lookup without touching secret material or the limiter.
    pub async fn describe(&self, reference: &ReferenceId) -> Result<Option<EntryInfo>> {
        self.ensure_initialized().await?;

        let state = self.inner.state.read().await;
        Ok(state.entries.get(reference).map(|entry| EntryInfo {
            custody_mode: entry.custody_mode,
            last_accessed: entry.last_accessed,
        }))
    }

    /// Remove entries idle beyond the configured max age and re-persist.
    ///
    /// Expiry is silent: no caller is interrupted, and a later retrieval of
    /// an expired reference simply returns `None`. Also runs on a
    /// background task and after every [`SeedRegistry::store`].
    pub async fn sweep_expired(&self) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.sweep_expired().await
    }

    /// Clear all custody state, in memory and persisted.
    ///
    /// In-memory ciphertext and IV buffers are overwritten with random
    /// bytes before being discarded. Best-effort hardening against memory
    /// inspection, not a guarantee against full process access.
    pub async fn wipe(&self) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            let mut rng = rand::thread_rng();
            for entry in state.entries.values_mut() {
                rng.fill_bytes(&mut entry.bundle);
                rng.fill_bytes(&mut entry.iv);
            }
            state.entries.clear();
            // SecretString zeroizes on drop
            state.session_passphrase = None;
        }

        self.inner.durable.remove(&self.inner.config.durable_key).await?;
        self.inner
            .volatile
            .remove(&self.inner.config.volatile_key)
            .await?;

        info!("custody registry wiped");
        Ok(())
    }

    /// Stop the background sweep and wipe all state.
    ///
    /// For tearing the custody engine down entirely, not for a single
    /// wallet disconnect (that is [`SeedRegistry::wipe`]).
    pub async fn destroy(&self) -> Result<()> {
        self.stop_sweeper();
        self.wipe().await
    }

    fn start_sweeper(&self) {
        let mut guard = self.inner.sweeper.lock().unwrap();
        if guard.is_some() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval;
        *guard = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick of an interval fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if let Err(err) = inner.sweep_expired().await {
                    warn!(%err, "background expiry sweep failed");
                }
            }
        }));
    }

    fn stop_sweeper(&self) {
        if let Some(handle) = self.inner.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for SeedRegistry {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

impl Inner {
    async fn load_snapshot(&self) -> Result<()> {
        let Some(raw) = self.durable.get(&self.config.durable_key).await? else {
            return Ok(());
        };

        let snapshot: Snapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // Corrupted durable data is discarded wholesale rather than
                // partially trusted.
                warn!(%err, "discarding corrupt custody snapshot");
                self.durable.remove(&self.config.durable_key).await?;
                return Ok(());
            }
        };

        let now = Instant::now();
        let mut state = self.state.write().await;
        for (reference, persisted) in snapshot.entries {
            let Ok(reference) = ReferenceId::new(reference) else {
                continue;
            };
            state.entries.insert(
                reference,
                SecretEntry {
                    bundle: persisted.bundle,
                    iv: persisted.iv,
                    custody_mode: persisted.custody_mode,
                    last_accessed: now,
                },
            );
        }

        debug!(entries = state.entries.len(), "custody snapshot loaded");
        Ok(())
    }

    async fn persist_snapshot(&self) -> Result<()> {
        let raw = {
            let state = self.state.read().await;
            let snapshot = Snapshot {
                entries: state
                    .entries
                    .iter()
                    .map(|(reference, entry)| {
                        (
                            reference.as_str().to_string(),
                            PersistedEntry {
                                bundle: entry.bundle.clone(),
                                iv: entry.iv.clone(),
                                custody_mode: entry.custody_mode,
                            },
                        )
                    })
                    .collect(),
            };
            serde_json::to_string(&snapshot).map_err(|e| Error::Serialization(e.to_string()))?
        };

        self.durable.set(&self.config.durable_key, &raw).await
    }

    async fn sweep_expired(&self) -> Result<()> {
        let removed = {
            let mut state = self.state.write().await;
            let now = Instant::now();
            let max_age = self.config.max_entry_age;
            let before = state.entries.len();
            state
                .entries
                .retain(|_, entry| now.duration_since(entry.last_accessed) <= max_age);
            before - state.entries.len()
        };

        if removed > 0 {
            debug!(removed, "expired custody entries removed");
            self.persist_snapshot().await?;
        }
        Ok(())
    }

    async fn resolve_passphrase(&self, custody: Custody<'_>) -> Result<SecretString> {
        match custody {
            Custody::Custom(passphrase) => {
                if passphrase.is_empty() {
                    return Err(Error::InvalidInput(
                        "Custom passphrase cannot be empty".to_string(),
                    ));
                }
                Ok(SecretString::new(passphrase))
            }
            Custody::Auto => self.session_passphrase().await,
        }
    }

    /// Get the session auto-passphrase, creating it on first use.
    ///
    /// Cached in memory and mirrored to volatile storage so it survives
    /// reloads within the same tab. The write lock arbitrates concurrent
    /// first uses: exactly one candidate wins and is the one persisted, so
    /// every auto entry stays decryptable by the same passphrase.
    async fn session_passphrase(&self) -> Result<SecretString> {
        {
            let state = self.state.read().await;
            if let Some(passphrase) = &state.session_passphrase {
                return Ok(passphrase.clone());
            }
        }

        if let Some(existing) = self.volatile.get(&self.config.volatile_key).await? {
            let mut state = self.state.write().await;
            let passphrase = state
                .session_passphrase
                .get_or_insert_with(|| SecretString::new(existing));
            return Ok(passphrase.clone());
        }

        let candidate = generate_session_passphrase();
        let (passphrase, fresh) = {
            let mut state = self.state.write().await;
            match state.session_passphrase.clone() {
                Some(existing) => (existing, false),
                None => {
                    state.session_passphrase = Some(candidate.clone());
                    (candidate, true)
                }
            }
        };

        if fresh {
            self.volatile
                .set(&self.config.volatile_key, passphrase.as_str())
                .await?;
            debug!("session passphrase generated");
        }
        Ok(passphrase)
    }
}

/// 256 bits of randomness, base64-encoded.
fn generate_session_passphrase() -> SecretString {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretString::new(URL_SAFE_NO_PAD.encode(bytes))
}
