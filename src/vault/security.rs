//! The security vault: a keystore-backed secret store.
//!
//! `SecurityVault` is the interface the property resolver and the admin
//! tool depend on. `KeyStoreVault` implements it on top of a `.pvks`
//! container: the admin key lives in a key entry, and every secret is a
//! sealed entry encrypted under that key.

use std::path::Path;

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::handle::SecretHandle;
use crate::config::VaultConfiguration;
use crate::crypto::{AdminKey, EncryptionEngine};
use crate::errors::{Result, VaultError};
use crate::keystore::{create_store, load_store, KeyStore, SealedEntry};
use crate::properties::Properties;

/// A secret store addressed by [`SecretHandle`].
///
/// Every operation except `init` and `is_initialized` fails with
/// [`VaultError::NotInitialized`] until `init` has succeeded.
pub trait SecurityVault: Send + Sync {
    /// Open (or create) the backing store described by `options`.
    ///
    /// On failure the vault stays uninitialized.
    fn init(&mut self, options: &Properties) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Encrypt and persist `plaintext` under `handle`, replacing any
    /// previous value.
    fn store(&mut self, handle: &SecretHandle, plaintext: &[u8]) -> Result<()>;

    /// Decrypt the value stored under `handle`.
    fn retrieve(&self, handle: &SecretHandle) -> Result<Zeroizing<Vec<u8>>>;

    fn exists(&self, handle: &SecretHandle) -> Result<bool>;

    fn remove(&mut self, handle: &SecretHandle) -> Result<()>;

    /// All stored handles, sorted.
    fn handles(&self) -> Result<Vec<SecretHandle>>;

    /// [`retrieve`](Self::retrieve) the value as UTF-8 text.
    fn retrieve_text(&self, handle: &SecretHandle) -> Result<Zeroizing<String>> {
        let bytes = self.retrieve(handle)?;
        std::str::from_utf8(&bytes)
            .map(|s| Zeroizing::new(s.to_string()))
            .map_err(|_| VaultError::NotUtf8)
    }
}

/// Production [`SecurityVault`] backed by a keystore file.
#[derive(Default)]
pub struct KeyStoreVault {
    state: VaultState,
}

#[derive(Default)]
enum VaultState {
    #[default]
    Uninitialized,
    Ready(Box<ReadyVault>),
}

struct ReadyVault {
    config: VaultConfiguration,
    engine: EncryptionEngine,
    store: KeyStore,
    admin_key: AdminKey,
}

impl KeyStoreVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self) -> Result<&ReadyVault> {
        match &self.state {
            VaultState::Ready(ready) => Ok(ready),
            VaultState::Uninitialized => Err(VaultError::NotInitialized),
        }
    }

    fn ready_mut(&mut self) -> Result<&mut ReadyVault> {
        match &mut self.state {
            VaultState::Ready(ready) => Ok(ready),
            VaultState::Uninitialized => Err(VaultError::NotInitialized),
        }
    }

    /// Build the ready state without touching `self`, so a failure
    /// leaves the vault uninitialized.
    fn open(options: &Properties) -> Result<ReadyVault> {
        let config = VaultConfiguration::from_properties(options)?;
        let engine = EncryptionEngine::new(config.encryption_algorithm, config.key_size);
        let path = config.keystore_url.as_path();
        let password = config.keystore_password().as_bytes();

        let (mut store, mut dirty) = if path.exists() {
            (load_store(path, password)?, false)
        } else {
            info!(path = %path.display(), "creating new keystore");
            (create_store(&config.keystore_type, password, &config.kdf)?, true)
        };

        let admin_key = if store.contains_key(&config.admin_alias) {
            store.get_secret_key(&config.admin_alias, password)?
        } else {
            info!(alias = %config.admin_alias, "generating admin key");
            let key = engine.generate_key();
            store.put_secret_key(&config.admin_alias, &key, password)?;
            dirty = true;
            key
        };

        if admin_key.bit_len() != engine.key_size().bits() {
            return Err(VaultError::KeySizeMismatch {
                expected: engine.key_size().bits(),
                actual: admin_key.bit_len(),
            });
        }

        if dirty {
            store.save(path)?;
        }

        Ok(ReadyVault {
            config,
            engine,
            store,
            admin_key,
        })
    }
}

impl ReadyVault {
    fn path(&self) -> &Path {
        &self.config.keystore_url
    }

    /// Persist the container; on failure put `name` back the way it was.
    fn persist_or_restore(&mut self, name: &str, previous: Option<SealedEntry>) -> Result<()> {
        let saved = self.store.save(&self.config.keystore_url);
        if let Err(e) = saved {
            match previous {
                Some(entry) => self.store.restore_sealed(name, entry),
                None => {
                    self.store.remove_sealed(name);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl SecurityVault for KeyStoreVault {
    fn init(&mut self, options: &Properties) -> Result<()> {
        if self.is_initialized() {
            return Err(VaultError::AlreadyInitialized);
        }

        let ready = Self::open(options)?;
        debug!(
            path = %ready.path().display(),
            alias = %ready.config.admin_alias,
            algorithm = %ready.engine.algorithm(),
            key_bits = ready.engine.key_size().bits(),
            "security vault initialized"
        );
        self.state = VaultState::Ready(Box::new(ready));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        matches!(self.state, VaultState::Ready(_))
    }

    fn store(&mut self, handle: &SecretHandle, plaintext: &[u8]) -> Result<()> {
        let ready = self.ready_mut()?;
        let name = handle.entry_name();

        let ciphertext = ready
            .engine
            .encrypt(Some(plaintext), Some(&ready.admin_key))?;

        let previous = ready.store.get_sealed(&name).cloned();
        ready.store.put_sealed(&name, ciphertext);
        ready.persist_or_restore(&name, previous)?;

        debug!(%handle, "secret stored");
        Ok(())
    }

    fn retrieve(&self, handle: &SecretHandle) -> Result<Zeroizing<Vec<u8>>> {
        let ready = self.ready()?;
        let entry = ready
            .store
            .get_sealed(&handle.entry_name())
            .ok_or_else(|| VaultError::NotFound(handle.clone()))?;

        let plaintext = ready
            .engine
            .decrypt(Some(&entry.ciphertext), Some(&ready.admin_key))?;
        Ok(Zeroizing::new(plaintext))
    }

    fn exists(&self, handle: &SecretHandle) -> Result<bool> {
        Ok(self.ready()?.store.contains_sealed(&handle.entry_name()))
    }

    fn remove(&mut self, handle: &SecretHandle) -> Result<()> {
        let ready = self.ready_mut()?;
        let name = handle.entry_name();

        let previous = ready
            .store
            .get_sealed(&name)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(handle.clone()))?;
        ready.store.remove_sealed(&name);
        ready.persist_or_restore(&name, Some(previous))?;

        debug!(%handle, "secret removed");
        Ok(())
    }

    fn handles(&self) -> Result<Vec<SecretHandle>> {
        let ready = self.ready()?;
        let mut handles: Vec<SecretHandle> = ready
            .store
            .sealed_names()
            .filter_map(SecretHandle::from_entry_name)
            .collect();
        handles.sort();
        Ok(handles)
    }
}
