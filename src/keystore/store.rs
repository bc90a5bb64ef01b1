//! The in-memory key container and its access operations.
//!
//! A `KeyStore` is created or loaded with the store password, modified
//! in memory, then written back as a whole with `save`. Two tables live
//! inside it:
//! - **key entries**: secret keys wrapped under a per-entry password;
//! - **sealed entries**: opaque ciphertext owned by the caller (the vault).

use std::path::Path;

use chrono::Utc;
use tracing::debug;
use zeroize::Zeroizing;

use super::format::{
    self, KeyEntry, KeyStoreBody, KeyStoreHeader, SealedEntry, CURRENT_VERSION,
};
use crate::crypto::encryption;
use crate::crypto::kdf::{derive_key, generate_salt, KdfParams};
use crate::crypto::keys::PasswordKey;
use crate::crypto::AdminKey;
use crate::errors::{CryptoError, KeyStoreError};

/// The only container type this crate reads and writes.
pub const DEFAULT_STORE_TYPE: &str = "PVKS";

/// A password-protected container of secret keys and sealed entries.
pub struct KeyStore {
    header: KeyStoreHeader,
    body: KeyStoreBody,
    password_key: PasswordKey,
}

/// Create a new, empty container of `store_type` locked with `password`.
///
/// Nothing touches the disk until [`KeyStore::save`] is called.
pub fn create_store(
    store_type: &str,
    password: &[u8],
    kdf: &KdfParams,
) -> Result<KeyStore, KeyStoreError> {
    if !store_type.eq_ignore_ascii_case(DEFAULT_STORE_TYPE) {
        return Err(KeyStoreError::UnsupportedType(store_type.to_string()));
    }

    let salt = generate_salt();
    let password_key = PasswordKey::new(*derive_key(password, &salt, kdf)?);

    let header = KeyStoreHeader {
        version: CURRENT_VERSION,
        store_type: DEFAULT_STORE_TYPE.to_string(),
        salt: salt.to_vec(),
        kdf: *kdf,
        created_at: Utc::now(),
    };

    Ok(KeyStore {
        header,
        body: KeyStoreBody::default(),
        password_key,
    })
}

/// Open an existing container.
///
/// Fails with [`KeyStoreError::IntegrityCheckFailed`] for a wrong
/// password or a tampered file.
pub fn load_store(path: &Path, password: &[u8]) -> Result<KeyStore, KeyStoreError> {
    let raw = format::read_store(path)?;

    if !raw.header.store_type.eq_ignore_ascii_case(DEFAULT_STORE_TYPE) {
        return Err(KeyStoreError::UnsupportedType(raw.header.store_type));
    }

    let password_key = PasswordKey::new(*derive_key(password, &raw.header.salt, &raw.header.kdf)?);

    let hmac_key = password_key.integrity_key()?;
    format::verify_hmac(
        &hmac_key[..],
        &raw.header_bytes,
        &raw.body_bytes,
        &raw.stored_hmac,
    )?;

    debug!(
        path = %path.display(),
        keys = raw.body.keys.len(),
        sealed = raw.body.sealed.len(),
        "keystore loaded"
    );

    Ok(KeyStore {
        header: raw.header,
        body: raw.body,
        password_key,
    })
}

/// Fetch the secret key stored under `alias`, unwrapping it with `password`.
pub fn get_secret_key(
    store: &KeyStore,
    alias: &str,
    password: &[u8],
) -> Result<AdminKey, KeyStoreError> {
    store.get_secret_key(alias, password)
}

/// Store or overwrite the secret key under `alias`, wrapped with `password`.
pub fn put_secret_key(
    store: &mut KeyStore,
    alias: &str,
    key: &AdminKey,
    password: &[u8],
) -> Result<(), KeyStoreError> {
    store.put_secret_key(alias, key, password)
}

impl KeyStore {
    pub fn store_type(&self) -> &str {
        &self.header.store_type
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.header.kdf
    }

    pub fn contains_key(&self, alias: &str) -> bool {
        self.body.keys.contains_key(alias)
    }

    /// Aliases of all key entries, sorted.
    pub fn key_aliases(&self) -> Vec<String> {
        self.body.keys.keys().cloned().collect()
    }

    pub fn get_secret_key(&self, alias: &str, password: &[u8]) -> Result<AdminKey, KeyStoreError> {
        let entry = self
            .body
            .keys
            .get(alias)
            .ok_or_else(|| KeyStoreError::AliasNotFound(alias.to_string()))?;

        let wrapping_key = Self::entry_wrapping_key(password, &entry.salt, &self.header.kdf, alias)?;

        let key_bytes = encryption::decrypt(&wrapping_key[..], &entry.wrapped).map_err(|e| match e {
            CryptoError::DecryptionFailed => KeyStoreError::IntegrityCheckFailed,
            other => KeyStoreError::Crypto(other),
        })?;

        Ok(AdminKey::from_bytes(key_bytes))
    }

    pub fn put_secret_key(
        &mut self,
        alias: &str,
        key: &AdminKey,
        password: &[u8],
    ) -> Result<(), KeyStoreError> {
        let salt = generate_salt();
        let wrapping_key = Self::entry_wrapping_key(password, &salt, &self.header.kdf, alias)?;
        let wrapped = encryption::encrypt(&wrapping_key[..], key.as_bytes())?;

        self.body.keys.insert(
            alias.to_string(),
            KeyEntry {
                salt: salt.to_vec(),
                wrapped,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sealed entries
    // ------------------------------------------------------------------

    /// Insert or overwrite a sealed entry. `created_at` survives overwrites.
    pub fn put_sealed(&mut self, name: &str, ciphertext: Vec<u8>) {
        let now = Utc::now();
        let created_at = self
            .body
            .sealed
            .get(name)
            .map_or(now, |existing| existing.created_at);

        self.body.sealed.insert(
            name.to_string(),
            SealedEntry {
                ciphertext,
                created_at,
                updated_at: now,
            },
        );
    }

    pub fn get_sealed(&self, name: &str) -> Option<&SealedEntry> {
        self.body.sealed.get(name)
    }

    pub fn contains_sealed(&self, name: &str) -> bool {
        self.body.sealed.contains_key(name)
    }

    /// Put back an entry exactly as it was, timestamps included.
    pub fn restore_sealed(&mut self, name: &str, entry: SealedEntry) {
        self.body.sealed.insert(name.to_string(), entry);
    }

    /// Remove a sealed entry, returning whether it existed.
    pub fn remove_sealed(&mut self, name: &str) -> bool {
        self.body.sealed.remove(name).is_some()
    }

    /// Names of all sealed entries, sorted.
    pub fn sealed_names(&self) -> impl Iterator<Item = &str> {
        self.body.sealed.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole container to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), KeyStoreError> {
        let hmac_key = self.password_key.integrity_key()?;
        format::write_store(path, &self.header, &self.body, &hmac_key[..])?;
        debug!(path = %path.display(), "keystore saved");
        Ok(())
    }

    fn entry_wrapping_key(
        password: &[u8],
        salt: &[u8],
        kdf: &KdfParams,
        alias: &str,
    ) -> Result<Zeroizing<[u8; 32]>, KeyStoreError> {
        let entry_key = PasswordKey::new(*derive_key(password, salt, kdf)?);
        Ok(entry_key.wrapping_key(alias)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::MIN_MEMORY_KIB;
    use tempfile::TempDir;

    fn fast() -> KdfParams {
        KdfParams {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn unsupported_type_is_rejected() {
        assert!(matches!(
            create_store("JCEKS", b"pw", &fast()),
            Err(KeyStoreError::UnsupportedType(_))
        ));
    }

    #[test]
    fn sealed_entries_keep_created_at() {
        let mut store = create_store("pvks", b"pw", &fast()).unwrap();
        store.put_sealed("a", vec![1]);
        let created = store.get_sealed("a").unwrap().created_at;

        store.put_sealed("a", vec![2]);
        let entry = store.get_sealed("a").unwrap();
        assert_eq!(entry.created_at, created);
        assert_eq!(entry.ciphertext, vec![2]);

        assert!(store.remove_sealed("a"));
        assert!(!store.remove_sealed("a"));
    }

    #[test]
    fn entry_password_is_checked() {
        let mut store = create_store(DEFAULT_STORE_TYPE, b"pw", &fast()).unwrap();
        let key = AdminKey::from_bytes(vec![3u8; 16]);
        store.put_secret_key("vault", &key, b"entry-pw").unwrap();

        assert!(matches!(
            store.get_secret_key("vault", b"other"),
            Err(KeyStoreError::IntegrityCheckFailed)
        ));
        let loaded = store.get_secret_key("vault", b"entry-pw").unwrap();
        assert_eq!(loaded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn save_writes_owner_only_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.pvks");
        let store = create_store(DEFAULT_STORE_TYPE, b"pw", &fast()).unwrap();
        store.save(&path).unwrap();
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
