//! Resolution of marked configuration values.
//!
//! A configuration loader hands every raw value to
//! [`PropertySourceVault::get_property`]:
//! - `VAULT::alias::block::attribute` is looked up in the security vault
//! - `CRYPT::<base64>` is decrypted with the configured text decryptor
//! - anything else passes through untouched
//!
//! Resolution fails open. A vault reference that cannot be resolved comes
//! back as the raw reference, and an undecryptable `CRYPT::` value comes
//! back as `None`. Nothing here returns an error to the loader.

use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::config::options::{ENCRYPTION_PASSWORD, KEYSTORE_PASSWORD, KEYSTORE_URL};
use crate::crypto::{TextDecryptor, TextEncryptor};
use crate::properties::{ConfigSource, EnvSource, Properties, PropertyFile, PropertyLoader};
use crate::vault::{KeyStoreVault, SecretHandle, SecurityVault, VAULT_PREFIX};

/// Prefix marking a configuration value as password-encrypted text.
pub const CRYPT_PREFIX: &str = "CRYPT::";

pub struct PropertySourceVault {
    vault: Box<dyn SecurityVault>,
    loader: Box<dyn PropertyLoader>,
    overrides: Box<dyn ConfigSource>,
    text_decryptor: Option<Box<dyn TextDecryptor>>,
    text_iterations: u32,
}

impl PropertySourceVault {
    pub fn new(
        vault: Box<dyn SecurityVault>,
        loader: Box<dyn PropertyLoader>,
        overrides: Box<dyn ConfigSource>,
    ) -> Self {
        Self {
            vault,
            loader,
            overrides,
            text_decryptor: None,
            text_iterations: TextEncryptor::DEFAULT_ITERATIONS,
        }
    }

    /// Production wiring: a keystore vault, the bootstrap file named by
    /// `PROPVAULT_CONFIG` (else `conf/vault.properties`) and environment
    /// overrides.
    pub fn from_env() -> Self {
        let env = EnvSource::new();
        let loader = PropertyFile::locate(&env);
        Self::new(Box::new(KeyStoreVault::new()), Box::new(loader), Box::new(env))
    }

    /// PBKDF2 rounds for the text decryptor built by [`init`](Self::init).
    pub fn with_text_iterations(mut self, iterations: u32) -> Self {
        self.text_iterations = iterations;
        self
    }

    pub fn set_vault(&mut self, vault: Box<dyn SecurityVault>) {
        self.vault = vault;
    }

    pub fn set_text_decryptor(&mut self, decryptor: Option<Box<dyn TextDecryptor>>) {
        self.text_decryptor = decryptor;
    }

    pub fn vault(&self) -> &dyn SecurityVault {
        self.vault.as_ref()
    }

    pub fn has_text_decryptor(&self) -> bool {
        self.text_decryptor.is_some()
    }

    /// Bootstrap the vault and the text decryptor.
    ///
    /// Failures are logged, never returned: the source stays usable and
    /// simply resolves less.
    pub fn init(&mut self) {
        let Some(props) = self.loader.load() else {
            debug!("no bootstrap properties; vault resolution disabled");
            return;
        };

        if props.contains_key(KEYSTORE_URL) && props.contains_key(KEYSTORE_PASSWORD) {
            if self.vault.is_initialized() {
                debug!("security vault already initialized");
            } else if let Err(e) = self.vault.init(&props) {
                error!(error = %e, "security vault initialization failed");
            }
        } else {
            warn!(
                "{KEYSTORE_URL} or {KEYSTORE_PASSWORD} missing; {VAULT_PREFIX} values will not be resolved"
            );
        }

        match resolve_encryption_password(self.overrides.as_ref(), &props, self.vault.as_ref()) {
            Some(password) => {
                self.text_decryptor = Some(Box::new(TextEncryptor::with_iterations(
                    &password,
                    self.text_iterations,
                )));
                debug!("text decryptor configured");
            }
            None => {
                warn!("no {ENCRYPTION_PASSWORD}; {CRYPT_PREFIX} values will not be resolved");
            }
        }
    }

    /// Resolve one raw configuration value.
    pub fn get_property(&self, raw: &str) -> Option<String> {
        if raw.starts_with(VAULT_PREFIX) {
            return Some(self.resolve_vault_reference(raw));
        }

        if let Some(encoded) = raw.strip_prefix(CRYPT_PREFIX) {
            let decryptor = self.text_decryptor.as_ref()?;
            return match decryptor.decrypt(encoded) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(error = %e, "cannot decrypt {CRYPT_PREFIX} value");
                    None
                }
            };
        }

        Some(raw.to_string())
    }

    /// Resolve every value of `props`. Unresolved entries are dropped.
    pub fn resolve_all(&self, props: &Properties) -> Properties {
        props
            .iter()
            .filter_map(|(key, raw)| self.get_property(raw).map(|v| (key.to_string(), v)))
            .collect()
    }

    fn resolve_vault_reference(&self, raw: &str) -> String {
        if !self.vault.is_initialized() {
            return raw.to_string();
        }

        let resolved = SecretHandle::parse_reference(raw)
            .and_then(|handle| self.vault.retrieve_text(&handle));

        match resolved {
            Ok(text) => text.as_str().to_string(),
            Err(e) => {
                warn!(reference = %raw, error = %e, "cannot resolve vault reference");
                raw.to_string()
            }
        }
    }
}

/// Find the password for `CRYPT::` values.
///
/// Lookup order:
/// 1. `ENCRYPTION_PASSWORD` from `overrides`
/// 2. `ENCRYPTION_PASSWORD` in the bootstrap `props`. A `CRYPT::` or
///    `VAULT::` value names a vault handle and is read from `vault`;
///    a plain value is used as-is.
pub fn resolve_encryption_password(
    overrides: &dyn ConfigSource,
    props: &Properties,
    vault: &dyn SecurityVault,
) -> Option<Zeroizing<String>> {
    if let Some(password) = overrides.get(ENCRYPTION_PASSWORD).filter(|p| !p.is_empty()) {
        debug!("encryption password taken from override");
        return Some(Zeroizing::new(password));
    }

    let value = props.get(ENCRYPTION_PASSWORD).filter(|v| !v.is_empty())?;

    if let Some(reference) = value.strip_prefix(CRYPT_PREFIX) {
        return password_from_vault(vault, reference.parse());
    }
    if value.starts_with(VAULT_PREFIX) {
        return password_from_vault(vault, SecretHandle::parse_reference(value));
    }

    Some(Zeroizing::new(value.to_string()))
}

fn password_from_vault(
    vault: &dyn SecurityVault,
    handle: crate::errors::Result<SecretHandle>,
) -> Option<Zeroizing<String>> {
    if !vault.is_initialized() {
        warn!("{ENCRYPTION_PASSWORD} refers to the vault, but the vault is not initialized");
        return None;
    }

    match handle.and_then(|h| vault.retrieve_text(&h)) {
        Ok(password) => Some(password),
        Err(e) => {
            warn!(error = %e, "cannot read {ENCRYPTION_PASSWORD} from the vault");
            None
        }
    }
}
