//! Vault options recognised by `SecurityVault::init`.
//!
//! Options arrive as a flat string map, normally the bootstrap
//! properties. Parsing happens once; the resulting `VaultConfiguration`
//! is immutable for the life of the vault.

use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::crypto::engine::{CipherAlgorithm, KeySize};
use crate::crypto::kdf::KdfParams;
use crate::crypto::mask::{is_masked, unmask_password};
use crate::errors::{Result, VaultError};
use crate::keystore::DEFAULT_STORE_TYPE;
use crate::properties::Properties;

pub const KEYSTORE_URL: &str = "KEYSTORE_URL";
pub const KEYSTORE_PASSWORD: &str = "KEYSTORE_PASSWORD";
pub const KEYSTORE_ALIAS: &str = "KEYSTORE_ALIAS";
pub const KEYSTORE_TYPE: &str = "KEYSTORE_TYPE";
pub const ENCRYPTION_ALGORITHM: &str = "ENCRYPTION_ALGORITHM";
pub const KEY_SIZE: &str = "KEY_SIZE";
pub const ITERATION_COUNT: &str = "ITERATION_COUNT";
pub const SALT: &str = "SALT";
pub const KDF_MEMORY_KIB: &str = "KDF_MEMORY_KIB";
pub const KDF_ITERATIONS: &str = "KDF_ITERATIONS";
pub const KDF_PARALLELISM: &str = "KDF_PARALLELISM";
pub const ENCRYPTION_PASSWORD: &str = "ENCRYPTION_PASSWORD";

pub const DEFAULT_ADMIN_ALIAS: &str = "vault";
pub const DEFAULT_KEY_SIZE: u32 = 128;
pub const DEFAULT_ITERATION_COUNT: u32 = 10_000;

/// Everything the vault needs to open its keystore.
pub struct VaultConfiguration {
    pub keystore_url: PathBuf,
    keystore_password: Zeroizing<String>,
    pub admin_alias: String,
    pub keystore_type: String,
    pub encryption_algorithm: CipherAlgorithm,
    pub key_size: KeySize,
    pub iteration_count: u32,
    pub salt: Option<String>,
    pub kdf: KdfParams,
}

impl VaultConfiguration {
    /// Parse the options map. A `MASK-` password is unmasked here using
    /// `SALT` and `ITERATION_COUNT`.
    pub fn from_properties(options: &Properties) -> Result<Self> {
        let url = non_empty(options, KEYSTORE_URL)?;
        let raw_password = present(options, KEYSTORE_PASSWORD)?;

        let iteration_count = parse_u32(options, ITERATION_COUNT)?.unwrap_or(DEFAULT_ITERATION_COUNT);
        let salt = present(options, SALT).ok().map(str::to_string);

        let keystore_password = if is_masked(raw_password) {
            let salt = salt.as_deref().ok_or(VaultError::MissingOption(SALT))?;
            unmask_password(raw_password, salt, iteration_count)?
        } else {
            Zeroizing::new(raw_password.to_string())
        };

        let encryption_algorithm = match options.get(ENCRYPTION_ALGORITHM) {
            Some(name) => name.parse()?,
            None => CipherAlgorithm::Aes,
        };
        let key_size = KeySize::from_bits(parse_u32(options, KEY_SIZE)?.unwrap_or(DEFAULT_KEY_SIZE))?;

        let defaults = KdfParams::default();
        let kdf = KdfParams {
            memory_kib: parse_u32(options, KDF_MEMORY_KIB)?.unwrap_or(defaults.memory_kib),
            iterations: parse_u32(options, KDF_ITERATIONS)?.unwrap_or(defaults.iterations),
            parallelism: parse_u32(options, KDF_PARALLELISM)?.unwrap_or(defaults.parallelism),
        };
        kdf.validate()?;

        Ok(Self {
            keystore_url: keystore_path(url),
            keystore_password,
            admin_alias: options
                .get(KEYSTORE_ALIAS)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_ADMIN_ALIAS)
                .to_string(),
            keystore_type: options
                .get(KEYSTORE_TYPE)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_STORE_TYPE)
                .to_string(),
            encryption_algorithm,
            key_size,
            iteration_count,
            salt,
            kdf,
        })
    }

    /// The unmasked keystore password.
    pub fn keystore_password(&self) -> &str {
        &self.keystore_password
    }
}

impl fmt::Debug for VaultConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfiguration")
            .field("keystore_url", &self.keystore_url)
            .field("keystore_password", &"<redacted>")
            .field("admin_alias", &self.admin_alias)
            .field("keystore_type", &self.keystore_type)
            .field("encryption_algorithm", &self.encryption_algorithm)
            .field("key_size", &self.key_size)
            .field("iteration_count", &self.iteration_count)
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}

/// Accept plain paths as well as `file:` URLs.
fn keystore_path(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("file://")
        .or_else(|| url.strip_prefix("file:"))
        .unwrap_or(url);
    PathBuf::from(path)
}

fn non_empty<'a>(options: &'a Properties, name: &'static str) -> Result<&'a str> {
    options
        .get(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(VaultError::MissingOption(name))
}

/// Like [`non_empty`], but hands the value back untouched. Passwords and
/// salts are used byte for byte.
fn present<'a>(options: &'a Properties, name: &'static str) -> Result<&'a str> {
    options
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(VaultError::MissingOption(name))
}

fn parse_u32(options: &Properties, name: &'static str) -> Result<Option<u32>> {
    options
        .get(name)
        .map(|raw| {
            raw.trim().parse::<u32>().map_err(|e| VaultError::InvalidOption {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mask::mask_password;

    fn base() -> Properties {
        let mut p = Properties::new();
        p.insert(KEYSTORE_URL, "/tmp/vault.pvks");
        p.insert(KEYSTORE_PASSWORD, "changeit");
        p
    }

    #[test]
    fn defaults_apply() {
        let cfg = VaultConfiguration::from_properties(&base()).unwrap();
        assert_eq!(cfg.keystore_url, PathBuf::from("/tmp/vault.pvks"));
        assert_eq!(cfg.keystore_password(), "changeit");
        assert_eq!(cfg.admin_alias, DEFAULT_ADMIN_ALIAS);
        assert_eq!(cfg.keystore_type, DEFAULT_STORE_TYPE);
        assert_eq!(cfg.key_size, KeySize::Bits128);
        assert_eq!(cfg.iteration_count, DEFAULT_ITERATION_COUNT);
        assert_eq!(cfg.kdf, KdfParams::default());
    }

    #[test]
    fn missing_required_options() {
        let mut p = base();
        p.remove(KEYSTORE_URL);
        assert!(matches!(
            VaultConfiguration::from_properties(&p),
            Err(VaultError::MissingOption(KEYSTORE_URL))
        ));

        let mut p = base();
        p.insert(KEYSTORE_PASSWORD, "   ");
        assert!(matches!(
            VaultConfiguration::from_properties(&p),
            Err(VaultError::MissingOption(KEYSTORE_PASSWORD))
        ));
    }

    #[test]
    fn file_urls_are_accepted() {
        let mut p = base();
        p.insert(KEYSTORE_URL, "file:///srv/app/vault.pvks");
        let cfg = VaultConfiguration::from_properties(&p).unwrap();
        assert_eq!(cfg.keystore_url, PathBuf::from("/srv/app/vault.pvks"));
    }

    #[test]
    fn masked_password_needs_salt() {
        let masked = mask_password("changeit", "saltsalt", 20).unwrap();
        let mut p = base();
        p.insert(KEYSTORE_PASSWORD, &masked);
        p.insert(ITERATION_COUNT, "20");
        assert!(matches!(
            VaultConfiguration::from_properties(&p),
            Err(VaultError::MissingOption(SALT))
        ));

        p.insert(SALT, "saltsalt");
        let cfg = VaultConfiguration::from_properties(&p).unwrap();
        assert_eq!(cfg.keystore_password(), "changeit");
    }

    #[test]
    fn password_whitespace_is_kept_on_both_paths() {
        let mut p = base();
        p.insert(KEYSTORE_PASSWORD, " pw ");
        let plain = VaultConfiguration::from_properties(&p).unwrap();
        assert_eq!(plain.keystore_password(), " pw ");

        let mut p = base();
        p.insert(KEYSTORE_PASSWORD, &mask_password(" pw ", "saltsalt", 50).unwrap());
        p.insert(SALT, "saltsalt");
        p.insert(ITERATION_COUNT, "50");
        let masked = VaultConfiguration::from_properties(&p).unwrap();
        assert_eq!(masked.keystore_password(), plain.keystore_password());
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let mut p = base();
        p.insert(KEY_SIZE, "lots");
        assert!(matches!(
            VaultConfiguration::from_properties(&p),
            Err(VaultError::InvalidOption { name: KEY_SIZE, .. })
        ));

        let mut p = base();
        p.insert(KEY_SIZE, "192");
        assert!(matches!(
            VaultConfiguration::from_properties(&p),
            Err(VaultError::Crypto(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = VaultConfiguration::from_properties(&base()).unwrap();
        assert!(!format!("{cfg:?}").contains("changeit"));
    }
}
