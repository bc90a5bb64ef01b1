use std::path::Path;

use serde::{Deserialize, Serialize};

use super::options;
use crate::errors::{Result, VaultError};
use crate::properties::Properties;

/// Tool-level defaults, loaded from `propvault.toml`.
///
/// Every field has a sensible default so the tool works without any
/// config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Alias of the administrative key inside the keystore.
    #[serde(default = "default_admin_alias")]
    pub admin_alias: String,

    /// Cipher used for vault entries.
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,

    /// Admin key size in bits (128 or 256).
    #[serde(default = "default_key_size")]
    pub key_size: u32,

    /// PBKDF2 rounds for masked passwords.
    #[serde(default = "default_iteration_count")]
    pub iteration_count: u32,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_admin_alias() -> String {
    options::DEFAULT_ADMIN_ALIAS.to_string()
}

fn default_encryption_algorithm() -> String {
    "AES".to_string()
}

fn default_key_size() -> u32 {
    options::DEFAULT_KEY_SIZE
}

fn default_iteration_count() -> u32 {
    options::DEFAULT_ITERATION_COUNT
}

fn default_kdf_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_alias: default_admin_alias(),
            encryption_algorithm: default_encryption_algorithm(),
            key_size: default_key_size(),
            iteration_count: default_iteration_count(),
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file looked up in the working directory.
    pub const FILE_NAME: &'static str = "propvault.toml";

    /// Load settings from `<dir>/propvault.toml`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| VaultError::InvalidOption {
            name: "propvault.toml",
            reason: e.to_string(),
        })
    }

    /// Vault options carrying these settings, ready to be extended with
    /// the keystore location and password.
    pub fn vault_options(&self) -> Properties {
        let mut props = Properties::new();
        props.insert(options::KEYSTORE_ALIAS, &self.admin_alias);
        props.insert(options::ENCRYPTION_ALGORITHM, &self.encryption_algorithm);
        props.insert(options::KEY_SIZE, &self.key_size.to_string());
        props.insert(options::ITERATION_COUNT, &self.iteration_count.to_string());
        props.insert(options::KDF_MEMORY_KIB, &self.kdf_memory_kib.to_string());
        props.insert(options::KDF_ITERATIONS, &self.kdf_iterations.to_string());
        props.insert(options::KDF_PARALLELISM, &self.kdf_parallelism.to_string());
        props
    }
}

// ── Tests ────────────────────────────────────────────────────────────
