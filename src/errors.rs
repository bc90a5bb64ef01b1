use std::path::PathBuf;
use thiserror::Error;

use crate::vault::SecretHandle;

/// Errors raised by the encryption primitives.
///
/// Messages never include plaintext, ciphertext or key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A required argument was absent. Kept apart from `InvalidKey` so
    /// callers can tell "missing" from "malformed" by variant.
    #[error("required argument `{argument}` is null")]
    NullReference { argument: &'static str },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unsupported encryption algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("unsupported key size {0} bits")]
    UnsupportedKeySize(u32),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Errors raised by the key container layer.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Keystore not found at {0}")]
    NotFound(PathBuf),

    #[error("Invalid keystore format: {0}")]
    InvalidFormat(String),

    #[error("Keystore integrity check failed: wrong password or tampered file")]
    IntegrityCheckFailed,

    #[error("No key stored under alias '{0}'")]
    AliasNotFound(String),

    #[error("Unsupported keystore type '{0}'")]
    UnsupportedType(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the security vault.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Security vault is not initialized")]
    NotInitialized,

    #[error("Security vault is already initialized")]
    AlreadyInitialized,

    #[error("Missing vault option {0}")]
    MissingOption(&'static str),

    #[error("Invalid value for vault option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("Invalid secret handle: {0}")]
    InvalidHandle(String),

    #[error("No secret stored for {0}")]
    NotFound(SecretHandle),

    #[error("Admin key is {actual} bits, vault is configured for {expected} bits")]
    KeySizeMismatch { expected: u32, actual: u32 },

    #[error("Secret value is not valid UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors surfaced by the `propvault` tool. Each maps to a process exit code.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad command line, or `--help` / `--version`. Clap renders the text.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("{0} is required for this action")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Password prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// `2` for usage errors, `0` for help and version output, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(e) => u8::try_from(e.exit_code()).unwrap_or(2),
            Self::MissingArgument(_) => 2,
            _ => 1,
        }
    }
}
