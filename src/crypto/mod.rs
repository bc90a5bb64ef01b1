//! Cryptographic primitives for propvault.
//!
//! This module provides:
//! - AES-GCM encryption and decryption over raw keys (`encryption`)
//! - The configured `EncryptionEngine` and `AdminKey` used by the vault (`engine`)
//! - Argon2id and PBKDF2 password-based key derivation (`kdf`)
//! - HKDF sub-keys for the keystore container (`keys`)
//! - `CRYPT::` text encryption (`text`) and `MASK-` passwords (`mask`)

pub mod encryption;
pub mod engine;
pub mod kdf;
pub mod keys;
pub mod mask;
pub mod text;

pub use engine::{AdminKey, CipherAlgorithm, EncryptionEngine, KeySize};
pub use kdf::{derive_key, generate_salt, KdfParams};
pub use mask::{is_masked, mask_password, unmask_password};
pub use text::{TextDecryptor, TextEncryptor};
