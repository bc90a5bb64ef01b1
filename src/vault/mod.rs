//! Vault module: handle-addressed secret storage.
//!
//! This module provides:
//! - `SecretHandle`, the `VAULT::alias::block::attribute` address (`handle`)
//! - The `SecurityVault` trait and its keystore-backed `KeyStoreVault` (`security`)

pub mod handle;
pub mod security;

pub use handle::{SecretHandle, DELIMITER, VAULT_PREFIX};
pub use security::{KeyStoreVault, SecurityVault};
