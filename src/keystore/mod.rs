//! Keystore module: the password-protected key container.
//!
//! This module provides:
//! - The binary `.pvks` file format with HMAC integrity (`format`)
//! - `KeyStore` and the create/load/get/put access functions (`store`)

pub mod format;
pub mod store;

pub use format::SealedEntry;
pub use store::{
    create_store, get_secret_key, load_store, put_secret_key, KeyStore, DEFAULT_STORE_TYPE,
};
