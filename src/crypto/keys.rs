//! HKDF-SHA256 sub-key derivation for the keystore.
//!
//! A keystore password runs through Argon2id once; the result is then
//! expanded into independent sub-keys:
//! - the **integrity key** that authenticates the whole container file;
//! - one **wrapping key** per secret-key entry, bound to the entry alias.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::kdf::KEY_LEN;
use crate::errors::CryptoError;

/// Derive the key used to HMAC the keystore file.
pub fn derive_integrity_key(password_key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    hkdf_derive(password_key, b"propvault-keystore-integrity")
}

/// Derive the key that wraps the secret-key entry stored under `alias`.
///
/// Binding the alias into `info` means an entry copied under another
/// alias no longer unwraps.
pub fn derive_wrapping_key(
    password_key: &[u8],
    alias: &str,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let info = format!("propvault-key-entry:{alias}");
    hkdf_derive(password_key, info.as_bytes())
}

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The extract step is skipped: the input already came out of Argon2id.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A password-derived key that zeroes itself when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PasswordKey {
    bytes: [u8; KEY_LEN],
}

impl PasswordKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn integrity_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        derive_integrity_key(&self.bytes)
    }

    pub fn wrapping_key(&self, alias: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        derive_wrapping_key(&self.bytes, alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_keys_are_independent() {
        let key = PasswordKey::new([0x5Au8; KEY_LEN]);
        let integrity = key.integrity_key().unwrap();
        let vault = key.wrapping_key("vault").unwrap();
        let other = key.wrapping_key("other").unwrap();

        assert_ne!(*integrity, *vault);
        assert_ne!(*vault, *other);
        assert_eq!(*vault, *key.wrapping_key("vault").unwrap());
    }
}
