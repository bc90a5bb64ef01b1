//! Password-based key derivation.
//!
//! Argon2id protects keystore passwords: it is memory-hard, so brute
//! forcing a stolen keystore file is expensive. Parameters are stored in
//! the keystore header so a store always reopens with the settings it was
//! created with.
//!
//! PBKDF2-HMAC-SHA256 backs the lighter password helpers (`CRYPT::` text
//! encryption and `MASK-` password obfuscation), whose iteration count
//! is part of the bootstrap configuration.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::CryptoError;

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of every derived key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Reject parameters too weak to be worth deriving with.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(CryptoError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(CryptoError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(CryptoError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// The same password + salt + params always produce the same key.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    params.validate()?;

    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Derive a 32-byte key with PBKDF2-HMAC-SHA256.
pub fn derive_pbkdf2_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::KeyDerivationFailed(
            "PBKDF2 salt must not be empty".into(),
        ));
    }
    if iterations < 1 {
        return Err(CryptoError::KeyDerivationFailed(
            "PBKDF2 iteration count must be at least 1".into(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key[..]);
    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn argon2_is_deterministic_per_salt() {
        let salt = generate_salt();
        let a = derive_key(b"pw", &salt, &fast()).unwrap();
        let b = derive_key(b"pw", &salt, &fast()).unwrap();
        assert_eq!(*a, *b);

        let other = derive_key(b"pw", &generate_salt(), &fast()).unwrap();
        assert_ne!(*a, *other);
    }

    #[test]
    fn weak_argon2_params_are_rejected() {
        let weak = KdfParams {
            memory_kib: 1024,
            ..fast()
        };
        assert!(matches!(
            derive_key(b"pw", &generate_salt(), &weak),
            Err(CryptoError::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn pbkdf2_requires_salt_and_iterations() {
        assert!(derive_pbkdf2_key(b"pw", b"", 10).is_err());
        assert!(derive_pbkdf2_key(b"pw", b"salty", 0).is_err());

        let a = derive_pbkdf2_key(b"pw", b"salty", 10).unwrap();
        let b = derive_pbkdf2_key(b"pw", b"salty", 11).unwrap();
        assert_ne!(*a, *b);
    }
}
