//! AES-GCM authenticated encryption over raw key bytes.
//!
//! The cipher variant is picked from the key length: 16 bytes selects
//! AES-128-GCM, 32 bytes selects AES-256-GCM. Each call to `encrypt`
//! generates a fresh random 12-byte nonce and prepends it to the
//! ciphertext; `decrypt` splits it back out.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes128Gcm, Aes256Gcm};

use crate::errors::CryptoError;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 16- or 32-byte `key`.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => seal::<Aes128Gcm>(key, plaintext),
        32 => seal::<Aes256Gcm>(key, plaintext),
        n => Err(CryptoError::InvalidKey(format!(
            "expected a 16 or 32 byte key, got {n} bytes"
        ))),
    }
}

/// Decrypt data that was produced by `encrypt`.
///
/// Expects the first 12 bytes to be the nonce, followed by the ciphertext.
pub fn decrypt(key: &[u8], ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => open::<Aes128Gcm>(key, ciphertext_with_nonce),
        32 => open::<Aes256Gcm>(key, ciphertext_with_nonce),
        n => Err(CryptoError::InvalidKey(format!(
            "expected a 16 or 32 byte key, got {n} bytes"
        ))),
    }
}

fn seal<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead + AeadCore,
{
    let cipher =
        C::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(format!("{e}")))?;

    let nonce = C::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn open<C>(key: &[u8], ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead + AeadCore,
{
    // Anything shorter than nonce + tag cannot have come from `seal`.
    if ciphertext_with_nonce.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let nonce = aes_gcm::aead::Nonce::<C>::from_slice(nonce_bytes);

    let cipher =
        C::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(format!("{e}")))?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_128_and_256_bit_keys() {
        for key in [vec![0x11u8; 16], vec![0x22u8; 32]] {
            let sealed = encrypt(&key, b"payload").unwrap();
            assert_eq!(sealed.len(), NONCE_LEN + 7 + TAG_LEN);
            assert_eq!(decrypt(&key, &sealed).unwrap(), b"payload");
        }
    }

    #[test]
    fn rejects_unsupported_key_length() {
        assert!(matches!(
            encrypt(&[0u8; 24], b"x"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_input_shorter_than_nonce_and_tag() {
        let key = [0x33u8; 16];
        assert!(matches!(
            decrypt(&key, &[0u8; NONCE_LEN + TAG_LEN - 1]),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
