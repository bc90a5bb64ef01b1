//! Password-based encryption of short text values (`CRYPT::` literals).
//!
//! Encoded form: `base64( salt[16] | nonce[12] | ciphertext + tag )`.
//! The key is PBKDF2-HMAC-SHA256(password, salt) and the cipher is
//! AES-256-GCM, so every encryption of the same text differs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use super::encryption;
use super::kdf::derive_pbkdf2_key;
use crate::errors::CryptoError;

const SALT_LEN: usize = 16;

/// Decrypts text produced by a password-based encryptor.
pub trait TextDecryptor: Send + Sync {
    fn decrypt(&self, encoded: &str) -> Result<String, CryptoError>;
}

/// Encrypts and decrypts text under a password.
pub struct TextEncryptor {
    password: Zeroizing<String>,
    iterations: u32,
}

impl TextEncryptor {
    /// PBKDF2 rounds used unless overridden.
    pub const DEFAULT_ITERATIONS: u32 = 100_000;

    pub fn new(password: &str) -> Self {
        Self::with_iterations(password, Self::DEFAULT_ITERATIONS)
    }

    pub fn with_iterations(password: &str, iterations: u32) -> Self {
        Self {
            password: Zeroizing::new(password.to_string()),
            iterations,
        }
    }

    /// Replace the password used for subsequent calls.
    pub fn set_password(&mut self, password: &str) {
        self.password = Zeroizing::new(password.to_string());
    }

    pub fn encrypt(&self, text: &str) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let key = derive_pbkdf2_key(self.password.as_bytes(), &salt, self.iterations)?;
        let sealed = encryption::encrypt(&key[..], text.as_bytes())?;

        let mut blob = Vec::with_capacity(SALT_LEN + sealed.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&sealed);
        Ok(BASE64.encode(blob))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let blob = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEncoding(format!("base64: {e}")))?;

        if blob.len() < SALT_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        let (salt, sealed) = blob.split_at(SALT_LEN);

        let key = derive_pbkdf2_key(self.password.as_bytes(), salt, self.iterations)?;
        let plaintext = Zeroizing::new(encryption::decrypt(&key[..], sealed)?);

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| CryptoError::InvalidEncoding("decrypted text is not UTF-8".into()))
    }
}

impl TextDecryptor for TextEncryptor {
    fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        TextEncryptor::decrypt(self, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor(password: &str) -> TextEncryptor {
        TextEncryptor::with_iterations(password, 1_000)
    }

    #[test]
    fn text_roundtrip() {
        let enc = encryptor("hunter2");
        let encoded = enc.encrypt("jdbc-password").unwrap();
        assert_ne!(encoded, "jdbc-password");
        assert_eq!(enc.decrypt(&encoded).unwrap(), "jdbc-password");
    }

    #[test]
    fn empty_text_roundtrip() {
        let enc = encryptor("hunter2");
        let encoded = enc.encrypt("").unwrap();
        assert_eq!(enc.decrypt(&encoded).unwrap(), "");
    }

    #[test]
    fn wrong_password_fails() {
        let encoded = encryptor("right").encrypt("value").unwrap();
        assert!(matches!(
            encryptor("wrong").decrypt(&encoded),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn set_password_switches_key() {
        let mut enc = encryptor("first");
        let encoded = enc.encrypt("value").unwrap();
        enc.set_password("second");
        assert!(enc.decrypt(&encoded).is_err());
        enc.set_password("first");
        assert_eq!(enc.decrypt(&encoded).unwrap(), "value");
    }

    #[test]
    fn garbage_input_is_an_encoding_error() {
        assert!(matches!(
            encryptor("pw").decrypt("not base64!!"),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }
}
