//! The symmetric encryption engine used for every vault entry.
//!
//! An engine is fixed to one algorithm and key size when it is built.
//! Callers hand it a key per call; the engine never stores key material.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::encryption;
use crate::errors::CryptoError;

/// Block cipher family. Always used in GCM mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    Aes,
}

impl FromStr for CipherAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES" | "AES/GCM" | "AES-GCM" => Ok(Self::Aes),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes => f.write_str("AES"),
        }
    }
}

/// Supported key lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Bits128,
    Bits256,
}

impl KeySize {
    pub fn from_bits(bits: u32) -> Result<Self, CryptoError> {
        match bits {
            128 => Ok(Self::Bits128),
            256 => Ok(Self::Bits256),
            other => Err(CryptoError::UnsupportedKeySize(other)),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Bits128 => 128,
            Self::Bits256 => 256,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

/// The administrative symmetric key that encrypts all vault entries.
///
/// Zeroized on drop. `Debug` never prints the key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AdminKey {
    bytes: Vec<u8>,
}

impl AdminKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_len(&self) -> u32 {
        // Keys are at most 32 bytes; the cast cannot truncate.
        (self.bytes.len() * 8) as u32
    }
}

impl fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdminKey(<redacted>, {} bits)", self.bit_len())
    }
}

/// Encrypts and decrypts raw bytes under an [`AdminKey`].
#[derive(Debug, Clone, Copy)]
pub struct EncryptionEngine {
    algorithm: CipherAlgorithm,
    key_size: KeySize,
}

impl EncryptionEngine {
    pub fn new(algorithm: CipherAlgorithm, key_size: KeySize) -> Self {
        Self {
            algorithm,
            key_size,
        }
    }

    /// Build an engine from the textual settings found in configuration,
    /// e.g. `("AES", 128)`.
    pub fn from_config(algorithm: &str, key_bits: u32) -> Result<Self, CryptoError> {
        Ok(Self::new(algorithm.parse()?, KeySize::from_bits(key_bits)?))
    }

    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Generate a fresh random key of the configured size.
    pub fn generate_key(&self) -> AdminKey {
        let mut bytes = vec![0u8; self.key_size.bytes()];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        AdminKey::from_bytes(bytes)
    }

    /// Encrypt `data` under `key`.
    ///
    /// Both arguments are required. A `None` fails with
    /// [`CryptoError::NullReference`]; a key of the wrong length fails with
    /// [`CryptoError::InvalidKey`]. Empty `data` is valid.
    pub fn encrypt(
        &self,
        data: Option<&[u8]>,
        key: Option<&AdminKey>,
    ) -> Result<Vec<u8>, CryptoError> {
        let (data, key) = self.check_arguments(data, key)?;
        encryption::encrypt(key.as_bytes(), data)
    }

    /// Decrypt `data` that was produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`CryptoError::DecryptionFailed`] for the wrong key or a
    /// malformed ciphertext.
    pub fn decrypt(
        &self,
        data: Option<&[u8]>,
        key: Option<&AdminKey>,
    ) -> Result<Vec<u8>, CryptoError> {
        let (data, key) = self.check_arguments(data, key)?;
        encryption::decrypt(key.as_bytes(), data)
    }

    fn check_arguments<'a>(
        &self,
        data: Option<&'a [u8]>,
        key: Option<&'a AdminKey>,
    ) -> Result<(&'a [u8], &'a AdminKey), CryptoError> {
        let data = data.ok_or(CryptoError::NullReference { argument: "data" })?;
        let key = key.ok_or(CryptoError::NullReference { argument: "key" })?;

        if key.as_bytes().len() != self.key_size.bytes() {
            return Err(CryptoError::InvalidKey(format!(
                "{} key must be {} bits, got {}",
                self.algorithm,
                self.key_size.bits(),
                key.bit_len()
            )));
        }

        Ok((data, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("aes".parse::<CipherAlgorithm>().unwrap(), CipherAlgorithm::Aes);
        assert_eq!(
            "AES/GCM".parse::<CipherAlgorithm>().unwrap(),
            CipherAlgorithm::Aes
        );
        assert!(matches!(
            "DES".parse::<CipherAlgorithm>(),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn key_sizes() {
        assert_eq!(KeySize::from_bits(128).unwrap().bytes(), 16);
        assert_eq!(KeySize::from_bits(256).unwrap().bytes(), 32);
        assert!(matches!(
            KeySize::from_bits(192),
            Err(CryptoError::UnsupportedKeySize(192))
        ));
    }

    #[test]
    fn generated_keys_match_configured_size() {
        let engine = EncryptionEngine::from_config("AES", 256).unwrap();
        let key = engine.generate_key();
        assert_eq!(key.bit_len(), 256);
        assert_ne!(key.as_bytes(), engine.generate_key().as_bytes());
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = AdminKey::from_bytes(vec![0xAB; 16]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "AdminKey(<redacted>, 128 bits)");
    }

    #[test]
    fn null_key_is_reported_before_key_length() {
        let engine = EncryptionEngine::from_config("AES", 128).unwrap();
        assert!(matches!(
            engine.decrypt(Some(b"abc"), None),
            Err(CryptoError::NullReference { argument: "key" })
        ));
    }
}
