//! `MASK-` keystore passwords.
//!
//! A masked password keeps the keystore password out of plain sight in
//! the bootstrap properties. It is obfuscation, not protection: anyone
//! holding the properties file (salt and iteration count included) can
//! unmask it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use super::encryption;
use super::kdf::derive_pbkdf2_key;
use crate::errors::CryptoError;

/// Prefix marking a masked password.
pub const MASK_PREFIX: &str = "MASK-";

const MASK_PHRASE: &[u8] = b"propvault keystore password mask";

pub fn is_masked(value: &str) -> bool {
    value.starts_with(MASK_PREFIX)
}

/// Mask `password` with the given salt and iteration count.
pub fn mask_password(password: &str, salt: &str, iterations: u32) -> Result<String, CryptoError> {
    let key = derive_pbkdf2_key(MASK_PHRASE, salt.as_bytes(), iterations)?;
    let sealed = encryption::encrypt(&key[..], password.as_bytes())?;
    Ok(format!("{MASK_PREFIX}{}", BASE64.encode(sealed)))
}

/// Reverse [`mask_password`]. The input must carry the `MASK-` prefix.
pub fn unmask_password(
    masked: &str,
    salt: &str,
    iterations: u32,
) -> Result<Zeroizing<String>, CryptoError> {
    let encoded = masked
        .strip_prefix(MASK_PREFIX)
        .ok_or_else(|| CryptoError::InvalidEncoding("missing MASK- prefix".into()))?;
    let sealed = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidEncoding(format!("base64: {e}")))?;

    let key = derive_pbkdf2_key(MASK_PHRASE, salt.as_bytes(), iterations)?;
    let plain = encryption::decrypt(&key[..], &sealed)?;

    String::from_utf8(plain)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::InvalidEncoding("masked password is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_roundtrip() {
        let masked = mask_password("changeit", "12345678", 50).unwrap();
        assert!(is_masked(&masked));
        assert!(!masked.contains("changeit"));

        let plain = unmask_password(&masked, "12345678", 50).unwrap();
        assert_eq!(plain.as_str(), "changeit");
    }

    #[test]
    fn wrong_salt_does_not_unmask() {
        let masked = mask_password("changeit", "12345678", 50).unwrap();
        assert!(unmask_password(&masked, "87654321", 50).is_err());
        assert!(unmask_password(&masked, "12345678", 51).is_err());
    }

    #[test]
    fn unmask_requires_prefix() {
        assert!(matches!(
            unmask_password("changeit", "12345678", 50),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }
}
