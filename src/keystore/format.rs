//! Binary keystore file format and HMAC integrity verification.
//!
//! A `.pvks` file has this layout:
//!
//! ```text
//! [PVKS: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][body JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`PVKS`): identifies the file as a propvault keystore.
//! - **Header JSON**: serialized `KeyStoreHeader` (type, salt, KDF params).
//! - **Body JSON**: serialized `KeyStoreBody` (key entries and sealed entries).
//! - **HMAC-SHA256**: tag over header + body bytes, keyed from the store
//!   password. A wrong password and a tampered file are indistinguishable.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::KdfParams;
use crate::errors::KeyStoreError;

/// Magic bytes at the start of every keystore file.
const MAGIC: &[u8; 4] = b"PVKS";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Metadata stored at the beginning of a keystore file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreHeader {
    pub version: u8,

    /// Container type name, e.g. `PVKS`.
    pub store_type: String,

    /// Salt for the store password's Argon2id derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Argon2id parameters used for the store password and for every
    /// key entry created in this store.
    pub kdf: KdfParams,

    pub created_at: DateTime<Utc>,
}

/// A secret key wrapped under its entry password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Per-entry Argon2id salt.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// nonce || AES-256-GCM(key bytes).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub wrapped: Vec<u8>,

    pub created_at: DateTime<Utc>,
}

/// Data that is already encrypted by the caller; stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedEntry {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Everything after the header. `BTreeMap` keeps the output deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyStoreBody {
    #[serde(default)]
    pub keys: BTreeMap<String, KeyEntry>,

    #[serde(default)]
    pub sealed: BTreeMap<String, SealedEntry>,
}

/// Write a keystore file to disk **atomically**.
///
/// The bytes go to a temp file in the same directory which is then
/// renamed over `path`, so readers never see a half-written store.
pub fn write_store(
    path: &Path,
    header: &KeyStoreHeader,
    body: &KeyStoreBody,
    hmac_key: &[u8],
) -> Result<(), KeyStoreError> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| KeyStoreError::Serialization(format!("header: {e}")))?;
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| KeyStoreError::Serialization(format!("body: {e}")))?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, &body_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        KeyStoreError::Serialization(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + body_bytes.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&body_bytes);
    buf.extend_from_slice(&hmac_tag);

    write_private_file(path, &buf)?;

    Ok(())
}

/// Replace `path` with `bytes`, readable by the owner only.
///
/// The temp file is created with mode 0600 and renamed into place. On
/// failure it is removed and `path` is left as it was.
pub fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    // A leftover temp file would keep its old mode.
    let _ = fs::remove_file(&tmp_path);
    let written = write_new_private(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn write_new_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Raw data read from a keystore file.
///
/// Keeps the original bytes so the HMAC is verified over exactly what
/// was written, with no re-serialization.
pub struct RawStore {
    pub header: KeyStoreHeader,
    pub body: KeyStoreBody,
    pub header_bytes: Vec<u8>,
    pub body_bytes: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

/// Read a keystore file and split it into its parts.
///
/// The caller must verify the HMAC before trusting `body`.
pub fn read_store(path: &Path) -> Result<RawStore, KeyStoreError> {
    if !path.exists() {
        return Err(KeyStoreError::NotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;

    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(KeyStoreError::InvalidFormat(
            "file too small to be a keystore".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(KeyStoreError::InvalidFormat(
            "missing PVKS magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(KeyStoreError::InvalidFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| KeyStoreError::InvalidFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        KeyStoreError::InvalidFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end.checked_add(HMAC_LEN).is_some_and(|min| min <= data.len()))
        .ok_or_else(|| KeyStoreError::InvalidFormat("header length exceeds file size".into()))?;

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let body_end = data.len() - HMAC_LEN;
    let body_bytes = data[header_end..body_end].to_vec();
    let stored_hmac = data[body_end..].to_vec();

    let header: KeyStoreHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| KeyStoreError::InvalidFormat(format!("header JSON: {e}")))?;

    let body: KeyStoreBody = serde_json::from_slice(&body_bytes)
        .map_err(|e| KeyStoreError::InvalidFormat(format!("body JSON: {e}")))?;

    Ok(RawStore {
        header,
        body,
        header_bytes,
        body_bytes,
        stored_hmac,
    })
}

/// Compute HMAC-SHA256 over header + body bytes.
pub fn compute_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    body_bytes: &[u8],
) -> Result<Vec<u8>, KeyStoreError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyStoreError::Serialization(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body_bytes);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the stored tag in constant time.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    body_bytes: &[u8],
    expected_hmac: &[u8],
) -> Result<(), KeyStoreError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| KeyStoreError::Serialization(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(body_bytes);

    mac.verify_slice(expected_hmac)
        .map_err(|_| KeyStoreError::IntegrityCheckFailed)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> KeyStoreHeader {
        KeyStoreHeader {
            version: CURRENT_VERSION,
            store_type: "PVKS".into(),
            salt: vec![7u8; 32],
            kdf: KdfParams::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn write_then_read_preserves_bytes_and_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.pvks");
        let key = [9u8; 32];

        write_store(&path, &header(), &KeyStoreBody::default(), &key).unwrap();

        let raw = read_store(&path).unwrap();
        assert_eq!(raw.header.store_type, "PVKS");
        assert!(verify_hmac(&key, &raw.header_bytes, &raw.body_bytes, &raw.stored_hmac).is_ok());
        assert!(matches!(
            verify_hmac(&[1u8; 32], &raw.header_bytes, &raw.body_bytes, &raw.stored_hmac),
            Err(KeyStoreError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.pvks");
        fs::write(&path, vec![0u8; 64]).unwrap();

        assert!(matches!(
            read_store(&path),
            Err(KeyStoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn oversized_header_length_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.pvks");
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.push(CURRENT_VERSION);
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0u8; 64]);
        fs::write(&path, data).unwrap();

        assert!(matches!(
            read_store(&path),
            Err(KeyStoreError::InvalidFormat(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_owner_only_and_leaves_no_temp() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.pvks");
        write_store(&path, &header(), &KeyStoreBody::default(), &[9u8; 32]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join(".store.pvks.tmp").exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        assert!(write_private_file(&target, b"secret").is_err());
        assert!(!dir.path().join(".occupied.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_store(&dir.path().join("absent.pvks")),
            Err(KeyStoreError::NotFound(_))
        ));
    }
}
