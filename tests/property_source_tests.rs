//! End-to-end resolution through a real keystore vault.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use propvault::config::options::ENCRYPTION_PASSWORD;
use propvault::crypto::TextEncryptor;
use propvault::properties::{parse_properties, Properties, PropertyFile};
use propvault::property_source::{PropertySourceVault, CRYPT_PREFIX};
use propvault::vault::{KeyStoreVault, SecretHandle, SecurityVault};
use tempfile::TempDir;

const TEXT_ITERATIONS: u32 = 1_000;

fn bootstrap(keystore: &Path, extra: &str) -> Properties {
    parse_properties(&format!(
        "# bootstrap\n\
         KEYSTORE_URL={}\n\
         KEYSTORE_PASSWORD=pw\n\
         KDF_MEMORY_KIB=8192\n\
         KDF_ITERATIONS=1\n\
         KDF_PARALLELISM=1\n\
         {extra}\n",
        keystore.display()
    ))
}

/// Provision a keystore holding `entries`, as the admin tool would.
fn provision(props: &Properties, entries: &[(&str, &str)]) {
    let mut vault = KeyStoreVault::new();
    vault.init(props).unwrap();
    for (handle, value) in entries {
        let handle: SecretHandle = handle.parse().unwrap();
        vault.store(&handle, value.as_bytes()).unwrap();
    }
}

fn source(props: Properties, overrides: HashMap<String, String>) -> PropertySourceVault {
    let mut src = PropertySourceVault::new(
        Box::new(KeyStoreVault::new()),
        Box::new(props),
        Box::new(overrides),
    )
    .with_text_iterations(TEXT_ITERATIONS);
    src.init();
    src
}

#[test]
fn resolves_vault_references() {
    let dir = TempDir::new().unwrap();
    let props = bootstrap(&dir.path().join("vault.pvks"), "");
    provision(&props, &[("admin::db::pass", "s3cr3t")]);

    let src = source(props, HashMap::new());
    assert!(src.vault().is_initialized());
    assert_eq!(
        src.get_property("VAULT::admin::db::pass"),
        Some("s3cr3t".into())
    );
    assert_eq!(
        src.get_property("VAULT::admin::db::other"),
        Some("VAULT::admin::db::other".into())
    );
    assert_eq!(src.get_property("plain"), Some("plain".into()));
    // No ENCRYPTION_PASSWORD anywhere.
    assert_eq!(src.get_property("CRYPT::abc"), None);
}

#[test]
fn crypt_password_from_bootstrap_file() {
    let dir = TempDir::new().unwrap();
    let keystore = dir.path().join("vault.pvks");
    let props = bootstrap(&keystore, "ENCRYPTION_PASSWORD=crypt-pw");

    let encoded = TextEncryptor::with_iterations("crypt-pw", TEXT_ITERATIONS)
        .encrypt("decryptedText")
        .unwrap();

    let src = source(props, HashMap::new());
    assert_eq!(
        src.get_property(&format!("{CRYPT_PREFIX}{encoded}")),
        Some("decryptedText".into())
    );
}

#[test]
fn crypt_password_held_in_the_vault() {
    let dir = TempDir::new().unwrap();
    let keystore = dir.path().join("vault.pvks");
    let props = bootstrap(&keystore, "ENCRYPTION_PASSWORD=CRYPT::admin::crypt::password");
    provision(&props, &[("admin::crypt::password", "vaulted-pw")]);

    let encoded = TextEncryptor::with_iterations("vaulted-pw", TEXT_ITERATIONS)
        .encrypt("decryptedValue")
        .unwrap();

    let src = source(props, HashMap::new());
    assert!(src.has_text_decryptor());
    assert_eq!(
        src.get_property(&format!("CRYPT::{encoded}")),
        Some("decryptedValue".into())
    );
}

#[test]
fn override_beats_bootstrap_password() {
    let dir = TempDir::new().unwrap();
    let props = bootstrap(&dir.path().join("vault.pvks"), "ENCRYPTION_PASSWORD=from-file");
    let overrides = HashMap::from([(ENCRYPTION_PASSWORD.to_string(), "from-env".to_string())]);

    let encoded = TextEncryptor::with_iterations("from-env", TEXT_ITERATIONS)
        .encrypt("value")
        .unwrap();

    let src = source(props, overrides);
    assert_eq!(
        src.get_property(&format!("CRYPT::{encoded}")),
        Some("value".into())
    );
}

#[test]
fn bad_keystore_password_fails_open() {
    let dir = TempDir::new().unwrap();
    let keystore = dir.path().join("vault.pvks");
    provision(&bootstrap(&keystore, ""), &[("admin::db::pass", "s3cr3t")]);

    let mut props = bootstrap(&keystore, "");
    props.insert("KEYSTORE_PASSWORD", "wrong");

    let src = source(props, HashMap::new());
    assert!(!src.vault().is_initialized());
    assert_eq!(
        src.get_property("VAULT::admin::db::pass"),
        Some("VAULT::admin::db::pass".into())
    );
}

#[test]
fn loads_bootstrap_from_properties_file() {
    let dir = TempDir::new().unwrap();
    let keystore = dir.path().join("vault.pvks");
    provision(&bootstrap(&keystore, ""), &[("app::jdbc::password", "hunter2")]);

    let conf = dir.path().join("vault.properties");
    fs::write(
        &conf,
        format!(
            "KEYSTORE_URL = {}\nKEYSTORE_PASSWORD : pw\n",
            keystore.display()
        ),
    )
    .unwrap();

    let mut src = PropertySourceVault::new(
        Box::new(KeyStoreVault::new()),
        Box::new(PropertyFile::new(&conf)),
        Box::new(HashMap::<String, String>::new()),
    );
    src.init();

    let app_config = parse_properties(
        "jdbc.url=jdbc:postgresql://db/app\njdbc.password=VAULT::app::jdbc::password\n",
    );
    let resolved = src.resolve_all(&app_config);
    assert_eq!(resolved.get("jdbc.url"), Some("jdbc:postgresql://db/app"));
    assert_eq!(resolved.get("jdbc.password"), Some("hunter2"));
}
