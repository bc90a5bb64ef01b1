//! CLI module: Clap argument parser, output helpers, and the actions of
//! the `propvault` administration tool.

pub mod commands;
pub mod output;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use rand::distributions::Alphanumeric;
use rand::Rng;
use zeroize::Zeroizing;

use crate::config::options;
use crate::config::Settings;
use crate::crypto::mask_password;
use crate::errors::ToolError;
use crate::keystore::format::write_private_file;
use crate::properties::Properties;
use crate::vault::{KeyStoreVault, SecretHandle, SecurityVault};

/// Environment fallback for `--keystore-password`.
pub const KEYSTORE_PASSWORD_ENV: &str = "PROPVAULT_KEYSTORE_PASSWORD";

/// Environment fallback for `--encryption-password`.
pub const ENCRYPTION_PASSWORD_ENV: &str = "PROPVAULT_ENCRYPTION_PASSWORD";

/// Length of the masking salt generated when `--salt` is not given.
const GENERATED_SALT_LEN: usize = 8;

/// propvault: keystore-backed secret vault administration.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "propvault",
    about = "Store secrets in a keystore-backed vault and reference them from configuration",
    version,
    group(
        ArgGroup::new("action")
            .required(true)
            .args(["sec_attr", "check_sec_attr", "remove_sec_attr", "list", "encrypt"])
    )
)]
pub struct ToolOptions {
    /// Keystore file
    #[arg(short = 'k', long = "keystore", value_name = "PATH")]
    pub keystore: Option<PathBuf>,

    /// Keystore password (falls back to PROPVAULT_KEYSTORE_PASSWORD, then a prompt)
    #[arg(short = 'p', long = "keystore-password", value_name = "PASSWORD")]
    pub keystore_password: Option<String>,

    /// Vault alias (first handle field)
    #[arg(short = 'v', long = "alias")]
    pub alias: Option<String>,

    /// Vault block (second handle field)
    #[arg(short = 'b', long = "vault-block")]
    pub vault_block: Option<String>,

    /// Attribute name (third handle field)
    #[arg(short = 'a', long = "attribute")]
    pub attribute: Option<String>,

    /// Store VALUE under the handle
    #[arg(short = 'x', long = "sec-attr", value_name = "VALUE")]
    pub sec_attr: Option<String>,

    /// Check whether a value is stored under the handle
    #[arg(short = 'c', long = "check-sec-attr")]
    pub check_sec_attr: bool,

    /// Remove the value stored under the handle
    #[arg(short = 'r', long = "remove-sec-attr")]
    pub remove_sec_attr: bool,

    /// List stored handles
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Encrypt TEXT into a CRYPT:: value
    #[arg(short = 'e', long = "encrypt", value_name = "TEXT")]
    pub encrypt: Option<String>,

    /// Password for --encrypt (falls back to PROPVAULT_ENCRYPTION_PASSWORD, then a prompt)
    #[arg(short = 'E', long = "encryption-password", value_name = "PASSWORD")]
    pub encryption_password: Option<String>,

    /// Salt used to mask the keystore password (random when omitted)
    #[arg(short = 's', long = "salt")]
    pub salt: Option<String>,

    /// Iteration count used to mask the keystore password
    #[arg(short = 'i', long = "iteration")]
    pub iteration: Option<u32>,

    /// Write the bootstrap properties for this keystore to FILE
    #[arg(short = 'g', long = "generate-config", value_name = "FILE")]
    pub generate_config: Option<PathBuf>,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Stored(SecretHandle),
    Checked { handle: SecretHandle, exists: bool },
    Removed(SecretHandle),
    Listed(usize),
    Encrypted(String),
}

impl ToolOutcome {
    /// `0` on success; `3` when `--check-sec-attr` found nothing.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Checked { exists: false, .. } => 3,
            _ => 0,
        }
    }
}

/// The administration tool: parsed options plus the action runner.
#[derive(Debug, Clone)]
pub struct VaultTool {
    options: ToolOptions,
}

impl VaultTool {
    /// Parse a full argument list (program name first).
    pub fn parse_from<I, T>(args: I) -> Result<Self, ToolError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let options = ToolOptions::try_parse_from(args)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    /// Run the selected action.
    pub fn run(&self) -> Result<ToolOutcome, ToolError> {
        let opts = &self.options;
        if let Some(text) = &opts.encrypt {
            return commands::encrypt::execute(opts, text);
        }

        // Validate the handle before anything touches the keystore.
        let target = if opts.list { None } else { Some(handle(opts)?) };
        let session = VaultSession::open(opts)?;

        match (target, &opts.sec_attr) {
            (None, _) => commands::list::execute(session),
            (Some(h), Some(value)) => commands::store::execute(session, &h, value),
            (Some(h), None) if opts.check_sec_attr => commands::check::execute(session, &h),
            (Some(h), None) => commands::remove::execute(session, &h),
        }
    }
}

/// An initialized vault plus what is needed to describe it in a
/// bootstrap properties file.
pub struct VaultSession {
    pub vault: KeyStoreVault,
    vault_options: Properties,
    password: Zeroizing<String>,
    salt: String,
    iterations: u32,
    generate_config: Option<PathBuf>,
}

impl VaultSession {
    /// Build the vault options from `propvault.toml` and the flags, then
    /// initialize the vault.
    pub fn open(opts: &ToolOptions) -> Result<Self, ToolError> {
        let keystore = opts
            .keystore
            .as_ref()
            .ok_or(ToolError::MissingArgument("--keystore"))?;
        let password = keystore_password(opts)?;
        let settings = Settings::load(&std::env::current_dir()?)?;

        let salt = opts.salt.clone().unwrap_or_else(generate_salt);
        let iterations = opts.iteration.unwrap_or(settings.iteration_count);

        let mut vault_options = settings.vault_options();
        vault_options.insert(options::KEYSTORE_URL, &keystore.to_string_lossy());
        vault_options.insert(options::ITERATION_COUNT, &iterations.to_string());

        let mut init_options = vault_options.clone();
        init_options.insert(options::KEYSTORE_PASSWORD, &password);

        let mut vault = KeyStoreVault::new();
        vault.init(&init_options)?;

        Ok(Self {
            vault,
            vault_options,
            password,
            salt,
            iterations,
            generate_config: opts.generate_config.clone(),
        })
    }

    /// Bootstrap properties that open this keystore, with the password
    /// masked.
    pub fn config_snippet(&self) -> Result<Properties, ToolError> {
        let mut props = Properties::new();
        for key in [
            options::KEYSTORE_URL,
            options::KEYSTORE_ALIAS,
            options::ENCRYPTION_ALGORITHM,
            options::KEY_SIZE,
        ] {
            if let Some(value) = self.vault_options.get(key) {
                props.insert(key, value);
            }
        }

        let masked = mask_password(&self.password, &self.salt, self.iterations)?;
        props.insert(options::KEYSTORE_PASSWORD, &masked);
        props.insert(options::SALT, &self.salt);
        props.insert(options::ITERATION_COUNT, &self.iterations.to_string());
        Ok(props)
    }

    /// Write the snippet to `--generate-config`, if it was given.
    pub fn write_config(&self) -> Result<(), ToolError> {
        let Some(path) = &self.generate_config else {
            return Ok(());
        };

        let content = format!(
            "# propvault bootstrap configuration\n{}",
            output::properties_text(&self.config_snippet()?)
        );
        write_private_file(path, content.as_bytes())?;
        output::success(&format!("Wrote vault configuration to {}", path.display()));
        Ok(())
    }
}

/// The handle named by `--alias`, `--vault-block` and `--attribute`.
pub fn handle(opts: &ToolOptions) -> Result<SecretHandle, ToolError> {
    let alias = opts.alias.as_deref().ok_or(ToolError::MissingArgument("--alias"))?;
    let block = opts
        .vault_block
        .as_deref()
        .ok_or(ToolError::MissingArgument("--vault-block"))?;
    let attribute = opts
        .attribute
        .as_deref()
        .ok_or(ToolError::MissingArgument("--attribute"))?;
    Ok(SecretHandle::new(alias, block, attribute)?)
}

/// Get the keystore password, trying in order:
/// 1. `--keystore-password`
/// 2. `PROPVAULT_KEYSTORE_PASSWORD`
/// 3. Interactive prompt
pub fn keystore_password(opts: &ToolOptions) -> Result<Zeroizing<String>, ToolError> {
    password_from(
        opts.keystore_password.as_deref(),
        KEYSTORE_PASSWORD_ENV,
        "Enter keystore password",
    )
}

/// Get the `--encrypt` password, same order as [`keystore_password`].
pub fn encryption_password(opts: &ToolOptions) -> Result<Zeroizing<String>, ToolError> {
    password_from(
        opts.encryption_password.as_deref(),
        ENCRYPTION_PASSWORD_ENV,
        "Enter encryption password",
    )
}

fn password_from(
    flag: Option<&str>,
    env_var: &str,
    prompt: &str,
) -> Result<Zeroizing<String>, ToolError> {
    if let Some(pw) = flag.filter(|pw| !pw.is_empty()) {
        return Ok(Zeroizing::new(pw.to_string()));
    }

    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| ToolError::Prompt(e.to_string()))?;
    Ok(Zeroizing::new(pw))
}

/// A random alphanumeric masking salt.
pub fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SALT_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<VaultTool, ToolError> {
        VaultTool::parse_from(std::iter::once("propvault").chain(args.iter().copied()))
    }

    #[test]
    fn parses_store_flags() {
        let tool = parse(&[
            "-k", "keystore.pvks", "-p", "password", "-v", "vault", "-b", "block", "-a",
            "attr", "-x", "secure-value",
        ])
        .unwrap();

        let opts = tool.options();
        assert_eq!(opts.keystore, Some(PathBuf::from("keystore.pvks")));
        assert_eq!(opts.keystore_password.as_deref(), Some("password"));
        assert_eq!(opts.sec_attr.as_deref(), Some("secure-value"));
        assert_eq!(handle(opts).unwrap().to_string(), "VAULT::vault::block::attr");
    }

    #[test]
    fn missing_flag_value_is_usage_error() {
        let err = parse(&["-k", "keystore.pvks", "-p", "password", "-x"]).unwrap_err();
        assert!(matches!(err, ToolError::Usage(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = parse(&["-k", "keystore.pvks", "-l", "--bogus"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn an_action_is_required() {
        let err = parse(&["-k", "keystore.pvks", "-p", "password"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn actions_are_exclusive() {
        let err = parse(&["-k", "keystore.pvks", "-l", "-c"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn help_exits_zero() {
        let err = parse(&["-h"]).unwrap_err();
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn missing_handle_part_is_usage_error() {
        let tool = parse(&["-k", "k.pvks", "-p", "pw", "-v", "a", "-b", "b", "-c"]).unwrap();
        let err = handle(tool.options()).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument("--attribute")));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn generated_salts_are_alphanumeric() {
        let salt = generate_salt();
        assert_eq!(salt.len(), GENERATED_SALT_LEN);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
