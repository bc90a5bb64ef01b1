//! `propvault -e`: turn a plain value into a `CRYPT::` value.

use crate::cli::output;
use crate::cli::{encryption_password, ToolOptions, ToolOutcome};
use crate::crypto::TextEncryptor;
use crate::errors::ToolError;
use crate::property_source::CRYPT_PREFIX;

/// Execute the encrypt action.
pub fn execute(opts: &ToolOptions, text: &str) -> Result<ToolOutcome, ToolError> {
    let password = encryption_password(opts)?;
    let encoded = TextEncryptor::new(&password).encrypt(text)?;
    let value = format!("{CRYPT_PREFIX}{encoded}");

    println!("{value}");
    output::tip("Set ENCRYPTION_PASSWORD in the bootstrap properties so this value resolves.");

    Ok(ToolOutcome::Encrypted(value))
}
