//! `propvault -r`: delete the value stored under a handle.

use crate::cli::output;
use crate::cli::{ToolOutcome, VaultSession};
use crate::errors::ToolError;
use crate::vault::{SecretHandle, SecurityVault};

/// Execute the remove action.
pub fn execute(mut session: VaultSession, handle: &SecretHandle) -> Result<ToolOutcome, ToolError> {
    session.vault.remove(handle)?;
    output::success(&format!("Removed {handle}"));
    session.write_config()?;

    Ok(ToolOutcome::Removed(handle.clone()))
}
