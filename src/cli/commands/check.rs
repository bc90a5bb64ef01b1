//! `propvault -c`: report whether a handle holds a value.

use crate::cli::output;
use crate::cli::{ToolOutcome, VaultSession};
use crate::errors::ToolError;
use crate::vault::{SecretHandle, SecurityVault};

/// Execute the check action.
pub fn execute(session: VaultSession, handle: &SecretHandle) -> Result<ToolOutcome, ToolError> {
    let exists = session.vault.exists(handle)?;

    if exists {
        output::success(&format!("A value is stored for {handle}"));
    } else {
        output::info(&format!("No value is stored for {handle}"));
    }
    session.write_config()?;

    Ok(ToolOutcome::Checked {
        handle: handle.clone(),
        exists,
    })
}
