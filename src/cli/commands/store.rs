//! `propvault -x`: store a value under a handle.

use tracing::debug;

use crate::cli::output;
use crate::cli::{ToolOutcome, VaultSession};
use crate::errors::ToolError;
use crate::vault::{SecretHandle, SecurityVault};

/// Execute the store action.
pub fn execute(
    mut session: VaultSession,
    handle: &SecretHandle,
    value: &str,
) -> Result<ToolOutcome, ToolError> {
    output::warning("Value given on the command line may appear in shell history.");

    let existed = session.vault.exists(handle)?;
    session.vault.store(handle, value.as_bytes())?;
    debug!(%handle, existed, "secret stored by tool");

    if existed {
        output::success(&format!("Secret updated for {handle}"));
    } else {
        output::success(&format!("Secret stored for {handle}"));
    }

    output::info("Reference it from configuration as:");
    println!("{handle}");

    output::info("Bootstrap properties for this vault:");
    print!("{}", output::properties_text(&session.config_snippet()?));
    session.write_config()?;

    Ok(ToolOutcome::Stored(handle.clone()))
}
