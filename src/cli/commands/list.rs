//! `propvault -l`: display all stored handles in a table.

use crate::cli::output;
use crate::cli::{ToolOutcome, VaultSession};
use crate::errors::ToolError;
use crate::vault::SecurityVault;

/// Execute the list action.
pub fn execute(session: VaultSession) -> Result<ToolOutcome, ToolError> {
    let handles = session.vault.handles()?;

    output::info(&format!("{} secret(s) in the vault", handles.len()));
    output::print_handles_table(&handles);
    session.write_config()?;

    Ok(ToolOutcome::Listed(handles.len()))
}
