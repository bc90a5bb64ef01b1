use std::process::ExitCode;

use propvault::cli::{output, VaultTool};
use propvault::errors::ToolError;
use tracing_subscriber::EnvFilter;

/// Variable holding the log filter, e.g. `PROPVAULT_LOG=propvault=debug`.
const LOG_ENV: &str = "PROPVAULT_LOG";

fn main() -> ExitCode {
    init_tracing();

    let result = VaultTool::parse_from(std::env::args_os()).and_then(|tool| tool.run());

    match result {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Logs go to stderr so they never mix with values printed on stdout.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("propvault=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn report(e: &ToolError) {
    match e {
        // Clap renders help, version and usage errors itself.
        ToolError::Usage(clap_err) => {
            let _ = clap_err.print();
        }
        ToolError::MissingArgument(_) => {
            output::error(&e.to_string());
            output::tip("Run `propvault --help` for usage.");
        }
        _ => output::error(&e.to_string()),
    }
}
