//! Main entry point for imagegen
//!
//! This binary supports both CLI and GUI modes:
//! - CLI mode: when any arguments are given
//! - GUI mode: when launched without arguments

use anyhow::Result;
use imagegen_core::logging::{LoggingDestination, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    if imagegen_cli::should_run_cli_mode() {
        if let Err(err) = init_logging(LoggingDestination::FileAndStderr) {
            eprintln!("Warning: logging disabled: {err}");
        }
        if let Err(err) = imagegen_cli::run().await {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    } else {
        if let Err(err) = init_logging(LoggingDestination::FileOnly) {
            eprintln!("Warning: logging disabled: {err}");
        }
        if let Err(err) = imagegen_gui::run() {
            eprintln!("GUI error: {err:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}
