//! Command-line front end for image generation.

mod cli_args;
mod commands;

pub use cli_args::{Cli, Command, ConfigurationsCommand, GenerateArgs};
pub use commands::{closest_match, dispatch};

use clap::Parser;

/// Any argument selects CLI mode; a bare invocation opens the GUI.
pub fn should_run_cli_mode() -> bool {
    std::env::args_os().nth(1).is_some()
}

/// Parse the process arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    dispatch(Cli::parse()).await
}
