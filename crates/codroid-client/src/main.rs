//! codroid CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use codroid_client::cli::{Cli, Command, ConfigAction};
use codroid_client::commands;
use codroid_client::config::ClientConfig;
use codroid_client::error::ClientResult;
use codroid_core::init_tracing;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("warning: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    match cli.command {
        Command::Config { ref action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        _ => commands::controller::run(cli, &config),
    }
}
