//! schoolfeed CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use schoolfeed_client::cli::{Cli, Command, ConfigAction};
use schoolfeed_client::commands;
use schoolfeed_client::config::ClientConfig;
use schoolfeed_client::error::ClientResult;
use schoolfeed_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    match cli.command {
        Command::Events(ref args) => commands::events::run(args, &config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
