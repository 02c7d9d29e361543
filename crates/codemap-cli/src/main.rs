//! Codemap CLI: the `codemap` command.

mod cli;
mod commands;
mod config;
mod logging;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use logging::{LogConfig, init_logging};
use support::fail;

fn main() {
    let cli = Cli::parse();

    let config = config::load(cli.global.config.as_deref()).unwrap_or_else(|e| fail(e));
    let log_config = LogConfig::resolve(&config.logging, cli.global.verbose, cli.global.log_format)
        .unwrap_or_else(|e| fail(e));
    init_logging(&log_config);

    let store_path = cli.global.store.unwrap_or(config.store.path);
    tracing::debug!(store = %store_path.display(), "store resolved");

    match cli.command {
        Commands::Spec { command } => commands::spec::run(command),
        Commands::Task { command } => commands::task::run(command, &store_path),
        Commands::Row { command } => commands::row::run(command, &store_path),
    }
}
