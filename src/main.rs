mod app;
mod catalog;
mod catalog_command;
mod cli;
mod command;
mod command_log;
mod date;
mod history;
mod library;
mod loan;
mod loan_command;
mod parser;
mod sample;
mod storage;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    match cli.command {
        Some(Command::Config { action }) => cli::handle_config_action(action),
        Some(Command::List) => cli::handle_list(),
        Some(Command::Seed { force }) => cli::handle_seed(force),
        Some(Command::Shell) | None => cli::handle_shell(),
    }
}
