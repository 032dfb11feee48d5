use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::app::{APP_NAME, App, ShelfConfig};
use crate::sample::sample_library;
use crate::storage;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive shell over the catalog (the default)
    Shell,
    /// Print every book in the catalog
    List,
    /// Write the sample catalog to the catalog file
    Seed {
        /// Overwrite an existing catalog
        #[arg(short, long)]
        force: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Get {
        #[arg(short, long)]
        key: String,
    },
    Path,
}

fn load_config() -> Result<ShelfConfig> {
    let config = confy::load(APP_NAME, None).context("Failed to load configuration")?;
    debug!("Config loaded successfully");
    Ok(config)
}

pub fn handle_config_action(action: ConfigAction) -> Result<()> {
    handle_config_action_with_path(action, None)
}

fn handle_config_action_with_path(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    debug!("Handling config action: {:?}", action);

    match action {
        ConfigAction::Get { key } => {
            info!("Getting config key: {}", key);

            let config: ShelfConfig = if let Some(path) = config_path {
                confy::load_path(path).context("Failed to load configuration")?
            } else {
                load_config()?
            };

            println!("{}", config_value(&config, &key)?);
            Ok(())
        }
        ConfigAction::Path => {
            info!("Getting config path");

            let config_path = confy::get_configuration_file_path(APP_NAME, None)
                .context("Failed to get config path")?
                .display()
                .to_string();

            debug!("Config path resolved to: {}", config_path);
            println!("{}", config_path);
            Ok(())
        }
    }
}

fn config_value(config: &ShelfConfig, key: &str) -> Result<String> {
    match key {
        "catalog_path" => Ok(config.catalog_file()?.display().to_string()),
        "seed_sample_data" => Ok(config.seed_sample_data.to_string()),
        "loan_period_days" => Ok(config.loan_period_days.to_string()),
        "session_log_size" => Ok(config.session_log_size.to_string()),
        _ => anyhow::bail!("Unknown config key: '{}'.", key),
    }
}

pub fn handle_list() -> Result<()> {
    let app = App::open(&load_config()?)?;
    let books = app.library.catalog.books();

    info!("Listing {} book(s)", books.len());
    if books.is_empty() {
        eprintln!("The catalog is empty. Use `{} seed` to add sample books.", APP_NAME);
    }
    for book in books {
        println!("{}", book);
    }
    Ok(())
}

pub fn handle_seed(force: bool) -> Result<()> {
    let config = load_config()?;
    let path = config.catalog_file()?;
    seed_catalog(&path, force)?;
    println!("Wrote sample catalog to {}", path.display());
    Ok(())
}

fn seed_catalog(path: &Path, force: bool) -> Result<()> {
    if !force
        && storage::load(path)
            .with_context(|| format!("Failed to read existing catalog {}", path.display()))?
            .is_some()
    {
        anyhow::bail!(
            "A catalog already exists at {}. Pass --force to overwrite it.",
            path.display()
        );
    }

    info!("Seeding sample catalog at {}", path.display());
    storage::save(path, &sample_library())
        .with_context(|| format!("Failed to write catalog to {}", path.display()))
}

pub fn handle_shell() -> Result<()> {
    let mut app = App::open(&load_config()?)?;
    let stdin = io::stdin();
    run_shell(&mut app, stdin.lock(), io::stdout())
}

/// Reads commands line by line until `exit` or end of input.
fn run_shell(app: &mut App, input: impl BufRead, mut output: impl Write) -> Result<()> {
    writeln!(output, "Type 'help' for a list of commands.")?;

    let mut lines = input.lines();
    while !app.should_quit {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            debug!("End of input, leaving shell");
            break;
        };
        let line = line.context("Failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }

        match app.execute_line(&line) {
            Ok(feedback) => writeln!(output, "{}", feedback)?,
            Err(e) => {
                warn!("Command '{}' failed: {:#}", line.trim(), e);
                writeln!(output, "{:#}", e)?;
            }
        }
    }

    Ok(())
}
