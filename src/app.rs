use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::Book;
use crate::command::ReversibleCommand;
use crate::command_log::{self, CommandLog};
use crate::date;
use crate::history::CommandHistory;
use crate::library::{Library, LibraryCommand};
use crate::parser::{self, HELP, ShellCommand};
use crate::sample::sample_library;
use crate::storage;

pub const APP_NAME: &str = "shelfkeep";

pub const MESSAGE_NO_UNDO: &str = "No more commands to undo!";
pub const MESSAGE_NO_REDO: &str = "No more commands to redo!";
pub const MESSAGE_NOT_SAVED: &str = "Warning: changes were not saved";

pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

const RECENT_LOG_ENTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub catalog_path: Option<PathBuf>,
    pub seed_sample_data: bool,
    pub loan_period_days: u32,
    pub session_log_size: usize,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            seed_sample_data: true,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            session_log_size: command_log::DEFAULT_CAPACITY,
        }
    }
}

impl ShelfConfig {
    /// The configured catalog file, or `catalog.json` next to the config file.
    pub fn catalog_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.catalog_path {
            return Ok(path.clone());
        }
        let config_path = confy::get_configuration_file_path(APP_NAME, None)
            .context("Failed to get config path")?;
        Ok(config_path.with_file_name("catalog.json"))
    }
}

pub struct App {
    pub should_quit: bool,
    pub library: Library,
    pub history: CommandHistory<LibraryCommand>,
    pub command_log: CommandLog,
    pub loan_period_days: u32,
    /// Source of the current date for loans and overdue counts.
    pub today: fn() -> NaiveDate,
    catalog_file: Option<PathBuf>,
}

impl App {
    /// Session over an in-memory library that is never written to disk.
    pub fn new(library: Library) -> Self {
        Self {
            should_quit: false,
            library,
            history: CommandHistory::new(),
            command_log: CommandLog::default(),
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            today: date::today,
            catalog_file: None,
        }
    }

    /// Session backed by the catalog file named in `config`.
    pub fn open(config: &ShelfConfig) -> Result<Self> {
        let path = config.catalog_file()?;
        let library = match storage::load(&path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?
        {
            Some(library) => library,
            None if config.seed_sample_data => {
                info!("No catalog at {}, starting from sample data", path.display());
                sample_library()
            }
            None => {
                info!("No catalog at {}, starting empty", path.display());
                Library::default()
            }
        };

        let mut app = Self::new(library);
        app.command_log = CommandLog::with_capacity(config.session_log_size);
        app.loan_period_days = config.loan_period_days;
        app.catalog_file = Some(path);
        Ok(app)
    }

    /// Parses and runs one line of input, recording the outcome in the
    /// command log.
    pub fn execute_line(&mut self, line: &str) -> Result<String> {
        let input = line.trim();
        let result = parser::parse(input)
            .map_err(anyhow::Error::from)
            .and_then(|command| self.dispatch(command));

        match &result {
            Ok(feedback) => self.command_log.log_success(input, feedback.as_str()),
            Err(e) => self.command_log.log_failure(input, format!("{:#}", e)),
        }
        result
    }

    /// Runs `command`. Once a change has been applied and recorded, a failed
    /// save only adds a warning to the feedback; the change stays undoable.
    pub fn dispatch(&mut self, command: ShellCommand) -> Result<String> {
        debug!("Dispatching {:?}", command);
        let persists = command.is_reversible()
            || matches!(command, ShellCommand::Undo | ShellCommand::Redo);

        let mut feedback = match command {
            ShellCommand::Add {
                title,
                author,
                genres,
            } => {
                let serial = self.library.catalog.next_serial()?;
                let book = Book::new(serial, &title, &author, genres)?;
                let command = LibraryCommand::add_book(&mut self.library, book)?;
                self.record(command)
            }
            ShellCommand::Delete { serial } => {
                let command = LibraryCommand::delete_book(&mut self.library, serial)?;
                self.record(command)
            }
            ShellCommand::Edit { serial, changes } => {
                let command = LibraryCommand::edit_book(&mut self.library, serial, &changes)?;
                self.record(command)
            }
            ShellCommand::Loan { serial, borrower } => {
                let command = LibraryCommand::lend(
                    &mut self.library,
                    serial,
                    borrower,
                    (self.today)(),
                    self.loan_period_days,
                )?;
                self.record(command)
            }
            ShellCommand::Return { serial } => {
                let command =
                    LibraryCommand::return_book(&mut self.library, serial, (self.today)())?;
                self.record(command)
            }
            ShellCommand::Undo => self.undo()?,
            ShellCommand::Redo => self.redo()?,
            ShellCommand::List => self.list_books(),
            ShellCommand::Loans => self.list_loans(),
            ShellCommand::Find { query } => self.find_books(&query),
            ShellCommand::History => self.describe_history(),
            ShellCommand::ClearHistory => {
                self.history.reset();
                "Command history cleared.".to_string()
            }
            ShellCommand::Log => self.recent_log(),
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Exit => {
                self.should_quit = true;
                "Goodbye!".to_string()
            }
        };

        if persists && let Err(e) = self.save() {
            warn!("{:#}", e);
            feedback.push_str(&format!("\n{}: {:#}", MESSAGE_NOT_SAVED, e));
        }
        Ok(feedback)
    }

    fn record(&mut self, command: LibraryCommand) -> String {
        let feedback = command.describe().to_string();
        self.history.commit(command);
        feedback
    }

    fn undo(&mut self) -> Result<String> {
        if !self.history.can_undo() {
            anyhow::bail!(MESSAGE_NO_UNDO);
        }
        let outcome = self
            .history
            .undo(&mut self.library)
            .context("Failed to undo command")?;
        debug!("Undo applied: {}", outcome.actual);
        Ok(format!("Undo success!\n{}", outcome.feedback))
    }

    fn redo(&mut self) -> Result<String> {
        if !self.history.can_redo() {
            anyhow::bail!(MESSAGE_NO_REDO);
        }
        let result = self
            .history
            .redo(&mut self.library)
            .context("Failed to redo command")?;
        Ok(format!("Redo success!\n{}", result))
    }

    fn save(&self) -> Result<()> {
        if let Some(path) = &self.catalog_file {
            storage::save(path, &self.library)
                .with_context(|| format!("Failed to save catalog to {}", path.display()))?;
        }
        Ok(())
    }

    fn list_books(&self) -> String {
        if self.library.catalog.is_empty() {
            return "The catalog is empty.".to_string();
        }
        format_books(self.library.catalog.books().iter())
    }

    fn list_loans(&self) -> String {
        let loans = self.library.loans.loans();
        if loans.is_empty() {
            return "No loans recorded.".to_string();
        }
        let today = (self.today)();
        loans
            .iter()
            .enumerate()
            .map(|(idx, loan)| match loan.days_overdue(today) {
                0 => format!("{:>3}. {}", idx + 1, loan),
                days => format!("{:>3}. {} ({} day(s) overdue)", idx + 1, loan, days),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn find_books(&self, query: &str) -> String {
        let found = self.library.catalog.find(query);
        if found.is_empty() {
            return "0 books listed!".to_string();
        }
        format!(
            "{} books listed!\n{}",
            found.len(),
            format_books(found.into_iter())
        )
    }

    fn describe_history(&self) -> String {
        if self.history.is_empty() {
            return "No commands in history.".to_string();
        }

        let cursor = self.history.cursor();
        let mut lines: Vec<String> = self
            .history
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, command)| {
                let marker = if cursor.is_none_or(|c| idx > c) {
                    " (undone)"
                } else {
                    ""
                };
                format!("{:>3}. {}{}", idx + 1, command.describe(), marker)
            })
            .collect();
        if let Some(next) = self.history.peek_undo() {
            lines.push(format!("undo: {}", next.describe()));
        }
        if let Some(next) = self.history.peek_redo() {
            lines.push(format!("redo: {}", next.describe()));
        }
        lines.push(format!("{} command(s) in history", self.history.len()));
        lines.join("\n")
    }

    fn recent_log(&self) -> String {
        let recent = self.command_log.recent(RECENT_LOG_ENTRIES);
        if recent.is_empty() {
            return "No commands run yet.".to_string();
        }
        recent
            .iter()
            .map(|entry| entry.display())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_books<'a>(books: impl Iterator<Item = &'a Book>) -> String {
    books
        .enumerate()
        .map(|(idx, book)| format!("{:>3}. {}", idx + 1, book))
        .collect::<Vec<_>>()
        .join("\n")
}
