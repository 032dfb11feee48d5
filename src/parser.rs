use std::collections::BTreeSet;
use thiserror::Error;

use crate::catalog::{CatalogError, Genre, SerialNumber, genre_set};
use crate::catalog_command::BookChanges;
use crate::loan::{BorrowerId, LoanError};

pub const HELP: &str = "\
Commands:
  add t/TITLE a/AUTHOR [g/GENRE]...        add a book
  delete SERIAL                            delete a book
  edit SERIAL [t/TITLE] [a/AUTHOR] [g/GENRE]...
                                           edit a book (g/ alone clears genres)
  list                                     list every book
  find QUERY                               fuzzy search titles and authors
  loan SERIAL b/BORROWER                   lend a book
  return SERIAL                            take a lent book back
  loans                                    list every loan, overdue days included
  undo | redo                              step through command history
  history                                  show undoable and redoable commands
  clear-history                            forget all command history
  log                                      show recent command outcomes
  help | exit";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no command given, type 'help' for usage")]
    Empty,
    #[error("unknown command '{0}', type 'help' for usage")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("{0} given more than once")]
    DuplicateField(&'static str),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("at least one field to edit must be provided")]
    NothingToEdit,
    #[error(transparent)]
    InvalidValue(#[from] CatalogError),
    #[error(transparent)]
    InvalidLoan(#[from] LoanError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add {
        title: String,
        author: String,
        genres: BTreeSet<Genre>,
    },
    Delete {
        serial: SerialNumber,
    },
    Edit {
        serial: SerialNumber,
        changes: BookChanges,
    },
    Loan {
        serial: SerialNumber,
        borrower: BorrowerId,
    },
    Return {
        serial: SerialNumber,
    },
    List,
    Loans,
    Find {
        query: String,
    },
    Undo,
    Redo,
    History,
    ClearHistory,
    Log,
    Help,
    Exit,
}

impl ShellCommand {
    /// True for commands that change the library and get recorded in history.
    pub fn is_reversible(&self) -> bool {
        matches!(
            self,
            Self::Add { .. }
                | Self::Delete { .. }
                | Self::Edit { .. }
                | Self::Loan { .. }
                | Self::Return { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Title,
    Author,
    Genre,
    Borrower,
}

impl Prefix {
    fn split(token: &str) -> Option<(Self, &str)> {
        let (prefix, rest) = token.split_once('/')?;
        let prefix = match prefix {
            "t" => Self::Title,
            "a" => Self::Author,
            "g" => Self::Genre,
            "b" => Self::Borrower,
            _ => return None,
        };
        Some((prefix, rest))
    }

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title (t/)",
            Self::Author => "author (a/)",
            Self::Genre => "genre (g/)",
            Self::Borrower => "borrower (b/)",
        }
    }
}

/// Arguments split into the text before the first prefix and the
/// prefixed values, in order of appearance.
#[derive(Debug, Default)]
struct Arguments {
    preamble: String,
    values: Vec<(Prefix, String)>,
}

impl Arguments {
    fn tokenize(args: &str) -> Self {
        let mut parsed = Self::default();
        for token in args.split_whitespace() {
            let target = match Prefix::split(token) {
                Some((prefix, rest)) => {
                    parsed.values.push((prefix, String::new()));
                    rest
                }
                None => token,
            };
            let buffer = match parsed.values.last_mut() {
                Some((_, value)) => value,
                None => &mut parsed.preamble,
            };
            if !target.is_empty() {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(target);
            }
        }
        parsed
    }

    fn single(&self, prefix: Prefix) -> Result<Option<&str>, ParseError> {
        let mut found = self.all(prefix);
        let first = found.next();
        if found.next().is_some() {
            return Err(ParseError::DuplicateField(prefix.name()));
        }
        Ok(first)
    }

    fn all(&self, prefix: Prefix) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(move |(p, _)| *p == prefix)
            .map(|(_, value)| value.as_str())
    }

    fn genres(&self) -> Result<Option<BTreeSet<Genre>>, ParseError> {
        let values: Vec<&str> = self.all(Prefix::Genre).collect();
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(genre_set(values.into_iter().filter(|v| !v.is_empty()))?))
    }

    fn serial(&self) -> Result<SerialNumber, ParseError> {
        if self.preamble.is_empty() {
            return Err(ParseError::MissingField("serial number"));
        }
        Ok(self.preamble.parse()?)
    }

    fn no_preamble(&self) -> Result<(), ParseError> {
        if self.preamble.is_empty() {
            Ok(())
        } else {
            Err(ParseError::UnexpectedArgument(self.preamble.clone()))
        }
    }

    fn no_values(&self) -> Result<(), ParseError> {
        self.only(&[])
    }

    /// Fails on the first prefix not in `allowed`.
    fn only(&self, allowed: &[Prefix]) -> Result<(), ParseError> {
        match self.values.iter().find(|(p, _)| !allowed.contains(p)) {
            Some((prefix, _)) => Err(ParseError::UnexpectedArgument(prefix.name().to_string())),
            None => Ok(()),
        }
    }
}

pub fn parse(line: &str) -> Result<ShellCommand, ParseError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    if word.is_empty() {
        return Err(ParseError::Empty);
    }

    let args = Arguments::tokenize(rest);

    match word {
        "add" => parse_add(&args),
        "delete" => {
            args.no_values()?;
            Ok(ShellCommand::Delete {
                serial: args.serial()?,
            })
        }
        "edit" => parse_edit(&args),
        "loan" => parse_loan(&args),
        "return" => {
            args.no_values()?;
            Ok(ShellCommand::Return {
                serial: args.serial()?,
            })
        }
        "find" => {
            let query = rest.trim();
            if query.is_empty() {
                return Err(ParseError::MissingField("search query"));
            }
            Ok(ShellCommand::Find {
                query: query.to_string(),
            })
        }
        "list" => bare(&args, ShellCommand::List),
        "loans" => bare(&args, ShellCommand::Loans),
        "undo" => bare(&args, ShellCommand::Undo),
        "redo" => bare(&args, ShellCommand::Redo),
        "history" => bare(&args, ShellCommand::History),
        "clear-history" => bare(&args, ShellCommand::ClearHistory),
        "log" => bare(&args, ShellCommand::Log),
        "help" => bare(&args, ShellCommand::Help),
        "exit" | "quit" => bare(&args, ShellCommand::Exit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

fn bare(args: &Arguments, command: ShellCommand) -> Result<ShellCommand, ParseError> {
    args.no_preamble()?;
    args.no_values()?;
    Ok(command)
}

const BOOK_FIELDS: &[Prefix] = &[Prefix::Title, Prefix::Author, Prefix::Genre];

fn parse_add(args: &Arguments) -> Result<ShellCommand, ParseError> {
    args.no_preamble()?;
    args.only(BOOK_FIELDS)?;
    let title = args
        .single(Prefix::Title)?
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::MissingField(Prefix::Title.name()))?;
    let author = args
        .single(Prefix::Author)?
        .filter(|a| !a.is_empty())
        .ok_or(ParseError::MissingField(Prefix::Author.name()))?;

    Ok(ShellCommand::Add {
        title: title.to_string(),
        author: author.to_string(),
        genres: args.genres()?.unwrap_or_default(),
    })
}

fn parse_edit(args: &Arguments) -> Result<ShellCommand, ParseError> {
    args.only(BOOK_FIELDS)?;
    let serial = args.serial()?;
    let changes = BookChanges {
        title: args.single(Prefix::Title)?.map(str::to_string),
        author: args.single(Prefix::Author)?.map(str::to_string),
        genres: args.genres()?,
    };
    if changes.is_empty() {
        return Err(ParseError::NothingToEdit);
    }
    Ok(ShellCommand::Edit { serial, changes })
}

fn parse_loan(args: &Arguments) -> Result<ShellCommand, ParseError> {
    args.only(&[Prefix::Borrower])?;
    let serial = args.serial()?;
    let borrower = args
        .single(Prefix::Borrower)?
        .filter(|b| !b.is_empty())
        .ok_or(ParseError::MissingField(Prefix::Borrower.name()))?;
    Ok(ShellCommand::Loan {
        serial,
        borrower: BorrowerId::new(borrower)?,
    })
}
