use fs2::FileExt;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::{Book, Catalog, CatalogError, SerialNumber, genre_set};
use crate::date::{format_date, parse_date};
use crate::library::Library;
use crate::loan::{BorrowerId, Loan, LoanError, LoanId, LoanRecords};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access catalog file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog file {} is not valid JSON", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog contains duplicate book(s)")]
    DuplicateBooks,
    #[error("loans list contains duplicate loan(s)")]
    DuplicateLoans,
    #[error("catalog file contains an invalid book")]
    InvalidBook(#[from] CatalogError),
    #[error("catalog file contains an invalid loan")]
    InvalidLoan(#[from] LoanError),
    #[error("invalid date '{0}', expected dd/mm/yyyy")]
    InvalidDate(String),
    #[error("loan {loan} is for book {serial}, which is not in the catalog")]
    LoanForMissingBook { loan: LoanId, serial: SerialNumber },
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonLibrary {
    books: Vec<JsonBook>,
    #[serde(default)]
    loans: Vec<JsonLoan>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonBook {
    serial: String,
    title: String,
    author: String,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonLoan {
    id: String,
    serial: String,
    borrower: String,
    start_date: String,
    due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    return_date: Option<String>,
}

impl From<&Book> for JsonBook {
    fn from(book: &Book) -> Self {
        Self {
            serial: book.serial.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            genres: book.genres.iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl JsonBook {
    fn to_model(&self) -> Result<Book, CatalogError> {
        let serial: SerialNumber = self.serial.parse()?;
        let genres = genre_set(self.genres.iter().map(String::as_str))?;
        Book::new(serial, &self.title, &self.author, genres)
    }
}

impl From<&Loan> for JsonLoan {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id.to_string(),
            serial: loan.serial.to_string(),
            borrower: loan.borrower.to_string(),
            start_date: format_date(loan.start_date),
            due_date: format_date(loan.due_date),
            return_date: loan.return_date.map(format_date),
        }
    }
}

fn date_field(value: &str) -> Result<chrono::NaiveDate, StorageError> {
    parse_date(value).map_err(|_| StorageError::InvalidDate(value.to_string()))
}

impl JsonLoan {
    fn to_model(&self) -> Result<Loan, StorageError> {
        let loan = Loan::new(
            self.id.parse()?,
            self.serial.parse()?,
            BorrowerId::new(&self.borrower)?,
            date_field(&self.start_date)?,
            date_field(&self.due_date)?,
        )?;
        match &self.return_date {
            Some(returned) => Ok(loan.returned(date_field(returned)?)?),
            None => Ok(loan),
        }
    }
}

impl From<&Library> for JsonLibrary {
    fn from(library: &Library) -> Self {
        Self {
            books: library.catalog.books().iter().map(JsonBook::from).collect(),
            loans: library.loans.loans().iter().map(JsonLoan::from).collect(),
        }
    }
}

impl JsonLibrary {
    fn to_model(&self) -> Result<Library, StorageError> {
        let mut catalog = Catalog::new();
        for json_book in &self.books {
            match catalog.add_book(json_book.to_model()?) {
                Ok(()) => {}
                Err(CatalogError::DuplicateBook(_)) => return Err(StorageError::DuplicateBooks),
                Err(e) => return Err(e.into()),
            }
        }

        let mut loans = LoanRecords::new();
        for json_loan in &self.loans {
            let loan = json_loan.to_model()?;
            if loan.is_active() && !catalog.has_book(loan.serial) {
                return Err(StorageError::LoanForMissingBook {
                    loan: loan.id,
                    serial: loan.serial,
                });
            }
            match loans.add_loan(loan) {
                Ok(()) => {}
                Err(LoanError::DuplicateLoan(_)) => return Err(StorageError::DuplicateLoans),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Library::new(catalog, loans))
    }
}

/// Reads the library stored at `path`, or `None` if there is no file yet.
/// Holds a shared lock while reading so a concurrent save cannot be seen
/// half-written.
pub fn load(path: &Path) -> Result<Option<Library>, StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No catalog file at {}", path.display());
            return Ok(None);
        }
        Err(source) => return Err(io_err(source)),
    };
    FileExt::lock_shared(&file).map_err(io_err)?;

    let parsed: Result<JsonLibrary, _> = serde_json::from_reader(BufReader::new(&file));
    let unlocked = FileExt::unlock(&file);
    let json = parsed.map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    unlocked.map_err(io_err)?;
    let library = json.to_model()?;

    info!(
        "Loaded {} book(s) and {} loan(s) from {}",
        library.catalog.len(),
        library.loans.len(),
        path.display()
    );
    Ok(Some(library))
}

/// Writes `library` to `path` while holding an exclusive lock on the file.
pub fn save(path: &Path, library: &Library) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(io_err)?;
    FileExt::lock_exclusive(&file).map_err(io_err)?;

    let written = write_locked(&file, library);
    let unlocked = FileExt::unlock(&file);
    written.map_err(io_err)?;
    unlocked.map_err(io_err)?;

    debug!(
        "Saved {} book(s) and {} loan(s) to {}",
        library.catalog.len(),
        library.loans.len(),
        path.display()
    );
    Ok(())
}

fn write_locked(file: &File, library: &Library) -> io::Result<()> {
    file.set_len(0)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &JsonLibrary::from(library))?;
    writer.write_all(b"\n")?;
    writer.flush()
}
