use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::{Book, Catalog, CatalogError, SerialNumber};
use crate::catalog_command::{BookChanges, CatalogCommand, CatalogEdit};
use crate::command::{Command, CommandResult, ReversibleCommand};
use crate::date::extend_date;
use crate::loan::{BorrowerId, Loan, LoanError, LoanRecords};
use crate::loan_command::{LoanCommand, LoanEdit};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Loan(#[from] LoanError),
}

/// The books on the shelf and the record of who borrowed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    pub catalog: Catalog,
    pub loans: LoanRecords,
}

impl Library {
    pub fn new(catalog: Catalog, loans: LoanRecords) -> Self {
        Self { catalog, loans }
    }
}

/// Any reversible change to the library. Catalog and loan changes share one
/// history so they undo in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryCommand {
    Catalog(CatalogCommand),
    Loan(LoanCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEdit {
    Catalog(CatalogEdit),
    Loan(LoanEdit),
}

impl LibraryCommand {
    pub fn add_book(library: &mut Library, book: Book) -> Result<Self, LibraryError> {
        Ok(Self::Catalog(CatalogCommand::add(&mut library.catalog, book)?))
    }

    /// Deletes a book that is not currently lent out.
    pub fn delete_book(library: &mut Library, serial: SerialNumber) -> Result<Self, LibraryError> {
        if library.loans.active_loan(serial).is_some() {
            return Err(LoanError::BookOnLoan(serial).into());
        }
        Ok(Self::Catalog(CatalogCommand::delete(
            &mut library.catalog,
            serial,
        )?))
    }

    pub fn edit_book(
        library: &mut Library,
        serial: SerialNumber,
        changes: &BookChanges,
    ) -> Result<Self, LibraryError> {
        Ok(Self::Catalog(CatalogCommand::edit(
            &mut library.catalog,
            serial,
            changes,
        )?))
    }

    /// Lends `serial` to `borrower` from `today` for `period_days` days.
    pub fn lend(
        library: &mut Library,
        serial: SerialNumber,
        borrower: BorrowerId,
        today: NaiveDate,
        period_days: u32,
    ) -> Result<Self, LibraryError> {
        if !library.catalog.has_book(serial) {
            return Err(CatalogError::BookNotFound(serial).into());
        }
        let id = library.loans.next_id()?;
        let loan = Loan::new(
            id,
            serial,
            borrower,
            today,
            extend_date(today, period_days),
        )?;
        Ok(Self::Loan(LoanCommand::lend(&mut library.loans, loan)?))
    }

    pub fn return_book(
        library: &mut Library,
        serial: SerialNumber,
        today: NaiveDate,
    ) -> Result<Self, LibraryError> {
        Ok(Self::Loan(LoanCommand::return_book(
            &mut library.loans,
            serial,
            today,
        )?))
    }
}

impl Command<Library> for LibraryEdit {
    type Output = CommandResult;
    type Error = LibraryError;

    fn execute(&self, library: &mut Library) -> Result<CommandResult, LibraryError> {
        match self {
            LibraryEdit::Catalog(edit) => Ok(edit.execute(&mut library.catalog)?),
            LibraryEdit::Loan(edit) => Ok(edit.execute(&mut library.loans)?),
        }
    }
}

impl ReversibleCommand<Library> for LibraryCommand {
    type Output = CommandResult;
    type Error = LibraryError;
    type Undo = LibraryEdit;
    type Redo = LibraryEdit;

    fn undo_command(&self) -> LibraryEdit {
        match self {
            LibraryCommand::Catalog(command) => LibraryEdit::Catalog(command.undo_command()),
            LibraryCommand::Loan(command) => LibraryEdit::Loan(command.undo_command()),
        }
    }

    fn redo_command(&self) -> LibraryEdit {
        match self {
            LibraryCommand::Catalog(command) => LibraryEdit::Catalog(command.redo_command()),
            LibraryCommand::Loan(command) => LibraryEdit::Loan(command.redo_command()),
        }
    }

    fn describe(&self) -> CommandResult {
        match self {
            LibraryCommand::Catalog(command) => command.describe(),
            LibraryCommand::Loan(command) => command.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommandHistory, HistoryError};
    use crate::sample::sample_catalog;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn serial(value: u32) -> SerialNumber {
        SerialNumber::new(value).unwrap()
    }

    fn borrower() -> BorrowerId {
        BorrowerId::new("K0123456").unwrap()
    }

    fn library() -> Library {
        Library::new(sample_catalog(), LoanRecords::new())
    }

    #[test]
    fn lend_sets_due_date_from_period() {
        let mut library = library();
        let command =
            LibraryCommand::lend(&mut library, serial(2), borrower(), date(2026, 10, 20), 14)
                .unwrap();

        let loan = library.loans.active_loan(serial(2)).unwrap();
        assert_eq!(loan.due_date, date(2026, 11, 3));
        assert_eq!(
            command.describe().feedback,
            "New loan: L00001: B00002 to K0123456, due 03/11/2026"
        );
    }

    #[test]
    fn cannot_lend_missing_or_lent_book() {
        let mut library = library();
        let today = date(2026, 10, 1);

        assert_eq!(
            LibraryCommand::lend(&mut library, serial(99), borrower(), today, 14),
            Err(LibraryError::Catalog(CatalogError::BookNotFound(serial(99))))
        );
        LibraryCommand::lend(&mut library, serial(1), borrower(), today, 14).unwrap();
        assert_eq!(
            LibraryCommand::lend(&mut library, serial(1), borrower(), today, 14),
            Err(LibraryError::Loan(LoanError::BookOnLoan(serial(1))))
        );
    }

    #[test]
    fn cannot_delete_lent_book() {
        let mut library = library();
        LibraryCommand::lend(&mut library, serial(3), borrower(), date(2026, 10, 1), 14).unwrap();
        let before = library.clone();

        assert_eq!(
            LibraryCommand::delete_book(&mut library, serial(3)),
            Err(LibraryError::Loan(LoanError::BookOnLoan(serial(3))))
        );
        assert_eq!(library, before);

        LibraryCommand::return_book(&mut library, serial(3), date(2026, 10, 2)).unwrap();
        LibraryCommand::delete_book(&mut library, serial(3)).unwrap();
        assert!(!library.catalog.has_book(serial(3)));
    }

    #[test]
    fn catalog_and_loan_changes_share_one_history() {
        let mut library = library();
        let start = library.clone();
        let mut history = CommandHistory::new();

        history.commit(
            LibraryCommand::lend(&mut library, serial(4), borrower(), date(2026, 10, 1), 14)
                .unwrap(),
        );
        history.commit(
            LibraryCommand::return_book(&mut library, serial(4), date(2026, 10, 20)).unwrap(),
        );
        history.commit(LibraryCommand::delete_book(&mut library, serial(4)).unwrap());
        let end = library.clone();

        let outcome = history.undo(&mut library).unwrap();
        assert!(outcome.feedback.feedback.starts_with("Deleted book: Harry Botter"));
        let outcome = history.undo(&mut library).unwrap();
        assert!(outcome.feedback.feedback.ends_with("(5 day(s) overdue)"));
        assert!(library.loans.active_loan(serial(4)).is_some());
        history.undo(&mut library).unwrap();
        assert_eq!(library, start);

        while history.can_redo() {
            history.redo(&mut library).unwrap();
        }
        assert_eq!(library, end);
    }

    #[test]
    fn loan_undo_error_propagates() {
        let mut library = library();
        let mut history = CommandHistory::new();
        history.commit(
            LibraryCommand::lend(&mut library, serial(1), borrower(), date(2026, 10, 1), 14)
                .unwrap(),
        );
        library.loans = LoanRecords::new();

        assert!(matches!(
            history.undo(&mut library),
            Err(HistoryError::Command(LibraryError::Loan(LoanError::LoanNotFound(_))))
        ));
    }
}
