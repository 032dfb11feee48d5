use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::SerialNumber;
use crate::date::{self, format_date};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("loan {0} already exists")]
    DuplicateLoan(LoanId),
    #[error("no loan with id {0}")]
    LoanNotFound(LoanId),
    #[error("book {0} is already on loan")]
    BookOnLoan(SerialNumber),
    #[error("book {0} is not on loan")]
    NoActiveLoan(SerialNumber),
    #[error("loan {0} has already been returned")]
    AlreadyReturned(LoanId),
    #[error("invalid loan id '{0}', expected an 'L' followed by five digits")]
    InvalidLoanId(String),
    #[error("invalid borrower id '{0}', borrower ids are letters and digits")]
    InvalidBorrower(String),
    #[error("loan {0} has dates out of order")]
    InvalidDates(LoanId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoanId(u32);

impl LoanId {
    const PREFIX: char = 'L';
    const DIGITS: usize = 5;
    const MAX: u32 = 99_999;

    pub const FIRST: LoanId = LoanId(1);

    pub fn new(value: u32) -> Result<Self, LoanError> {
        if value == 0 || value > Self::MAX {
            return Err(LoanError::InvalidLoanId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn next(self) -> Result<Self, LoanError> {
        Self::new(self.0 + 1)
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", Self::PREFIX, self.0, width = Self::DIGITS)
    }
}

impl FromStr for LoanId {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LoanError::InvalidLoanId(s.to_string());
        let digits = s
            .trim()
            .strip_prefix(Self::PREFIX)
            .ok_or_else(invalid)?;
        if digits.len() != Self::DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u32 = digits.parse().map_err(|_| invalid())?;
        Self::new(value).map_err(|_| invalid())
    }
}

/// Identifier of the person a book is lent to, stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorrowerId(String);

impl BorrowerId {
    pub fn new(id: &str) -> Result<Self, LoanError> {
        let id = id.trim().to_uppercase();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LoanError::InvalidBorrower(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: LoanId,
    pub serial: SerialNumber,
    pub borrower: BorrowerId,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Loan {
    pub fn new(
        id: LoanId,
        serial: SerialNumber,
        borrower: BorrowerId,
        start_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<Self, LoanError> {
        if due_date < start_date {
            return Err(LoanError::InvalidDates(id));
        }
        Ok(Self {
            id,
            serial,
            borrower,
            start_date,
            due_date,
            return_date: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    /// Days past due as of the return date, or `today` for an open loan.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        date::days_overdue(self.due_date, self.return_date.unwrap_or(today))
    }

    /// This loan closed on `on`.
    pub fn returned(&self, on: NaiveDate) -> Result<Loan, LoanError> {
        if !self.is_active() {
            return Err(LoanError::AlreadyReturned(self.id));
        }
        if on < self.start_date {
            return Err(LoanError::InvalidDates(self.id));
        }
        Ok(Loan {
            return_date: Some(on),
            ..self.clone()
        })
    }
}

impl fmt::Display for Loan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} to {}, due {}",
            self.id,
            self.serial,
            self.borrower,
            format_date(self.due_date)
        )?;
        if let Some(returned) = self.return_date {
            write!(f, ", returned {}", format_date(returned))?;
        }
        Ok(())
    }
}

/// Every loan ever made, oldest first. A book has at most one active loan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanRecords {
    loans: Vec<Loan>,
}

impl LoanRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn active_loan(&self, serial: SerialNumber) -> Option<&Loan> {
        self.loans
            .iter()
            .find(|loan| loan.serial == serial && loan.is_active())
    }

    fn position(&self, id: LoanId) -> Option<usize> {
        self.loans.iter().position(|loan| loan.id == id)
    }

    pub fn add_loan(&mut self, loan: Loan) -> Result<(), LoanError> {
        if self.position(loan.id).is_some() {
            return Err(LoanError::DuplicateLoan(loan.id));
        }
        if loan.is_active() && self.active_loan(loan.serial).is_some() {
            return Err(LoanError::BookOnLoan(loan.serial));
        }
        self.loans.push(loan);
        Ok(())
    }

    pub fn remove_loan(&mut self, id: LoanId) -> Result<Loan, LoanError> {
        let idx = self.position(id).ok_or(LoanError::LoanNotFound(id))?;
        Ok(self.loans.remove(idx))
    }

    /// Swaps the loan stored under `id` for `loan`. Returns the replaced loan.
    pub fn replace_loan(&mut self, id: LoanId, loan: Loan) -> Result<Loan, LoanError> {
        let idx = self.position(id).ok_or(LoanError::LoanNotFound(id))?;
        if loan.id != id && self.position(loan.id).is_some() {
            return Err(LoanError::DuplicateLoan(loan.id));
        }
        if loan.is_active()
            && self
                .loans
                .iter()
                .any(|other| other.id != id && other.serial == loan.serial && other.is_active())
        {
            return Err(LoanError::BookOnLoan(loan.serial));
        }
        Ok(std::mem::replace(&mut self.loans[idx], loan))
    }

    pub fn next_id(&self) -> Result<LoanId, LoanError> {
        match self.loans.iter().map(|loan| loan.id).max() {
            Some(highest) => highest.next(),
            None => Ok(LoanId::FIRST),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan(id: u32, serial: u32) -> Loan {
        Loan::new(
            LoanId::new(id).unwrap(),
            SerialNumber::new(serial).unwrap(),
            BorrowerId::new("k0123456").unwrap(),
            date(2026, 10, 1),
            date(2026, 10, 15),
        )
        .unwrap()
    }

    #[test]
    fn loan_id_formats_and_parses() {
        let id = LoanId::new(12).unwrap();
        assert_eq!(id.to_string(), "L00012");
        assert_eq!("L00012".parse::<LoanId>().unwrap(), id);
        for input in ["", "L12", "B00012", "L00000", "L0001x"] {
            assert!(input.parse::<LoanId>().is_err(), "'{}' should not parse", input);
        }
    }

    #[test]
    fn borrower_id_is_upper_cased() {
        assert_eq!(BorrowerId::new(" k0123456 ").unwrap().as_str(), "K0123456");
        assert!(BorrowerId::new("").is_err());
        assert!(BorrowerId::new("k 01").is_err());
    }

    #[test]
    fn due_date_cannot_precede_start() {
        let id = LoanId::FIRST;
        assert_eq!(
            Loan::new(
                id,
                SerialNumber::FIRST,
                BorrowerId::new("A1").unwrap(),
                date(2026, 10, 2),
                date(2026, 10, 1),
            ),
            Err(LoanError::InvalidDates(id))
        );
    }

    #[test]
    fn overdue_counts_from_due_date() {
        let open = loan(1, 1);
        assert_eq!(open.days_overdue(date(2026, 10, 10)), 0);
        assert_eq!(open.days_overdue(date(2026, 10, 15)), 0);
        assert_eq!(open.days_overdue(date(2026, 10, 18)), 3);

        let closed = open.returned(date(2026, 10, 20)).unwrap();
        assert_eq!(closed.days_overdue(date(2027, 1, 1)), 5);
        assert_eq!(
            closed.returned(date(2026, 10, 21)),
            Err(LoanError::AlreadyReturned(closed.id))
        );
        assert_eq!(
            open.returned(date(2026, 9, 30)),
            Err(LoanError::InvalidDates(open.id))
        );
    }

    #[test]
    fn loan_display_includes_dates() {
        let open = loan(3, 2);
        assert_eq!(open.to_string(), "L00003: B00002 to K0123456, due 15/10/2026");
        assert_eq!(
            open.returned(date(2026, 10, 16)).unwrap().to_string(),
            "L00003: B00002 to K0123456, due 15/10/2026, returned 16/10/2026"
        );
    }

    #[test]
    fn one_active_loan_per_book() {
        let mut records = LoanRecords::new();
        records.add_loan(loan(1, 1)).unwrap();

        assert_eq!(
            records.add_loan(loan(1, 2)),
            Err(LoanError::DuplicateLoan(LoanId::FIRST))
        );
        assert_eq!(
            records.add_loan(loan(2, 1)),
            Err(LoanError::BookOnLoan(SerialNumber::FIRST))
        );

        let closed = records.loans()[0].returned(date(2026, 10, 3)).unwrap();
        records.replace_loan(LoanId::FIRST, closed).unwrap();
        assert!(records.active_loan(SerialNumber::FIRST).is_none());

        records.add_loan(loan(2, 1)).unwrap();
        assert_eq!(records.active_loan(SerialNumber::FIRST).unwrap().id.to_string(), "L00002");
        assert_eq!(records.next_id().unwrap().to_string(), "L00003");
    }

    #[test]
    fn reopening_conflicting_loan_fails() {
        let mut records = LoanRecords::new();
        let first = loan(1, 1);
        let closed = first.returned(date(2026, 10, 3)).unwrap();
        records.add_loan(closed).unwrap();
        records.add_loan(loan(2, 1)).unwrap();

        assert_eq!(
            records.replace_loan(LoanId::FIRST, first),
            Err(LoanError::BookOnLoan(SerialNumber::FIRST))
        );
    }

    #[test]
    fn remove_missing_loan_fails() {
        let mut records = LoanRecords::new();
        let id = LoanId::new(4).unwrap();
        assert_eq!(records.remove_loan(id), Err(LoanError::LoanNotFound(id)));
        assert_eq!(records.next_id().unwrap(), LoanId::FIRST);
    }
}
