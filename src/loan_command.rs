use chrono::NaiveDate;

use crate::catalog::SerialNumber;
use crate::command::{Command, CommandResult, ReversibleCommand};
use crate::loan::{Loan, LoanError, LoanId, LoanRecords};

/// A change to the loan records that has been applied and can be reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanCommand {
    Lend { loan: Loan },
    Return { before: Loan, after: Loan },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanEdit {
    Insert { loan: Loan },
    Remove { id: LoanId },
    Replace { id: LoanId, loan: Loan },
}

fn lent_message(loan: &Loan) -> CommandResult {
    CommandResult::new(format!("New loan: {}", loan))
}

fn cancelled_message(loan: &Loan) -> CommandResult {
    CommandResult::new(format!("Loan cancelled: {}", loan))
}

fn replaced_message(loan: &Loan) -> CommandResult {
    match loan.return_date {
        Some(on) => {
            let overdue = loan.days_overdue(on);
            if overdue > 0 {
                CommandResult::new(format!("Book returned: {} ({} day(s) overdue)", loan, overdue))
            } else {
                CommandResult::new(format!("Book returned: {}", loan))
            }
        }
        None => CommandResult::new(format!("Loan reopened: {}", loan)),
    }
}

impl LoanCommand {
    pub fn lend(records: &mut LoanRecords, loan: Loan) -> Result<Self, LoanError> {
        records.add_loan(loan.clone())?;
        Ok(Self::Lend { loan })
    }

    /// Closes the active loan on `serial` as of `on`.
    pub fn return_book(
        records: &mut LoanRecords,
        serial: SerialNumber,
        on: NaiveDate,
    ) -> Result<Self, LoanError> {
        let before = records
            .active_loan(serial)
            .cloned()
            .ok_or(LoanError::NoActiveLoan(serial))?;
        let after = before.returned(on)?;
        records.replace_loan(before.id, after.clone())?;
        Ok(Self::Return { before, after })
    }
}

impl Command<LoanRecords> for LoanEdit {
    type Output = CommandResult;
    type Error = LoanError;

    fn execute(&self, records: &mut LoanRecords) -> Result<CommandResult, LoanError> {
        match self {
            LoanEdit::Insert { loan } => {
                records.add_loan(loan.clone())?;
                Ok(lent_message(loan))
            }
            LoanEdit::Remove { id } => {
                let loan = records.remove_loan(*id)?;
                Ok(cancelled_message(&loan))
            }
            LoanEdit::Replace { id, loan } => {
                records.replace_loan(*id, loan.clone())?;
                Ok(replaced_message(loan))
            }
        }
    }
}

impl ReversibleCommand<LoanRecords> for LoanCommand {
    type Output = CommandResult;
    type Error = LoanError;
    type Undo = LoanEdit;
    type Redo = LoanEdit;

    fn undo_command(&self) -> LoanEdit {
        match self {
            LoanCommand::Lend { loan } => LoanEdit::Remove { id: loan.id },
            LoanCommand::Return { before, .. } => LoanEdit::Replace {
                id: before.id,
                loan: before.clone(),
            },
        }
    }

    fn redo_command(&self) -> LoanEdit {
        match self {
            LoanCommand::Lend { loan } => LoanEdit::Insert { loan: loan.clone() },
            LoanCommand::Return { after, .. } => LoanEdit::Replace {
                id: after.id,
                loan: after.clone(),
            },
        }
    }

    fn describe(&self) -> CommandResult {
        match self {
            LoanCommand::Lend { loan } => lent_message(loan),
            LoanCommand::Return { after, .. } => replaced_message(after),
        }
    }
}
