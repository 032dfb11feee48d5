use log::debug;
use thiserror::Error;

use crate::command::{Command, ReversibleCommand};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError<E> {
    #[error("current command pointer does not point to any reversible command, unable to undo")]
    NoUndoableCommand,
    #[error("current command pointer is at end of command history list, no command to redo")]
    NoRedoableCommand,
    #[error(transparent)]
    Command(E),
}

/// Results of an undo.
///
/// `actual` is what the inverse command produced when it ran; `feedback` is
/// the description of the original forward action, which is what the user
/// should be told was undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome<T> {
    pub actual: T,
    pub feedback: T,
}

/// Linear undo/redo log of reversible commands.
///
/// Entries before `applied` are current and can be undone, entries from
/// `applied` onwards have been undone and can be redone until the next
/// commit discards them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHistory<C> {
    entries: Vec<C>,
    applied: usize,
}

impl<C> Default for CommandHistory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandHistory<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
        }
    }

    /// Records a command the caller has already applied to the model.
    /// Any undone commands are dropped.
    pub fn commit(&mut self, command: C) {
        let discarded = self.entries.len() - self.applied;
        if discarded > 0 {
            debug!("Discarding {} undone command(s) from history", discarded);
        }
        self.entries.truncate(self.applied);
        self.entries.push(command);
        self.applied = self.entries.len();
        debug!("Committed command, history length is {}", self.entries.len());
    }

    /// Undoes the latest current command.
    ///
    /// The cursor moves back before the inverse runs, so if the inverse fails
    /// the entry is still treated as undone and its error is returned as is.
    pub fn undo<M>(
        &mut self,
        model: &mut M,
    ) -> Result<UndoOutcome<C::Output>, HistoryError<C::Error>>
    where
        C: ReversibleCommand<M>,
    {
        if !self.can_undo() {
            return Err(HistoryError::NoUndoableCommand);
        }

        self.applied -= 1;
        debug!(
            "Undoing command {} of {}",
            self.applied + 1,
            self.entries.len()
        );

        let command = &self.entries[self.applied];
        let actual = command
            .undo_command()
            .execute(model)
            .map_err(HistoryError::Command)?;
        let feedback = command.describe();

        Ok(UndoOutcome { actual, feedback })
    }

    /// Re-applies the most recently undone command.
    pub fn redo<M>(&mut self, model: &mut M) -> Result<C::Output, HistoryError<C::Error>>
    where
        C: ReversibleCommand<M>,
    {
        if !self.can_redo() {
            return Err(HistoryError::NoRedoableCommand);
        }

        let command = &self.entries[self.applied];
        self.applied += 1;
        debug!("Redoing command {} of {}", self.applied, self.entries.len());

        command
            .redo_command()
            .execute(model)
            .map_err(HistoryError::Command)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    pub fn reset(&mut self) {
        debug!("Resetting command history ({} entries)", self.entries.len());
        self.entries.clear();
        self.applied = 0;
    }

    /// Index of the latest current command, `None` when nothing can be undone.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[C] {
        &self.entries
    }

    pub fn peek_undo(&self) -> Option<&C> {
        self.cursor().map(|idx| &self.entries[idx])
    }

    pub fn peek_redo(&self) -> Option<&C> {
        self.entries.get(self.applied)
    }
}
