use std::collections::BTreeSet;

use crate::catalog::{Book, Catalog, CatalogError, Genre, SerialNumber};
use crate::command::{Command, CommandResult, ReversibleCommand};

/// A catalog mutation that has been applied and can be reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    Add { book: Book },
    Delete { index: usize, book: Book },
    Edit { before: Book, after: Book },
}

/// Single-step change to a catalog, used as the undo and redo form of a
/// [`CatalogCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEdit {
    /// Inserts at `index`, or appends when `None`.
    Insert { index: Option<usize>, book: Book },
    Remove { serial: SerialNumber },
    Replace { serial: SerialNumber, book: Book },
}

/// Fields to change on an existing book. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genres: Option<BTreeSet<Genre>>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.genres.is_none()
    }

    fn apply_to(&self, book: &Book) -> Result<Book, CatalogError> {
        Book::new(
            book.serial,
            self.title.as_deref().unwrap_or(&book.title),
            self.author.as_deref().unwrap_or(&book.author),
            self.genres.clone().unwrap_or_else(|| book.genres.clone()),
        )
    }
}

fn added_message(book: &Book) -> CommandResult {
    CommandResult::new(format!("New book added: {}", book))
}

fn deleted_message(book: &Book) -> CommandResult {
    CommandResult::new(format!("Deleted book: {}", book))
}

fn edited_message(book: &Book) -> CommandResult {
    CommandResult::new(format!("Edited book: {}", book))
}

impl CatalogCommand {
    /// Adds `book` to the end of the catalog.
    pub fn add(catalog: &mut Catalog, book: Book) -> Result<Self, CatalogError> {
        catalog.add_book(book.clone())?;
        Ok(Self::Add { book })
    }

    pub fn delete(catalog: &mut Catalog, serial: SerialNumber) -> Result<Self, CatalogError> {
        let (index, book) = catalog.remove_book(serial)?;
        Ok(Self::Delete { index, book })
    }

    pub fn edit(
        catalog: &mut Catalog,
        serial: SerialNumber,
        changes: &BookChanges,
    ) -> Result<Self, CatalogError> {
        let before = catalog
            .book(serial)
            .cloned()
            .ok_or(CatalogError::BookNotFound(serial))?;
        let after = changes.apply_to(&before)?;
        catalog.replace_book(serial, after.clone())?;
        Ok(Self::Edit { before, after })
    }
}

impl Command<Catalog> for CatalogEdit {
    type Output = CommandResult;
    type Error = CatalogError;

    fn execute(&self, catalog: &mut Catalog) -> Result<CommandResult, CatalogError> {
        match self {
            CatalogEdit::Insert { index, book } => {
                match index {
                    Some(idx) => catalog.insert_book(*idx, book.clone())?,
                    None => catalog.add_book(book.clone())?,
                }
                Ok(added_message(book))
            }
            CatalogEdit::Remove { serial } => {
                let (_, book) = catalog.remove_book(*serial)?;
                Ok(deleted_message(&book))
            }
            CatalogEdit::Replace { serial, book } => {
                catalog.replace_book(*serial, book.clone())?;
                Ok(edited_message(book))
            }
        }
    }
}

impl ReversibleCommand<Catalog> for CatalogCommand {
    type Output = CommandResult;
    type Error = CatalogError;
    type Undo = CatalogEdit;
    type Redo = CatalogEdit;

    fn undo_command(&self) -> CatalogEdit {
        match self {
            CatalogCommand::Add { book } => CatalogEdit::Remove {
                serial: book.serial,
            },
            CatalogCommand::Delete { index, book } => CatalogEdit::Insert {
                index: Some(*index),
                book: book.clone(),
            },
            CatalogCommand::Edit { before, after } => CatalogEdit::Replace {
                serial: after.serial,
                book: before.clone(),
            },
        }
    }

    fn redo_command(&self) -> CatalogEdit {
        match self {
            CatalogCommand::Add { book } => CatalogEdit::Insert {
                index: None,
                book: book.clone(),
            },
            CatalogCommand::Delete { book, .. } => CatalogEdit::Remove {
                serial: book.serial,
            },
            CatalogCommand::Edit { before, after } => CatalogEdit::Replace {
                serial: before.serial,
                book: after.clone(),
            },
        }
    }

    fn describe(&self) -> CommandResult {
        match self {
            CatalogCommand::Add { book } => added_message(book),
            CatalogCommand::Delete { book, .. } => deleted_message(book),
            CatalogCommand::Edit { after, .. } => edited_message(after),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::genre_set;
    use crate::history::{CommandHistory, HistoryError};
    use pretty_assertions::assert_eq;

    fn serial(value: u32) -> SerialNumber {
        SerialNumber::new(value).unwrap()
    }

    fn book(value: u32, title: &str) -> Book {
        Book::new(serial(value), title, "Jin Yong", genre_set(["fiction"]).unwrap()).unwrap()
    }

    fn catalog_of(titles: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for (n, title) in titles.iter().enumerate() {
            catalog.add_book(book(n as u32 + 1, title)).unwrap();
        }
        catalog
    }

    #[test]
    fn add_undo_redo_round_trip() {
        let mut catalog = catalog_of(&["One"]);
        let mut history = CommandHistory::new();
        let before = catalog.clone();

        let added = "New book added: Two (B00002) by Jin Yong [FICTION]";

        let command = CatalogCommand::add(&mut catalog, book(2, "Two")).unwrap();
        assert_eq!(command.describe().feedback, added);
        history.commit(command);
        let after = catalog.clone();

        let outcome = history.undo(&mut catalog).unwrap();
        assert_eq!(catalog, before);
        assert_eq!(
            outcome.actual.feedback,
            "Deleted book: Two (B00002) by Jin Yong [FICTION]"
        );
        assert_eq!(outcome.feedback.feedback, added);

        let redone = history.redo(&mut catalog).unwrap();
        assert_eq!(catalog, after);
        assert_eq!(redone, history.entries()[0].describe());
    }

    #[test]
    fn delete_undo_restores_original_position() {
        let mut catalog = catalog_of(&["One", "Two", "Three"]);
        let before = catalog.clone();
        let mut history = CommandHistory::new();

        history.commit(CatalogCommand::delete(&mut catalog, serial(2)).unwrap());
        assert_eq!(catalog.len(), 2);

        history.undo(&mut catalog).unwrap();
        assert_eq!(catalog, before);

        history.redo(&mut catalog).unwrap();
        assert!(!catalog.has_book(serial(2)));
    }

    #[test]
    fn edit_undo_restores_previous_fields() {
        let mut catalog = catalog_of(&["One", "Two"]);
        let before = catalog.clone();
        let mut history = CommandHistory::new();
        let changes = BookChanges {
            title: Some("Deux".to_string()),
            genres: Some(genre_set(["history", "action"]).unwrap()),
            ..BookChanges::default()
        };

        history.commit(CatalogCommand::edit(&mut catalog, serial(2), &changes).unwrap());
        let edited = catalog.book(serial(2)).unwrap().clone();
        assert_eq!(edited.title, "Deux");
        assert_eq!(edited.author, "Jin Yong");
        assert_eq!(edited.genres, genre_set(["ACTION", "HISTORY"]).unwrap());

        let outcome = history.undo(&mut catalog).unwrap();
        assert_eq!(catalog, before);
        assert_eq!(outcome.feedback, edited_message(&edited));

        history.redo(&mut catalog).unwrap();
        assert_eq!(catalog.book(serial(2)), Some(&edited));
    }

    #[test]
    fn failed_forward_command_leaves_catalog_untouched() {
        let mut catalog = catalog_of(&["One"]);
        let before = catalog.clone();

        assert_eq!(
            CatalogCommand::add(&mut catalog, book(1, "Again")),
            Err(CatalogError::DuplicateBook(serial(1)))
        );
        assert_eq!(
            CatalogCommand::delete(&mut catalog, serial(4)),
            Err(CatalogError::BookNotFound(serial(4)))
        );
        let blank = BookChanges {
            author: Some("  ".to_string()),
            ..BookChanges::default()
        };
        assert_eq!(
            CatalogCommand::edit(&mut catalog, serial(1), &blank),
            Err(CatalogError::BlankField("author"))
        );
        assert_eq!(catalog, before);
    }

    #[test]
    fn undo_error_from_catalog_propagates() {
        let mut catalog = catalog_of(&["One"]);
        let mut history = CommandHistory::new();
        history.commit(CatalogCommand::add(&mut catalog, book(2, "Two")).unwrap());

        // Someone removed the book behind the history's back.
        catalog.remove_book(serial(2)).unwrap();

        assert_eq!(
            history.undo(&mut catalog),
            Err(HistoryError::Command(CatalogError::BookNotFound(serial(2))))
        );
        assert!(!history.can_undo());
    }

    #[test]
    fn multi_step_undo_unwinds_in_reverse_order() {
        let mut catalog = catalog_of(&["One", "Two"]);
        let start = catalog.clone();
        let mut history = CommandHistory::new();

        history.commit(CatalogCommand::add(&mut catalog, book(3, "Three")).unwrap());
        history.commit(CatalogCommand::delete(&mut catalog, serial(1)).unwrap());
        let rename = BookChanges {
            title: Some("Drei".to_string()),
            ..BookChanges::default()
        };
        history.commit(CatalogCommand::edit(&mut catalog, serial(3), &rename).unwrap());
        let end = catalog.clone();

        while history.can_undo() {
            history.undo(&mut catalog).unwrap();
        }
        assert_eq!(catalog, start);

        while history.can_redo() {
            history.redo(&mut catalog).unwrap();
        }
        assert_eq!(catalog, end);
    }
}
