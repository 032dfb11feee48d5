use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("book {0} already exists in the catalog")]
    DuplicateBook(SerialNumber),
    #[error("no book with serial number {0}")]
    BookNotFound(SerialNumber),
    #[error("invalid serial number '{0}', expected a 'B' followed by five digits")]
    InvalidSerial(String),
    #[error("invalid genre '{0}', genres are letters, digits and '-'")]
    InvalidGenre(String),
    #[error("{0} cannot be blank")]
    BlankField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerialNumber(u32);

impl SerialNumber {
    const PREFIX: char = 'B';
    const DIGITS: usize = 5;
    const MAX: u32 = 99_999;

    pub const FIRST: SerialNumber = SerialNumber(1);

    pub fn new(value: u32) -> Result<Self, CatalogError> {
        if value == 0 || value > Self::MAX {
            return Err(CatalogError::InvalidSerial(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn next(self) -> Result<Self, CatalogError> {
        Self::new(self.0 + 1)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", Self::PREFIX, self.0, width = Self::DIGITS)
    }
}

impl FromStr for SerialNumber {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidSerial(s.to_string());
        let trimmed = s.trim();

        let digits = trimmed
            .strip_prefix(Self::PREFIX)
            .or_else(|| trimmed.strip_prefix(Self::PREFIX.to_ascii_lowercase()))
            .ok_or_else(invalid)?;
        if digits.len() != Self::DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: u32 = digits.parse().map_err(|_| invalid())?;
        Self::new(value).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Genre(String);

impl Genre {
    pub fn new(name: &str) -> Result<Self, CatalogError> {
        let name = name.trim().to_uppercase();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(CatalogError::InvalidGenre(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn genre_set<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeSet<Genre>, CatalogError> {
    names.into_iter().map(Genre::new).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub serial: SerialNumber,
    pub title: String,
    pub author: String,
    pub genres: BTreeSet<Genre>,
}

impl Book {
    pub fn new(
        serial: SerialNumber,
        title: &str,
        author: &str,
        genres: BTreeSet<Genre>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            serial,
            title: non_blank(title, "title")?,
            author: non_blank(author, "author")?,
            genres,
        })
    }
}

fn non_blank(value: &str, field: &'static str) -> Result<String, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::BlankField(field));
    }
    Ok(value.to_string())
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) by {}", self.title, self.serial, self.author)?;
        if !self.genres.is_empty() {
            let genres: Vec<&str> = self.genres.iter().map(Genre::as_str).collect();
            write!(f, " [{}]", genres.join(", "))?;
        }
        Ok(())
    }
}

/// Ordered collection of books, unique by serial number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn has_book(&self, serial: SerialNumber) -> bool {
        self.position(serial).is_some()
    }

    pub fn book(&self, serial: SerialNumber) -> Option<&Book> {
        self.position(serial).map(|idx| &self.books[idx])
    }

    fn position(&self, serial: SerialNumber) -> Option<usize> {
        self.books.iter().position(|b| b.serial == serial)
    }

    pub fn add_book(&mut self, book: Book) -> Result<(), CatalogError> {
        self.insert_book(self.books.len(), book)
    }

    /// Inserts at `index`, clamped to the end of the catalog.
    pub fn insert_book(&mut self, index: usize, book: Book) -> Result<(), CatalogError> {
        if self.has_book(book.serial) {
            return Err(CatalogError::DuplicateBook(book.serial));
        }
        let index = index.min(self.books.len());
        self.books.insert(index, book);
        Ok(())
    }

    pub fn remove_book(&mut self, serial: SerialNumber) -> Result<(usize, Book), CatalogError> {
        let idx = self
            .position(serial)
            .ok_or(CatalogError::BookNotFound(serial))?;
        Ok((idx, self.books.remove(idx)))
    }

    /// Swaps the book stored under `serial` for `book`, keeping its position.
    /// Returns the book that was replaced.
    pub fn replace_book(&mut self, serial: SerialNumber, book: Book) -> Result<Book, CatalogError> {
        let idx = self
            .position(serial)
            .ok_or(CatalogError::BookNotFound(serial))?;
        if book.serial != serial && self.has_book(book.serial) {
            return Err(CatalogError::DuplicateBook(book.serial));
        }
        Ok(std::mem::replace(&mut self.books[idx], book))
    }

    pub fn next_serial(&self) -> Result<SerialNumber, CatalogError> {
        match self.books.iter().map(|b| b.serial).max() {
            Some(highest) => highest.next(),
            None => Ok(SerialNumber::FIRST),
        }
    }

    /// Books whose title or author fuzzy-match `query`, best match first.
    pub fn find(&self, query: &str) -> Vec<&Book> {
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &Book)> = self
            .books
            .iter()
            .filter_map(|book| {
                let haystack = format!("{} {}", book.title, book.author);
                matcher.fuzzy_match(&haystack, query).map(|score| (score, book))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, book)| book).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn serial(value: u32) -> SerialNumber {
        SerialNumber::new(value).unwrap()
    }

    fn book(value: u32, title: &str) -> Book {
        Book::new(serial(value), title, "Some Author", genre_set(["fiction"]).unwrap()).unwrap()
    }

    #[test]
    fn serial_number_formats_and_parses() {
        assert_eq!(serial(42).to_string(), "B00042");
        assert_eq!("B00042".parse::<SerialNumber>().unwrap(), serial(42));
        assert_eq!(" b00007 ".parse::<SerialNumber>().unwrap(), serial(7));
    }

    #[test]
    fn serial_number_rejects_bad_input() {
        for input in ["", "B", "B1", "B000001", "X00001", "B0000a", "B00000"] {
            assert!(
                input.parse::<SerialNumber>().is_err(),
                "'{}' should not parse",
                input
            );
        }
    }

    #[test]
    fn genre_is_normalised() {
        assert_eq!(Genre::new("  non-fiction ").unwrap().as_str(), "NON-FICTION");
        assert!(Genre::new("   ").is_err());
        assert!(Genre::new("sci fi").is_err());
    }

    #[test]
    fn book_rejects_blank_fields() {
        let genres = BTreeSet::new();
        assert_eq!(
            Book::new(serial(1), "  ", "A", genres.clone()),
            Err(CatalogError::BlankField("title"))
        );
        assert_eq!(
            Book::new(serial(1), "T", "", genres),
            Err(CatalogError::BlankField("author"))
        );
    }

    #[test]
    fn book_display_lists_genres() {
        let book = Book::new(
            serial(3),
            "Behaves",
            "Robert Sapoloksy",
            genre_set(["psychology", "non-fiction"]).unwrap(),
        )
        .unwrap();
        assert_eq!(
            book.to_string(),
            "Behaves (B00003) by Robert Sapoloksy [NON-FICTION, PSYCHOLOGY]"
        );
    }

    #[test]
    fn add_rejects_duplicate_serial() {
        let mut catalog = Catalog::new();
        catalog.add_book(book(1, "One")).unwrap();

        assert_eq!(
            catalog.add_book(book(1, "Other")),
            Err(CatalogError::DuplicateBook(serial(1)))
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn remove_and_reinsert_keeps_order() {
        let mut catalog = Catalog::new();
        for (n, title) in [(1, "One"), (2, "Two"), (3, "Three")] {
            catalog.add_book(book(n, title)).unwrap();
        }
        let original = catalog.clone();

        let (idx, removed) = catalog.remove_book(serial(2)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(removed.title, "Two");

        catalog.insert_book(idx, removed).unwrap();
        assert_eq!(catalog, original);
    }

    #[test]
    fn remove_missing_book_fails() {
        let mut catalog = Catalog::new();
        assert_eq!(
            catalog.remove_book(serial(9)),
            Err(CatalogError::BookNotFound(serial(9)))
        );
    }

    #[test]
    fn replace_keeps_position() {
        let mut catalog = Catalog::new();
        catalog.add_book(book(1, "One")).unwrap();
        catalog.add_book(book(2, "Two")).unwrap();

        let old = catalog.replace_book(serial(1), book(1, "Uno")).unwrap();

        assert_eq!(old.title, "One");
        assert_eq!(catalog.books()[0].title, "Uno");
        assert_eq!(
            catalog.replace_book(serial(1), book(2, "Clash")),
            Err(CatalogError::DuplicateBook(serial(2)))
        );
    }

    #[test]
    fn next_serial_follows_highest() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.next_serial().unwrap(), SerialNumber::FIRST);

        catalog.add_book(book(5, "Five")).unwrap();
        catalog.add_book(book(2, "Two")).unwrap();
        assert_eq!(catalog.next_serial().unwrap(), serial(6));
    }

    #[test]
    fn find_matches_title_and_author() {
        let mut catalog = Catalog::new();
        catalog.add_book(book(1, "Harry Botter")).unwrap();
        catalog.add_book(book(2, "Animal the Farm")).unwrap();

        let titles: Vec<&str> = catalog
            .find("botter")
            .into_iter()
            .map(|b| b.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Harry Botter"]);

        assert_eq!(catalog.find("some author").len(), 2);
        assert!(catalog.find("zzzz").is_empty());
    }
}
