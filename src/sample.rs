use log::warn;

use crate::catalog::{Book, Catalog, SerialNumber, genre_set};
use crate::library::Library;
use crate::loan::LoanRecords;

const SAMPLE_BOOKS: &[(&str, &str, &[&str])] = &[
    ("Harry Botter", "J K Rowling", &["fiction"]),
    ("Legend of the Condor Heroes", "Jin Yong", &["fiction", "history"]),
    ("Animal the Farm", "George Orwell", &["fiction"]),
    (
        "Harry Botter and the Full Blood Prince",
        "J K Rowling",
        &["fiction", "action"],
    ),
    ("Man's Search for Munning", "Viktor Frankel", &["non-fiction", "biography"]),
    ("Stefe Jobz", "Walter Izakson", &["non-fiction", "biography"]),
    (
        "Behaves",
        "Robert Sapoloksy",
        &["non-fiction", "popular-science", "psychology"],
    ),
    (
        "A Brief History of Space",
        "Stephen Birding",
        &["non-fiction", "popular-science"],
    ),
    (
        "Painting with Bobby Ross",
        "Bobby Ross",
        &["non-fiction", "art", "how-to"],
    ),
];

/// Sample books with serial numbers assigned from `B00001`.
pub fn sample_books() -> Vec<Book> {
    let mut books = Vec::with_capacity(SAMPLE_BOOKS.len());
    let mut serial = Some(SerialNumber::FIRST);

    for &(title, author, genres) in SAMPLE_BOOKS {
        let Some(current) = serial else { break };
        match genre_set(genres.iter().copied())
            .and_then(|genres| Book::new(current, title, author, genres))
        {
            Ok(book) => books.push(book),
            Err(e) => warn!("Skipping sample book '{}': {}", title, e),
        }
        serial = current.next().ok();
    }

    books
}

pub fn sample_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for book in sample_books() {
        if let Err(e) = catalog.add_book(book) {
            warn!("Skipping sample book: {}", e);
        }
    }
    catalog
}

/// The sample catalog with nothing lent out.
pub fn sample_library() -> Library {
    Library::new(sample_catalog(), LoanRecords::new())
}
