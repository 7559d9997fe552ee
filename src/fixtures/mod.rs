//! Seed data for the `books` collection.
//!
//! The collection itself is schema-less; [`Book`] only exists to build
//! well-formed fixtures. Loaded files are kept as raw documents.

mod generate;
mod load;
mod sample;

pub use generate::generate_books;
pub use load::{FixtureFormat, detect_format, load_books, load_books_from_reader};
pub use sample::sample_books;

use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::utils::json::json_value_to_bson_document;
use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
}

impl Book {
    /// # Errors
    /// Returns an error if the book cannot be represented as BSON.
    pub fn to_document(&self) -> Result<BsonDocument, DbError> {
        json_value_to_bson_document(&serde_json::to_value(self)?)
    }
}

/// Converts books into documents ready for insertion.
///
/// # Errors
/// Returns the first conversion error.
pub fn books_to_documents(books: &[Book]) -> Result<Vec<BsonDocument>, DbError> {
    books.iter().map(Book::to_document).collect()
}

/// Inserts `docs` in order and returns how many were inserted.
pub fn seed_collection<I>(col: &Collection, docs: I) -> usize
where
    I: IntoIterator<Item = BsonDocument>,
{
    let ids = col.insert_many(docs.into_iter().map(Document::new));
    log::info!("seeded {} documents into {}", ids.len(), col.name_str());
    ids.len()
}
