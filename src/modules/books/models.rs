use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::isbn::{canonical_isbn, validate_isbn};

/// Stock value older clients send in an update to mean "leave stock as it is".
pub const STOCK_UNCHANGED: i64 = -1;

/// A row of the `book` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Time-ordered identifier assigned on creation
    pub book_id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_at: NaiveDate,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[validate(length(min = 1))]
    pub publisher: String,
    pub published_at: NaiveDate,
    #[validate(range(min = 0))]
    pub stock: i64,
}

/// Fully populated insert; timestamps come from column defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub book_id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_at: NaiveDate,
    pub stock: i64,
}

impl NewBook {
    pub fn from_request(book_id: Uuid, request: CreateBookRequest) -> Self {
        Self {
            book_id,
            isbn: canonical_isbn(&request.isbn),
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            published_at: request.published_at,
            stock: request.stock,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBookRequest {
    pub book_id: Uuid,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub author: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_at: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
}

/// `0001-01-01`, the publication date older clients send to mean "leave it as it is".
fn is_unchanged_date_marker(date: NaiveDate) -> bool {
    date.year() == 1 && date.ordinal() == 1
}

impl UpdateBookRequest {
    /// Fold the legacy `stock: -1` and `published_at: 0001-01-01` markers into `None`.
    pub fn normalized(mut self) -> Self {
        if self.stock == Some(STOCK_UNCHANGED) {
            self.stock = None;
        }
        if self.published_at.is_some_and(is_unchanged_date_marker) {
            self.published_at = None;
        }
        self
    }
}

/// Column values handed to the data-access layer for an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub stock: Option<i64>,
}

impl From<UpdateBookRequest> for BookChanges {
    fn from(request: UpdateBookRequest) -> Self {
        Self {
            isbn: request.isbn.as_deref().map(canonical_isbn),
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            published_at: request.published_at,
            stock: request.stock,
        }
    }
}

/// Response projection of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookResponse {
    pub book_id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_at: NaiveDate,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.book_id,
            isbn: book.isbn,
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            published_at: book.published_at,
            stock: book.stock,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// One page of books plus the size of the whole collection
#[derive(Debug, Clone)]
pub struct BookPage {
    pub books: Vec<BookResponse>,
    pub total: i64,
}
