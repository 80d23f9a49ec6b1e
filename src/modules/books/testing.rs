//! In-memory [`BookRepository`] for tests that should not need PostgreSQL.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    models::{Book, BookChanges, NewBook},
    repository::{BookRepository, RepositoryError},
};

#[derive(Default)]
pub struct InMemoryBookRepository {
    books: Mutex<Vec<Book>>,
    failing: AtomicBool,
}

impl InMemoryBookRepository {
    /// Make every following call fail the way a dropped connection would.
    pub fn fail_queries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn duplicate_isbn() -> RepositoryError {
        RepositoryError::Query(sqlx::Error::Protocol(
            "duplicate key value violates unique constraint \"book_isbn_key\"".to_string(),
        ))
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn insert(&self, book: &NewBook) -> Result<Book, RepositoryError> {
        self.check()?;
        let mut books = self.books.lock().unwrap();
        if books.iter().any(|stored| stored.isbn == book.isbn) {
            return Err(Self::duplicate_isbn());
        }

        let now = Utc::now();
        let stored = Book {
            book_id: book.book_id,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            published_at: book.published_at,
            stock: book.stock,
            created_at: now,
            updated_at: now,
        };
        books.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, book_id: Uuid) -> Result<Book, RepositoryError> {
        self.check()?;
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|book| book.book_id == book_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Book, RepositoryError> {
        self.check()?;
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|book| book.isbn == isbn)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<Book>, RepositoryError> {
        self.check()?;
        let mut books = self.books.lock().unwrap().clone();
        books.sort_by_key(|book| book.book_id);
        Ok(books
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        self.check()?;
        Ok(self.books.lock().unwrap().len() as i64)
    }

    async fn update(&self, book_id: Uuid, changes: &BookChanges) -> Result<Book, RepositoryError> {
        self.check()?;
        let mut books = self.books.lock().unwrap();
        if let Some(isbn) = &changes.isbn {
            if books
                .iter()
                .any(|stored| stored.isbn == *isbn && stored.book_id != book_id)
            {
                return Err(Self::duplicate_isbn());
            }
        }

        let book = books
            .iter_mut()
            .find(|book| book.book_id == book_id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(isbn) = &changes.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(title) = &changes.title {
            book.title = title.clone();
        }
        if let Some(author) = &changes.author {
            book.author = author.clone();
        }
        if let Some(publisher) = &changes.publisher {
            book.publisher = publisher.clone();
        }
        if let Some(published_at) = changes.published_at {
            book.published_at = published_at;
        }
        if let Some(stock) = changes.stock {
            book.stock = stock;
        }
        book.updated_at = Utc::now();

        Ok(book.clone())
    }

    async fn delete(&self, book_id: Uuid) -> Result<(), RepositoryError> {
        self.check()?;
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|book| book.book_id != book_id);
        if books.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
