//! Business rules for books: validation, identifiers and error mapping.

use std::sync::Arc;

use bookstock_http::{AppError, PageRequest};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::{
    models::{BookChanges, BookPage, BookResponse, CreateBookRequest, NewBook, UpdateBookRequest},
    repository::{BookRepository, RepositoryError},
};
use crate::utils::isbn::{canonical_isbn, is_valid_isbn, validate_isbn};

const NOT_FOUND: &str = "Book not found";

#[derive(Clone)]
pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self, request), fields(isbn = %request.isbn))]
    pub async fn create(&self, request: CreateBookRequest) -> Result<BookResponse, AppError> {
        request.validate()?;

        let book = NewBook::from_request(Uuid::now_v7(), request);
        let stored = self
            .repository
            .insert(&book)
            .await
            .map_err(|e| storage_error(e, "Failed to create book"))?;

        tracing::info!(book_id = %stored.book_id, "book created");
        Ok(stored.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, book_id: &str) -> Result<BookResponse, AppError> {
        let book_id = parse_book_id(book_id)?;

        let book = self
            .repository
            .find_by_id(book_id)
            .await
            .map_err(|e| storage_error(e, "Failed to get book"))?;

        Ok(book.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_isbn(&self, isbn: &str) -> Result<BookResponse, AppError> {
        if !is_valid_isbn(isbn) {
            return Err(AppError::bad_request("Invalid ISBN format"));
        }

        let book = self
            .repository
            .find_by_isbn(&canonical_isbn(isbn))
            .await
            .map_err(|e| storage_error(e, "Failed to get book"))?;

        Ok(book.into())
    }

    #[tracing::instrument(skip(self), fields(offset = page.offset, limit = page.limit))]
    pub async fn get_many(&self, page: PageRequest) -> Result<BookPage, AppError> {
        if page.limit <= 0 {
            return Err(AppError::bad_request("Limit must be greater than 0"));
        }

        let books = self
            .repository
            .find_page(page.offset, page.limit)
            .await
            .map_err(|e| storage_error(e, "Failed to get books"))?;

        let total = self
            .repository
            .count()
            .await
            .map_err(|e| storage_error(e, "Failed to get total count"))?;

        Ok(BookPage {
            books: books.into_iter().map(BookResponse::from).collect(),
            total,
        })
    }

    /// Partial update; unset fields keep their stored values.
    #[tracing::instrument(skip(self, request), fields(book_id = %request.book_id))]
    pub async fn update(&self, request: UpdateBookRequest) -> Result<BookResponse, AppError> {
        let request = request.normalized();

        if request.book_id.is_nil() {
            return Err(AppError::bad_request("Invalid book ID"));
        }

        let mut errors = request.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(isbn) = &request.isbn {
            if let Err(error) = validate_isbn(isbn) {
                errors.add("isbn", error);
            }
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let book_id = request.book_id;
        let changes = BookChanges::from(request);
        let book = self
            .repository
            .update(book_id, &changes)
            .await
            .map_err(|e| storage_error(e, "Failed to update book"))?;

        tracing::info!("book updated");
        Ok(book.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, book_id: &str) -> Result<(), AppError> {
        let book_id = parse_book_id(book_id)?;

        self.repository
            .delete(book_id)
            .await
            .map_err(|e| storage_error(e, "Failed to delete book"))?;

        tracing::info!("book deleted");
        Ok(())
    }
}

fn parse_book_id(raw: &str) -> Result<Uuid, AppError> {
    match raw.trim().parse::<Uuid>() {
        Ok(book_id) if !book_id.is_nil() => Ok(book_id),
        _ => Err(AppError::bad_request("Invalid book ID")),
    }
}

/// `NotFound` keeps its meaning; everything else becomes `failure` with the cause kept for the log.
fn storage_error(error: RepositoryError, failure: &'static str) -> AppError {
    match error {
        RepositoryError::NotFound => AppError::not_found(NOT_FOUND),
        other => AppError::internal(failure, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::testing::InMemoryBookRepository;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn service() -> (BookService, Arc<InMemoryBookRepository>) {
        let repository = Arc::new(InMemoryBookRepository::default());
        (BookService::new(repository.clone()), repository)
    }

    fn hujan() -> CreateBookRequest {
        CreateBookRequest {
            isbn: "9783161484100".to_string(),
            title: "Hujan".to_string(),
            author: "Tere Liye".to_string(),
            publisher: "Gramedia".to_string(),
            published_at: NaiveDate::from_ymd_opt(2016, 1, 28).unwrap(),
            stock: 200,
        }
    }

    fn numbered(n: u32) -> CreateBookRequest {
        // ISBN-13 with a computed check digit
        let stem = format!("978000000{n:03}");
        let sum: u32 = stem
            .bytes()
            .enumerate()
            .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
            .sum();
        CreateBookRequest {
            isbn: format!("{stem}{}", (10 - sum % 10) % 10),
            title: format!("Volume {n}"),
            ..hujan()
        }
    }

    #[tokio::test]
    async fn create_assigns_distinct_time_ordered_ids() {
        let (service, _) = service();

        let first = service.create(numbered(1)).await.unwrap();
        let second = service.create(numbered(2)).await.unwrap();

        assert_ne!(first.book_id, second.book_id);
        assert_eq!(first.book_id.get_version_num(), 7);
        assert!(first.book_id < second.book_id);
    }

    #[tokio::test]
    async fn created_book_round_trips() {
        let (service, _) = service();
        let created = service.create(hujan()).await.unwrap();

        let fetched = service.get_by_id(&created.book_id.to_string()).await.unwrap();
        assert_eq!(fetched, created);

        let by_isbn = service.get_by_isbn("9783161484100").await.unwrap();
        assert_eq!(by_isbn.title, "Hujan");
        assert_eq!(by_isbn.stock, 200);
    }

    #[tokio::test]
    async fn isbn_spellings_resolve_to_one_book() {
        let (service, _) = service();
        let created = service
            .create(CreateBookRequest {
                isbn: "9-7-8-3-1-6-1-4-8-4-1-0-0".to_string(),
                ..hujan()
            })
            .await
            .unwrap();
        assert_eq!(created.isbn, "9783161484100");

        let fetched = service.get_by_isbn("978-3-16-148410-0").await.unwrap();
        assert_eq!(fetched.book_id, created.book_id);

        let error = service.create(hujan()).await.unwrap_err();
        assert_eq!(error.message(), "Failed to create book");
    }

    #[tokio::test]
    async fn create_rejects_invalid_payload() {
        let (service, repository) = service();
        let request = CreateBookRequest {
            isbn: "9783161484101".to_string(),
            ..hujan()
        };

        let error = service.create(request).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "Invalid request payload");
        assert_eq!(repository.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lookups_validate_their_keys() {
        let (service, _) = service();

        let error = service.get_by_id("not-a-uuid").await.unwrap_err();
        assert_eq!(error.message(), "Invalid book ID");

        let error = service.get_by_id("").await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let error = service.get_by_isbn("12345").await.unwrap_err();
        assert_eq!(error.message(), "Invalid ISBN format");

        let error = service
            .get_by_id(&Uuid::now_v7().to_string())
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.message(), "Book not found");
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_cover_the_collection() {
        let (service, _) = service();
        for n in 0..25 {
            service.create(numbered(n)).await.unwrap();
        }

        let first = service.get_many(PageRequest { offset: 0, limit: 10 }).await.unwrap();
        let second = service.get_many(PageRequest { offset: 10, limit: 10 }).await.unwrap();
        let all = service.get_many(PageRequest { offset: 0, limit: 25 }).await.unwrap();

        assert_eq!(first.total, 25);
        assert_eq!(first.books.len(), 10);
        assert!(first
            .books
            .iter()
            .all(|book| !second.books.iter().any(|other| other.book_id == book.book_id)));

        let union: Vec<Uuid> = first
            .books
            .iter()
            .chain(second.books.iter())
            .map(|book| book.book_id)
            .collect();
        let expected: Vec<Uuid> = all.books.iter().take(20).map(|book| book.book_id).collect();
        assert_eq!(union, expected);

        let past_end = service.get_many(PageRequest { offset: 40, limit: 10 }).await.unwrap();
        assert!(past_end.books.is_empty());
        assert_eq!(past_end.total, 25);
    }

    #[tokio::test]
    async fn non_positive_limit_is_rejected() {
        let (service, _) = service();
        let error = service
            .get_many(PageRequest { offset: 0, limit: 0 })
            .await
            .unwrap_err();
        assert_eq!(error.message(), "Limit must be greater than 0");
    }

    #[tokio::test]
    async fn stock_only_update_keeps_other_fields() {
        let (service, _) = service();
        let created = service.create(hujan()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = service
            .update(UpdateBookRequest {
                book_id: created.book_id,
                stock: Some(150),
                ..UpdateBookRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.stock, 150);
        assert_eq!(updated.isbn, created.isbn);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.publisher, created.publisher);
        assert_eq!(updated.published_at, created.published_at);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn legacy_stock_marker_leaves_stock_alone() {
        let (service, _) = service();
        let created = service.create(hujan()).await.unwrap();

        let updated = service
            .update(UpdateBookRequest {
                book_id: created.book_id,
                title: Some("Hujan (Edisi Baru)".to_string()),
                stock: Some(-1),
                ..UpdateBookRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.stock, 200);
        assert_eq!(updated.title, "Hujan (Edisi Baru)");
    }

    #[tokio::test]
    async fn update_validates_provided_fields() {
        let (service, _) = service();
        let created = service.create(hujan()).await.unwrap();

        let error = service
            .update(UpdateBookRequest {
                book_id: created.book_id,
                isbn: Some("9783161484101".to_string()),
                stock: Some(-7),
                ..UpdateBookRequest::default()
            })
            .await
            .unwrap_err();

        match error {
            AppError::Validation { details, .. } => {
                let fields: Vec<&str> = details
                    .iter()
                    .filter_map(|detail| detail["field"].as_str())
                    .collect();
                assert_eq!(fields, vec!["isbn", "stock"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let error = service
            .update(UpdateBookRequest::default())
            .await
            .unwrap_err();
        assert_eq!(error.message(), "Invalid book ID");
    }

    #[tokio::test]
    async fn update_of_unknown_book_is_not_found() {
        let (service, _) = service();
        let error = service
            .update(UpdateBookRequest {
                book_id: Uuid::now_v7(),
                stock: Some(1),
                ..UpdateBookRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let (service, _) = service();
        let created = service.create(hujan()).await.unwrap();
        let book_id = created.book_id.to_string();

        service.delete(&book_id).await.unwrap();
        let error = service.delete(&book_id).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn storage_failures_become_generic_messages() {
        let (service, repository) = service();
        repository.fail_queries();

        let error = service.create(hujan()).await.unwrap_err();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), "Failed to create book");

        let error = service
            .get_many(PageRequest { offset: 0, limit: 10 })
            .await
            .unwrap_err();
        assert_eq!(error.message(), "Failed to get books");

        let error = service
            .delete(&Uuid::now_v7().to_string())
            .await
            .unwrap_err();
        assert_eq!(error.message(), "Failed to delete book");
    }
}
