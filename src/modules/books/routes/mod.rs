//! HTTP handlers for `/books`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bookstock_http::{AppError, DataResponse, Paginated, PaginationQuery};

use super::{
    models::{CreateBookRequest, UpdateBookRequest},
    service::BookService,
};

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book).patch(update_book))
        .route("/{book_id}", get(get_book).delete(delete_book))
        .route("/isbn/{isbn}", get(get_book_by_isbn))
        .with_state(service)
}

async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(invalid_payload)?;
    let book = service.create(request).await?;
    Ok(DataResponse::new(book).with_status(StatusCode::CREATED))
}

async fn get_book(
    State(service): State<BookService>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let book = service.get_by_id(&book_id).await?;
    Ok(DataResponse::new(book))
}

async fn get_book_by_isbn(
    State(service): State<BookService>,
    Path(isbn): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let book = service.get_by_isbn(&isbn).await?;
    Ok(DataResponse::new(book))
}

async fn list_books(
    State(service): State<BookService>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected query string");
        AppError::bad_request("Invalid query parameters")
    })?;
    let page = query.resolve()?;

    let result = service.get_many(page).await?;
    Ok(Paginated::new(result.books, page, result.total, uri.path()))
}

async fn update_book(
    State(service): State<BookService>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(invalid_payload)?;
    let book = service.update(request).await?;
    Ok(DataResponse::new(book))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn invalid_payload(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    AppError::bad_request("Invalid request payload")
}
