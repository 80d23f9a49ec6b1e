pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

#[cfg(test)]
mod testing;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::Router;
use bookstock_kernel::{settings::DatabaseSettings, InitCtx, Migration, Module};
use serde_json::json;
use sqlx::PgPool;

use repository::PgBookRepository;
use service::BookService;

/// Book inventory: CRUD over the `book` table.
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ctx.settings.environment.as_str(),
            statement_timeout_ms = ctx.settings.database.statement_timeout_ms,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_book",
            up: r#"
                CREATE TABLE IF NOT EXISTS book (
                    book_id      UUID PRIMARY KEY,
                    isbn         VARCHAR(17) NOT NULL UNIQUE,
                    title        TEXT NOT NULL,
                    author       TEXT NOT NULL,
                    publisher    TEXT NOT NULL,
                    published_at DATE NOT NULL,
                    stock        BIGINT NOT NULL CHECK (stock >= 0),
                    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
                );
                "#,
            down: "DROP TABLE IF EXISTS book;",
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module backed by PostgreSQL
pub fn create_module(pool: PgPool, settings: &DatabaseSettings) -> Arc<dyn Module> {
    let repository = PgBookRepository::new(
        pool,
        Duration::from_millis(settings.statement_timeout_ms),
    );
    Arc::new(BooksModule::new(BookService::new(Arc::new(repository))))
}

fn error_responses(codes: &[(&str, &str)]) -> serde_json::Value {
    let mut responses = serde_json::Map::new();
    for (code, description) in codes {
        responses.insert(
            (*code).to_string(),
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            }),
        );
    }
    serde_json::Value::Object(responses)
}

fn with_success(mut responses: serde_json::Value, code: &str, body: serde_json::Value) -> serde_json::Value {
    responses[code] = body;
    responses
}

fn book_data() -> serde_json::Value {
    json!({
        "description": "Book",
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": { "data": { "$ref": "#/components/schemas/Book" } },
                    "required": ["data"]
                }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_id_param = json!({
        "name": "book_id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });

    json!({
        "paths": {
            "/": {
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": with_success(
                        error_responses(&[("400", "Invalid request payload"), ("500", "Internal server error")]),
                        "201",
                        book_data(),
                    )
                },
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "offset", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 0, "default": 0 } },
                        { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 } }
                    ],
                    "responses": with_success(
                        error_responses(&[("400", "Invalid query parameters"), ("500", "Internal server error")]),
                        "200",
                        json!({
                            "description": "One page of books",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookPage" }
                                }
                            }
                        }),
                    )
                },
                "patch": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": with_success(
                        error_responses(&[
                            ("400", "Invalid request payload"),
                            ("404", "Book not found"),
                            ("500", "Internal server error"),
                        ]),
                        "200",
                        book_data(),
                    )
                }
            },
            "/{book_id}": {
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "parameters": [book_id_param.clone()],
                    "responses": with_success(
                        error_responses(&[
                            ("400", "Invalid book ID"),
                            ("404", "Book not found"),
                            ("500", "Internal server error"),
                        ]),
                        "200",
                        book_data(),
                    )
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [book_id_param],
                    "responses": with_success(
                        error_responses(&[
                            ("400", "Invalid book ID"),
                            ("404", "Book not found"),
                            ("500", "Internal server error"),
                        ]),
                        "204",
                        json!({ "description": "Deleted" }),
                    )
                }
            },
            "/isbn/{isbn}": {
                "get": {
                    "summary": "Get a book by ISBN",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "isbn",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "responses": with_success(
                        error_responses(&[
                            ("400", "Invalid ISBN format"),
                            ("404", "Book not found"),
                            ("500", "Internal server error"),
                        ]),
                        "200",
                        book_data(),
                    )
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "book_id": { "type": "string", "format": "uuid" },
                        "isbn": { "type": "string" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "publisher": { "type": "string" },
                        "published_at": { "type": "string", "format": "date" },
                        "stock": { "type": "integer", "minimum": 0 },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "book_id", "isbn", "title", "author", "publisher",
                        "published_at", "stock", "created_at", "updated_at"
                    ]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "isbn": { "type": "string", "description": "ISBN-10 or ISBN-13" },
                        "title": { "type": "string", "minLength": 1 },
                        "author": { "type": "string", "minLength": 1 },
                        "publisher": { "type": "string", "minLength": 1 },
                        "published_at": { "type": "string", "format": "date" },
                        "stock": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["isbn", "title", "author", "publisher", "published_at", "stock"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "book_id": { "type": "string", "format": "uuid" },
                        "isbn": { "type": "string" },
                        "title": { "type": "string", "minLength": 1 },
                        "author": { "type": "string", "minLength": 1 },
                        "publisher": { "type": "string", "minLength": 1 },
                        "published_at": { "type": "string", "format": "date", "description": "0001-01-01 leaves the date unchanged" },
                        "stock": { "type": "integer", "minimum": -1, "description": "-1 leaves stock unchanged" }
                    },
                    "required": ["book_id"]
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "data": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                        "meta": {
                            "type": "object",
                            "properties": {
                                "offset": { "type": "integer" },
                                "limit": { "type": "integer" },
                                "total": { "type": "integer" }
                            }
                        },
                        "links": {
                            "type": "object",
                            "properties": {
                                "self": { "type": "string" },
                                "first": { "type": "string" },
                                "last": { "type": "string" },
                                "next": { "type": "string" },
                                "prev": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}
