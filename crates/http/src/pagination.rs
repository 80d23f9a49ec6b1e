//! Offset/limit pagination: query resolution, metadata and navigation links.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Page size used when the client sends none, zero or a negative limit
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may ask for
pub const MAX_LIMIT: i64 = 100;

/// Raw `?offset=&limit=` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationQuery {
    /// Apply the defaulting policy: a non-positive limit becomes [`DEFAULT_LIMIT`],
    /// a negative offset becomes 0 and a limit above [`MAX_LIMIT`] is rejected.
    pub fn resolve(&self) -> Result<PageRequest, AppError> {
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_LIMIT,
        };

        if limit > MAX_LIMIT {
            return Err(AppError::bad_request(format!("Maximum limit is {MAX_LIMIT}")));
        }

        Ok(PageRequest {
            offset: self.offset.unwrap_or(0).max(0),
            limit,
        })
    }
}

/// A validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub first: String,
    pub last: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl PaginationLinks {
    /// Links relative to `base_path`, e.g. `/api/v1/books?offset=10&limit=10`.
    pub fn build(base_path: &str, meta: &PaginationMeta) -> Self {
        let PaginationMeta {
            offset,
            limit,
            total,
        } = *meta;
        let link = |offset: i64| format!("{base_path}?offset={offset}&limit={limit}");

        Self {
            self_link: link(offset),
            first: link(0),
            last: link(total.checked_div(limit).unwrap_or(0) * limit),
            next: offset
                .checked_add(limit)
                .filter(|end| *end < total)
                .map(&link),
            prev: (offset > 0).then(|| link((offset - limit).max(0))),
        }
    }
}

/// List envelope: `{"data": [...], "meta": {...}, "links": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
    pub links: PaginationLinks,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: PageRequest, total: i64, base_path: &str) -> Self {
        let meta = PaginationMeta {
            offset: page.offset,
            limit: page.limit,
            total,
        };
        let links = PaginationLinks::build(base_path, &meta);

        Self { data, meta, links }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
