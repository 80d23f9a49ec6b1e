//! Error handling for the HTTP layer

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

/// Uniform error envelope returned for every failed request.
///
/// Also stored as a response extension so [`attach_error_path`] can fill in `path`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Numeric HTTP status
    pub code: u16,
    /// Status reason phrase, e.g. `Not Found`
    pub error: String,
    /// Machine readable error kind, e.g. `not_found`
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        message: String,
    },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("timeout: {message}")]
    Timeout { message: String },

    /// `message` is what the caller sees; `cause` is only ever logged.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        cause: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Collapse a failure into a generic message while keeping its cause chain for the log.
    pub fn internal(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::BadRequest { .. } => "bad_request",
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Message safe to show to the caller
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::BadRequest { message }
            | Self::NotFound { message }
            | Self::Timeout { message }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(cause: anyhow::Error) -> Self {
        Self::internal("An internal server error occurred", cause)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<(String, serde_json::Value)> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter()
                    .map(move |e| {
                        (
                            field.clone(),
                            json!({ "field": field.clone(), "error": e.code.to_string() }),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        details.sort_by(|a, b| a.0.cmp(&b.0));

        Self::validation(
            details.into_iter().map(|(_, detail)| detail).collect(),
            "Invalid request payload",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::now_v7();
        let status = self.status();
        let kind = self.kind();

        if let AppError::Internal { message, cause } = &self {
            tracing::error!(
                trace_id = %trace_id,
                error_kind = kind,
                status_code = status.as_u16(),
                cause = %format!("{cause:#}"),
                "{message}"
            );
        } else {
            tracing::warn!(
                trace_id = %trace_id,
                error_kind = kind,
                status_code = status.as_u16(),
                message = self.message(),
                "request rejected"
            );
        }

        let message = self.message().to_string();
        let details = match self {
            AppError::Validation { details, .. } => details,
            _ => Vec::new(),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            kind: kind.to_string(),
            message,
            details,
            path: None,
            trace_id: trace_id.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let mut response = (status, Json(&body)).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Middleware that stamps the request path into error envelopes produced downstream.
///
/// A bare `408` from the timeout layer is replaced by a full envelope first.
pub async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status() == StatusCode::REQUEST_TIMEOUT
        && response.extensions().get::<ErrorBody>().is_none()
    {
        response = AppError::timeout("Request timed out").into_response();
    }

    let Some(mut body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    body.path = Some(path);

    let Ok(bytes) = serde_json::to_vec(&body) else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.extensions.insert(body);
    Response::from_parts(parts, Body::from(bytes))
}
