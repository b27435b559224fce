use crate::model::ErrorResponse;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lynx_core::DecodeError;
use lynx_shortener::ShortenerError;
use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, AppError>;

pub const PAGE_NOT_FOUND: &str = "page not found";
pub const EXPIRED: &str = "expire: date is expired.";
pub const INTERNAL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad json: {0}")]
    BadJson(String),
    #[error("content-type must be \"application/json\"")]
    NotJson,
    #[error("{0}")]
    Validation(String),
    #[error("page not found")]
    NotFound,
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => AppError::NotJson,
            other => AppError::BadJson(other.body_text()),
        }
    }
}

/// A code that does not decode cannot name a link.
impl From<DecodeError> for AppError {
    fn from(_: DecodeError) -> Self {
        AppError::NotFound
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadJson(detail) => {
                debug!(%detail, "rejected request body");
                (StatusCode::BAD_REQUEST, "bad json".to_string())
            }
            err @ AppError::NotJson => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound | AppError::Shortener(ShortenerError::NotFound) => {
                (StatusCode::NOT_FOUND, PAGE_NOT_FOUND.to_string())
            }
            AppError::Shortener(ShortenerError::Expired(_)) => {
                (StatusCode::BAD_REQUEST, EXPIRED.to_string())
            }
            AppError::Shortener(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
