use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Error;

/// One entry in the error envelope. Every failure body is
/// `{"errors": [{status, code, title, detail}, ...]}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: &'static str,
    pub title: String,
    pub detail: String,
}

impl ErrorBody {
    #[must_use]
    pub fn not_found(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: 404,
            code: "not-found",
            title: title.into(),
            detail: detail.into(),
        }
    }
}

/// API error that converts to a proper HTTP response.
pub struct ApiError {
    pub status: StatusCode,
    pub errors: Vec<ErrorBody>,
}

impl ApiError {
    fn single(status: StatusCode, code: &'static str, title: String, detail: String) -> Self {
        Self {
            status,
            errors: vec![ErrorBody {
                status: status.as_u16(),
                code,
                title,
                detail,
            }],
        }
    }

    #[must_use]
    pub fn not_found(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::single(
            StatusCode::NOT_FOUND,
            "not-found",
            title.into(),
            detail.into(),
        )
    }

    #[must_use]
    pub fn already_exists(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::single(
            StatusCode::BAD_REQUEST,
            "already-exists",
            title.into(),
            detail.into(),
        )
    }

    #[must_use]
    pub fn invalid_argument(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::single(
            StatusCode::BAD_REQUEST,
            "invalid-argument",
            title.into(),
            detail.into(),
        )
    }

    #[must_use]
    pub fn file_missing(detail: impl Into<String>) -> Self {
        Self::single(
            StatusCode::BAD_REQUEST,
            "file-missing",
            "Missing File Argument".to_string(),
            detail.into(),
        )
    }

    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::single(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage-error",
            "Storage Error".to_string(),
            detail.into(),
        )
    }

    /// Several failures reported together, e.g. every unresolved package
    /// path in a membership update.
    #[must_use]
    pub fn many(status: StatusCode, errors: Vec<ErrorBody>) -> Self {
        Self { status, errors }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => {
                Self::not_found("Not Found", "The requested resource does not exist.")
            }
            Error::AlreadyExists => {
                Self::already_exists("Already Exists", "The resource already exists.")
            }
            Error::InvalidArgument(detail) => Self::invalid_argument("Invalid Argument", detail),
            Error::ReadOnly(field) => Self::invalid_argument(
                "Read-Only Field",
                format!("'{field}' can only be written once."),
            ),
            Error::Storage(detail) => {
                tracing::error!("storage failure: {detail}");
                Self::internal("The storage backend rejected the operation.")
            }
            other => {
                tracing::error!("internal failure: {other}");
                Self::internal("An internal error occurred.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "errors": self.errors });
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
