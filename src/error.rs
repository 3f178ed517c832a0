//! Handler error type and its JSON rendering.
//!
//! Store failures are logged with their cause and answered with a generic
//! localized message. The cause is only attached to the envelope when the
//! process was started outside production.

use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use once_cell::sync::OnceCell;

use crate::models::NullColumn;
use crate::store::StoreError;
use crate::types::ApiResponse;

pub type ApiResult<T> = Result<T, ApiError>;

static EXPOSE_DETAIL: OnceCell<bool> = OnceCell::new();

/// Set once at startup; later calls are ignored.
pub fn expose_error_detail(expose: bool) {
    let _ = EXPOSE_DETAIL.set(expose);
}

fn detail_exposed() -> bool {
    EXPOSE_DETAIL.get().copied().unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: StoreError,
    },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn detail(&self) -> Option<String> {
        match self {
            ApiError::Upstream { source, .. } => Some(source.to_string()),
            ApiError::Internal(message) => Some(message.clone()),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Upstream { message, source } => {
                tracing::error!(error = %source, "{message}");
            }
            ApiError::Internal(message) => tracing::error!("{message}"),
            _ => {}
        }

        let mut body = match self {
            ApiError::Internal(_) => ApiResponse::failure("Internal server error"),
            other => ApiResponse::failure(other.to_string()),
        };
        if detail_exposed() {
            body.error = self.detail();
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<NullColumn> for ApiError {
    fn from(NullColumn(column): NullColumn) -> Self {
        ApiError::BadRequest(format!("Kolom {column} tidak boleh kosong"))
    }
}

/// Attaches the client-facing message to a store failure.
pub trait OrUpstream<T> {
    fn or_upstream(self, message: &str) -> ApiResult<T>;
}

impl<T> OrUpstream<T> for Result<T, StoreError> {
    fn or_upstream(self, message: &str) -> ApiResult<T> {
        self.map_err(|source| ApiError::Upstream {
            message: message.to_string(),
            source,
        })
    }
}

/// Malformed or oversized JSON bodies become a 400 envelope.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected request body");
    let message = match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "Ukuran data terlalu besar"
        }
        JsonPayloadError::ContentType => "Content-Type harus application/json",
        _ => "Format JSON tidak valid",
    };
    ApiError::bad_request(message).into()
}
