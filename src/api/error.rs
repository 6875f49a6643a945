use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::LedgerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Body that is not JSON or does not fit the request type, such as a
    /// negative share count.
    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::InvalidArgument(_) | LedgerError::UsernameTaken(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    LedgerError::InsufficientFunds { .. }
                    | LedgerError::InsufficientShares { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    LedgerError::NoSuchHolding { .. } | LedgerError::UnknownUser(_) => {
                        StatusCode::NOT_FOUND
                    }
                    LedgerError::TransactionConflict(_) => StatusCode::CONFLICT,
                    LedgerError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind())
            }
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        // Storage details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: message, kind })).into_response()
    }
}
