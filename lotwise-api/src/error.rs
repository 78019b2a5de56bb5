use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lotwise_booking::{BookingError, ReconcileError};
use lotwise_ledger::LedgerError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Unauthenticated(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    InvalidTransition(String),
    GatewayUnavailable(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidTransition(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::GatewayUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict { .. } => {
                AppError::Conflict("this spot was just taken, choose another".to_string())
            }
            LedgerError::SpaceNotFound(_) | LedgerError::SpotNotFound { .. } => {
                AppError::NotFound(err.to_string())
            }
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SpotUnavailable { .. } => {
                AppError::Conflict("this spot was just taken, choose another".to_string())
            }
            BookingError::SpaceNotFound(_)
            | BookingError::SpotUnknown { .. }
            | BookingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BookingError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            BookingError::InvalidWindow => AppError::Validation(err.to_string()),
            BookingError::Catalog(msg) => AppError::Anyhow(anyhow::anyhow!(msg)),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::BookingNotFound(_) => AppError::NotFound(err.to_string()),
            ReconcileError::NotAwaitingPayment(_) => AppError::Conflict(err.to_string()),
            ReconcileError::Gateway(_) => {
                AppError::GatewayUnavailable("payment could not be initiated, try again".to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
