use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::providers::yahoo::MarketDataError;
use crate::store::StoreError;

/// Central error type at the HTTP boundary. Every failure maps to one
/// stable status class; internals are never exposed in the response body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Market data unavailable")]
    MarketData(#[from] MarketDataError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint } => {
                let message = match constraint {
                    "clients.email" => "Email already registered",
                    "assets.ticker" => "Ticker already registered",
                    other => other,
                };
                AppError::Conflict(message.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, "VALIDATION"),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                format!("{what} not found"),
                "NOT_FOUND",
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            AppError::MarketData(source) => {
                tracing::warn!(error = %source, "Upstream market data failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Market data provider unavailable".to_string(),
                    "SERVICE_UNAVAILABLE",
                )
            }
            AppError::Internal(source) => {
                tracing::error!(error = %source, "Unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
