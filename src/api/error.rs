//! Maps `SentinelError` onto HTTP status codes and a machine-readable body
//! (spec §7). Every handler returns `SentinelResult<T>`; this is the single
//! place that translates the closed `ErrorKind` set into a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::domain::errors::{ErrorKind, SentinelError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The validator layer that refused the trade, when applicable (spec
    /// §7: "Trade refusals include `{reason, layer, details}`").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub struct ApiError(pub SentinelError);

impl From<SentinelError> for ApiError {
    fn from(err: SentinelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, code) = match err.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::MarketClosed => (StatusCode::BAD_REQUEST, "MARKET_CLOSED"),
            ErrorKind::InsufficientFunds => (StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS"),
            ErrorKind::InsufficientQuantity => (StatusCode::BAD_REQUEST, "INSUFFICIENT_QUANTITY"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ErrorKind::DependencyDown | ErrorKind::BrokerTransient | ErrorKind::Timeout => {
                (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_DOWN")
            }
            ErrorKind::BrokerRejected => (StatusCode::BAD_GATEWAY, "BROKER_REJECTED"),
            ErrorKind::Internal | ErrorKind::Corrupt | ErrorKind::IntegrityViolation => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
            ErrorKind::Cancelled => (StatusCode::CONFLICT, "CANCELLED"),
            ErrorKind::NotImplemented => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
        };

        let body = ErrorBody {
            error: err.message,
            code,
            reason: err.reason,
            layer: err.layer,
            details: err.details,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
