//! Classified domain errors.
//!
//! Every layer above an adapter deals in `SentinelError`, never in raw
//! `anyhow::Error` or a database driver's error type. The HTTP layer maps
//! `ErrorKind` onto status codes; jobs map it onto retry decisions.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

/// The closed set of error classifications (see spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    MarketClosed,
    InsufficientFunds,
    InsufficientQuantity,
    BrokerTransient,
    BrokerRejected,
    DependencyDown,
    IntegrityViolation,
    Corrupt,
    Timeout,
    Cancelled,
    Internal,
    NotImplemented,
}

#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct SentinelError {
    pub kind: ErrorKind,
    pub message: String,
    pub reason: Option<String>,
    /// The validator/layer that produced this error, when it came out of
    /// the trade validation pipeline (spec §7: "Trade refusals include
    /// `{reason, layer, details}`").
    pub layer: Option<&'static str>,
    pub details: Option<Value>,
}

impl SentinelError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reason: None,
            layer: None,
            details: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_layer(mut self, layer: &'static str) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn market_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MarketClosed, message).with_reason("market_closed")
    }

    pub fn insufficient_funds(deficit: Decimal) -> Self {
        Self::new(
            ErrorKind::InsufficientFunds,
            format!("insufficient funds, deficit {deficit}"),
        )
        .with_reason("insufficient_funds")
        .with_details(serde_json::json!({ "deficit": deficit.to_f64().unwrap_or_default() }))
    }

    pub fn insufficient_quantity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientQuantity, message).with_reason("insufficient_quantity")
    }

    pub fn broker_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BrokerTransient, message)
    }

    pub fn broker_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BrokerRejected, message)
    }

    pub fn dependency_down(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyDown, message)
    }

    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IntegrityViolation, message)
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Corrupt, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// Whether a service is permitted to retry this error per the retry policy (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::BrokerTransient | ErrorKind::Timeout | ErrorKind::DependencyDown
        )
    }
}

impl From<sqlx::Error> for SentinelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SentinelError::not_found("row not found"),
            sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
                SentinelError::conflict(db_err.message().to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.message().contains("database is locked") => {
                SentinelError::new(ErrorKind::Timeout, "database busy")
            }
            other => SentinelError::internal(other.to_string()),
        }
    }
}

pub type SentinelResult<T> = Result<T, SentinelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds_are_exactly_the_documented_three() {
        assert!(SentinelError::broker_transient("x").is_retryable());
        assert!(SentinelError::timeout("x").is_retryable());
        assert!(SentinelError::dependency_down("x").is_retryable());
        assert!(!SentinelError::validation("x").is_retryable());
        assert!(!SentinelError::internal("x").is_retryable());
    }

    #[test]
    fn insufficient_funds_carries_machine_reason() {
        let err = SentinelError::insufficient_funds(Decimal::new(8850, 1));
        assert_eq!(err.reason.as_deref(), Some("insufficient_funds"));
        assert_eq!(err.kind, ErrorKind::InsufficientFunds);
    }
}
