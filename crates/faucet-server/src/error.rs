//! Error handling for the faucet server.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Faucet server error types
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error(transparent)]
    Rejected(#[from] faucet_core::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("State persistence failed: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FaucetError {
    /// HTTP status and stable machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        use faucet_core::Error as Core;

        match self {
            FaucetError::Rejected(Core::Unauthorized { .. }) => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            FaucetError::Rejected(Core::Paused) => (StatusCode::SERVICE_UNAVAILABLE, "PAUSED"),
            FaucetError::Rejected(Core::CooldownActive { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "COOLDOWN_ACTIVE")
            }
            FaucetError::Rejected(Core::LifetimeLimitReached) => {
                (StatusCode::CONFLICT, "LIFETIME_LIMIT_REACHED")
            }
            FaucetError::Rejected(Core::ArithmeticOverflow) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ARITHMETIC_OVERFLOW")
            }
            FaucetError::Rejected(Core::InvalidConfig(_)) | FaucetError::ConfigError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            FaucetError::Rejected(Core::Snapshot(_)) | FaucetError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
            }
            FaucetError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            FaucetError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();

        // Policy rejections are safe to describe; server faults are not
        let message = match &self {
            FaucetError::Rejected(e) if status != StatusCode::INTERNAL_SERVER_ERROR => e.to_string(),
            FaucetError::InvalidAddress(_) => self.to_string(),
            _ => "Internal server error".to_string(),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias for faucet operations
pub type FaucetResult<T> = Result<T, FaucetError>;
