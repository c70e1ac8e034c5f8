//! Unified error types for the SnapChef backend.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type, covering client input errors, entitlement rejections,
/// content errors, and service failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing client input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Missing or wrong debug secret
    #[error("Missing or invalid debug secret")]
    Unauthorized,

    /// Generic forbidden (e.g. disabled debug surface)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Weekly free-use cap hit
    #[error("Weekly free limit reached")]
    FreeLimitReached {
        used_this_week: u32,
        limit_per_week: u32,
        unlock_at_ms: i64,
    },

    /// Per-action cooldown still running
    #[error("Too many requests, cooldown active")]
    CooldownActive { retry_after_seconds: u64 },

    /// Free-tier scans allow a single regeneration
    #[error("Free regeneration limit reached for this scan")]
    RegenLimitReached,

    /// Unknown scan identifier
    #[error("Scan not found: {0}")]
    ScanNotFound(String),

    /// Scan owned by a different device
    #[error("Scan belongs to another device")]
    ScanForbidden,

    /// The model was confident the image contains no food
    #[error("No food detected in the image")]
    NoFoodDetected,

    /// Model output failed to parse or validate
    #[error("Model returned unusable output: {0}")]
    BadModelOutput(String),

    /// Upload or generation call against the external service failed
    #[error("Generation service error: {0}")]
    Upstream(String),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code carried in every JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "INVALID_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::FreeLimitReached { .. } => "FREE_LIMIT_REACHED",
            AppError::CooldownActive { .. } => "TOO_MANY_REQUESTS",
            AppError::RegenLimitReached => "REGEN_LIMIT_REACHED",
            AppError::ScanNotFound(_) => "SCAN_NOT_FOUND",
            AppError::ScanForbidden => "SCAN_FORBIDDEN",
            AppError::NoFoodDetected => "NO_FOOD_DETECTED",
            AppError::BadModelOutput(_) => "AI_BAD_OUTPUT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Storage(_) | AppError::Io(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::FreeLimitReached { .. }
            | AppError::RegenLimitReached
            | AppError::ScanForbidden => StatusCode::FORBIDDEN,
            AppError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ScanNotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoFoodDetected => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadModelOutput(_)
            | AppError::Upstream(_)
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError to an HTTP response. Entitlement errors carry enough
/// structured data for the caller to self-schedule a retry.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        match &self {
            AppError::FreeLimitReached {
                used_this_week,
                limit_per_week,
                unlock_at_ms,
            } => {
                body["usedThisWeek"] = json!(used_this_week);
                body["limitPerWeek"] = json!(limit_per_week);
                body["unlockAtMs"] = json!(unlock_at_ms);
            }
            AppError::CooldownActive {
                retry_after_seconds,
            } => {
                body["retryAfterSeconds"] = json!(retry_after_seconds);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for backend operations
pub type AppResult<T> = Result<T, AppError>;
