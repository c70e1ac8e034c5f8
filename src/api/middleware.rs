//! Request gating for privileged endpoints.

use crate::{
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::http::HeaderMap;

pub const DEBUG_SECRET_HEADER: &str = "x-debug-secret";

/// Require the shared debug secret. The debug surface is disabled entirely
/// when no secret is configured.
pub fn require_debug_secret(ctx: &AppContext, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = ctx.config.debug.premium_override_secret.as_deref() else {
        return Err(AppError::Forbidden("debug endpoints disabled".to_string()));
    };

    match headers.get(DEBUG_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}
