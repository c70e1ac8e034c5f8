//! Debug/testing endpoints.

use crate::{
    api::{middleware, AppJson},
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

/// Build debug routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/debug/premium", post(set_premium))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetPremiumRequest {
    #[validate(
        required(message = "deviceId is required"),
        length(min = 1, message = "deviceId must not be empty")
    )]
    pub device_id: Option<String>,
    #[validate(required(message = "isPremium is required"))]
    pub is_premium: Option<bool>,
}

/// Force a device's premium flag, for exercising tiers in test setups.
/// Gated by the shared debug secret header.
async fn set_premium(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    AppJson(req): AppJson<SetPremiumRequest>,
) -> AppResult<Json<Value>> {
    middleware::require_debug_secret(&ctx, &headers)?;
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let device_id = req.device_id.unwrap_or_default();
    let is_premium = req.is_premium.unwrap_or_default();

    ctx.quota
        .set_premium(&device_id, is_premium, AppContext::now_ms())
        .await?;
    ctx.quota.flush().await?;
    tracing::info!(%device_id, is_premium, "premium flag overridden");

    Ok(Json(json!({
        "deviceId": device_id,
        "isPremium": is_premium
    })))
}
