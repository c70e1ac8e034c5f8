//! Analyze and regenerate endpoints.

use crate::{
    api::AppJson,
    context::AppContext,
    error::{AppError, AppResult},
    generation::{RecipePayload, Tier},
    media::TempImage,
    metrics,
    quota::{CooldownCheck, CooldownKind, FreeUse},
    scans::{ScanPreferences, ScanRegistry},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Build recipe routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/regenerate", post(regenerate))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[validate(
        required(message = "deviceId is required"),
        length(min = 1, message = "deviceId must not be empty")
    )]
    pub device_id: Option<String>,
    #[validate(
        required(message = "imageBase64 is required"),
        length(min = 1, message = "imageBase64 must not be empty")
    )]
    pub image_base64: Option<String>,
    #[serde(flatten)]
    pub preferences: ScanPreferences,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    #[validate(
        required(message = "deviceId is required"),
        length(min = 1, message = "deviceId must not be empty")
    )]
    pub device_id: Option<String>,
    #[validate(
        required(message = "scanId is required"),
        length(min = 1, message = "scanId must not be empty")
    )]
    pub scan_id: Option<String>,
    /// Raw partial preferences, merged field by field with type checks so a
    /// wrong-typed field is ignored rather than rejected.
    #[serde(flatten)]
    pub preferences: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub scan_id: String,
    pub tier: &'static str,
    pub recipe: RecipePayload,
}

/// POST /analyze - one photo in, one recipe out, quota permitting.
async fn analyze(
    State(ctx): State<AppContext>,
    AppJson(req): AppJson<AnalyzeRequest>,
) -> AppResult<Json<RecipeResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let device_id = req.device_id.unwrap_or_default();
    let image_base64 = req.image_base64.unwrap_or_default();

    let now = AppContext::now_ms();
    let quota_cfg = &ctx.config.quota;

    // Stage the image before any quota mutation: a payload that does not
    // decode must not cost a free use. The guard removes the file on every
    // exit path.
    let image = TempImage::stage(&ctx.config.storage.tmp_directory, &image_base64).await?;

    // Opportunistic retention sweep. A scan clone held by an in-flight
    // request survives eviction.
    let removed = ctx
        .scans
        .sweep_expired(now, quota_cfg.scan_retention_days)
        .await;
    if removed > 0 {
        tracing::info!(removed, "evicted expired scans");
        ctx.scans.flush().await?;
    }

    let user = ctx.quota.resolve_user(&device_id, now).await?;

    match ctx
        .quota
        .check_cooldown(
            &device_id,
            CooldownKind::Analyze,
            quota_cfg.analyze_cooldown_seconds,
            now,
        )
        .await?
    {
        CooldownCheck::Ok => {}
        CooldownCheck::Blocked {
            retry_after_seconds,
        } => {
            metrics::QUOTA_REJECTIONS_TOTAL
                .with_label_values(&["cooldown"])
                .inc();
            return Err(AppError::CooldownActive {
                retry_after_seconds,
            });
        }
    }
    // The successful check advanced the timestamp; persist before the slow
    // external call.
    ctx.quota.flush().await?;

    if let FreeUse::LimitReached {
        used_this_week,
        unlock_at_ms,
    } = ctx
        .quota
        .consume_free_use(&device_id, quota_cfg.free_weekly_limit, now)
        .await?
    {
        metrics::QUOTA_REJECTIONS_TOTAL
            .with_label_values(&["weekly_limit"])
            .inc();
        return Err(AppError::FreeLimitReached {
            used_this_week,
            limit_per_week: quota_cfg.free_weekly_limit,
            unlock_at_ms,
        });
    }
    ctx.quota.flush().await?;

    let tier = if user.is_premium {
        Tier::Premium
    } else {
        Tier::Free
    };

    // Scan ids exist only for successful analyses, so no id is passed here
    // and the cuisine pick takes its random branch.
    let recipe = ctx
        .generator
        .generate(None, &req.preferences, &image, tier)
        .await?;

    let scan_id = ctx
        .scans
        .create(&device_id, req.preferences, image_base64, now)
        .await?;
    tracing::info!(%device_id, %scan_id, tier = tier.as_str(), "analyze complete");

    Ok(Json(RecipeResponse {
        scan_id,
        tier: tier.as_str(),
        recipe,
    }))
}

/// POST /regenerate - rerun generation for an owned scan with optional
/// preference updates.
async fn regenerate(
    State(ctx): State<AppContext>,
    AppJson(req): AppJson<RegenerateRequest>,
) -> AppResult<Json<RecipeResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let device_id = req.device_id.unwrap_or_default();
    let scan_id = req.scan_id.unwrap_or_default();

    let now = AppContext::now_ms();
    let quota_cfg = &ctx.config.quota;

    let removed = ctx
        .scans
        .sweep_expired(now, quota_cfg.scan_retention_days)
        .await;
    if removed > 0 {
        ctx.scans.flush().await?;
    }

    let scan = ctx
        .scans
        .get(&scan_id)
        .await
        .ok_or_else(|| AppError::ScanNotFound(scan_id.clone()))?;
    ScanRegistry::authorize(&scan, &device_id)?;

    let user = ctx.quota.resolve_user(&device_id, now).await?;

    // The free-tier regeneration cap comes before the cooldown so a doomed
    // request cannot advance the cooldown timestamp.
    if !user.is_premium && scan.regen_count >= quota_cfg.free_regen_limit {
        metrics::QUOTA_REJECTIONS_TOTAL
            .with_label_values(&["regen_limit"])
            .inc();
        return Err(AppError::RegenLimitReached);
    }

    match ctx
        .quota
        .check_cooldown(
            &device_id,
            CooldownKind::Regen,
            quota_cfg.regen_cooldown_seconds,
            now,
        )
        .await?
    {
        CooldownCheck::Ok => {}
        CooldownCheck::Blocked {
            retry_after_seconds,
        } => {
            metrics::QUOTA_REJECTIONS_TOTAL
                .with_label_values(&["cooldown"])
                .inc();
            return Err(AppError::CooldownActive {
                retry_after_seconds,
            });
        }
    }
    ctx.quota.flush().await?;

    ctx.scans
        .apply_regen_update(&scan_id, &req.preferences, now)
        .await?;
    // Re-read so generation sees the merged preferences.
    let scan = ctx
        .scans
        .get(&scan_id)
        .await
        .ok_or_else(|| AppError::ScanNotFound(scan_id.clone()))?;

    let image = TempImage::stage(&ctx.config.storage.tmp_directory, &scan.image_base64).await?;
    let tier = if user.is_premium {
        Tier::Premium
    } else {
        Tier::Free
    };

    let recipe = ctx
        .generator
        .generate(Some(&scan_id), &scan.preferences, &image, tier)
        .await?;

    ctx.scans.bump_regen_count(&scan_id, user.is_premium).await?;
    ctx.scans.flush().await?;
    tracing::info!(
        %device_id,
        %scan_id,
        tier = tier.as_str(),
        "regeneration complete"
    );

    Ok(Json(RecipeResponse {
        scan_id,
        tier: tier.as_str(),
        recipe,
    }))
}
