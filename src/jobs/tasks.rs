//! Background task implementations.

use crate::{context::AppContext, error::AppResult};

/// Remove scans past the retention horizon and persist the survivors.
pub async fn sweep_expired_scans(ctx: &AppContext) -> AppResult<u64> {
    let now = AppContext::now_ms();
    let removed = ctx
        .scans
        .sweep_expired(now, ctx.config.quota.scan_retention_days)
        .await;
    if removed > 0 {
        ctx.scans.flush().await?;
    }
    Ok(removed)
}

/// Verify the durable store still accepts writes. Doubles as a periodic
/// flush, bounding how much in-memory state a crash can lose.
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    ctx.quota.flush().await?;
    ctx.scans.flush().await
}
