//! Per-device entitlement state: premium flag, weekly free-use counter,
//! and per-action cooldown timestamps.
//!
//! Week rollover is lazy: `normalize` runs before every policy decision and
//! resets stale records in place. There is no background timer.

use crate::error::AppResult;
use crate::store::{Collection, StorageBackend};
use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Exactly seven days, the unlock horizon for the weekly cap.
pub const WEEK_MS: i64 = 7 * 86_400_000;

/// Entitlement record, keyed by opaque device identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlement {
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub week_start_ms: i64,
    #[serde(default)]
    pub free_used_this_week: u32,
    #[serde(default)]
    pub last_analyze_ms: i64,
    #[serde(default)]
    pub last_regen_ms: i64,
}

impl UserEntitlement {
    fn fresh(now_ms: i64) -> Self {
        Self {
            is_premium: false,
            week_start_ms: week_start_ms(now_ms),
            free_used_this_week: 0,
            last_analyze_ms: 0,
            last_regen_ms: 0,
        }
    }
}

/// The two metered action kinds, each with its own cooldown timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownKind {
    Analyze,
    Regen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CooldownCheck {
    Ok,
    Blocked { retry_after_seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeUse {
    Ok,
    LimitReached {
        used_this_week: u32,
        unlock_at_ms: i64,
    },
}

/// Start of the tracked week containing `now_ms`: Monday 00:00 local time.
pub fn week_start_ms(now_ms: i64) -> i64 {
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .with_timezone(&Local);
    let days_from_monday = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_from_monday);
    let midnight = monday.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        // Midnight removed by a DST jump; fall back to the UTC reading.
        LocalResult::None => midnight.and_utc().timestamp_millis(),
    }
}

/// Reset stale weekly state in place. Pure; callers inject the clock.
pub fn normalize(user: &mut UserEntitlement, now_ms: i64) {
    let current = week_start_ms(now_ms);
    if user.week_start_ms != current {
        user.week_start_ms = current;
        user.free_used_this_week = 0;
        user.last_analyze_ms = 0;
        user.last_regen_ms = 0;
    }
}

/// Owns the `users` collection and every entitlement policy decision.
pub struct QuotaTracker {
    users: Collection<UserEntitlement>,
}

impl QuotaTracker {
    pub async fn open(backend: Arc<dyn StorageBackend>) -> AppResult<Self> {
        Ok(Self {
            users: Collection::open("users", backend).await?,
        })
    }

    /// Fetch the record for a device, creating it on first reference and
    /// rolling it over to the current week. Returns a snapshot.
    pub async fn resolve_user(&self, device_id: &str, now_ms: i64) -> AppResult<UserEntitlement> {
        let user = self
            .users
            .update_or_insert(
                device_id,
                || UserEntitlement::fresh(now_ms),
                |user| {
                    normalize(user, now_ms);
                    user.clone()
                },
            )
            .await;
        Ok(user)
    }

    /// Check the cooldown for one action kind. The Ok path advances the
    /// kind's timestamp (callers must flush right after); the Blocked path
    /// leaves it untouched so a lockout is never silently extended.
    pub async fn check_cooldown(
        &self,
        device_id: &str,
        kind: CooldownKind,
        window_seconds: u64,
        now_ms: i64,
    ) -> AppResult<CooldownCheck> {
        let check = self
            .users
            .update_or_insert(
                device_id,
                || UserEntitlement::fresh(now_ms),
                |user| {
                    normalize(user, now_ms);
                    let last = match kind {
                        CooldownKind::Analyze => user.last_analyze_ms,
                        CooldownKind::Regen => user.last_regen_ms,
                    };
                    let elapsed_ms = now_ms.saturating_sub(last);
                    let window_ms = window_seconds as i64 * 1000;
                    if elapsed_ms < window_ms {
                        let retry = (window_seconds as i64 - elapsed_ms / 1000).max(1) as u64;
                        CooldownCheck::Blocked {
                            retry_after_seconds: retry,
                        }
                    } else {
                        match kind {
                            CooldownKind::Analyze => user.last_analyze_ms = now_ms,
                            CooldownKind::Regen => user.last_regen_ms = now_ms,
                        }
                        CooldownCheck::Ok
                    }
                },
            )
            .await;
        Ok(check)
    }

    /// Consume one free use for the week. Premium users always pass without
    /// mutation; cooldowns and the weekly cap are independent axes.
    pub async fn consume_free_use(
        &self,
        device_id: &str,
        limit: u32,
        now_ms: i64,
    ) -> AppResult<FreeUse> {
        let outcome = self
            .users
            .update_or_insert(
                device_id,
                || UserEntitlement::fresh(now_ms),
                |user| {
                    normalize(user, now_ms);
                    if user.is_premium {
                        return FreeUse::Ok;
                    }
                    if user.free_used_this_week >= limit {
                        return FreeUse::LimitReached {
                            used_this_week: user.free_used_this_week,
                            unlock_at_ms: user.week_start_ms + WEEK_MS,
                        };
                    }
                    user.free_used_this_week += 1;
                    FreeUse::Ok
                },
            )
            .await;
        Ok(outcome)
    }

    /// Force a device's premium flag (debug override).
    pub async fn set_premium(&self, device_id: &str, premium: bool, now_ms: i64) -> AppResult<()> {
        self.users
            .update_or_insert(
                device_id,
                || UserEntitlement::fresh(now_ms),
                |user| {
                    normalize(user, now_ms);
                    user.is_premium = premium;
                },
            )
            .await;
        Ok(())
    }

    pub async fn flush(&self) -> AppResult<()> {
        self.users.flush().await
    }
}
