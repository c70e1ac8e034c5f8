//! Scan records: one per analyzed photo, mutable on regeneration, subject
//! to age-based eviction.

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::store::{Collection, StorageBackend};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const DAY_MS: i64 = 86_400_000;

/// User-stated cooking preferences carried by a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_ingredients_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nutrition_goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<String>,
}

/// One analyzed photo plus its preferences and regeneration count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub device_id: String,
    #[serde(default)]
    pub created_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_ms: Option<i64>,
    #[serde(flatten)]
    pub preferences: ScanPreferences,
    pub image_base64: String,
    #[serde(default)]
    pub regen_count: u32,
}

/// Owns the `scans` collection.
pub struct ScanRegistry {
    scans: Collection<Scan>,
}

impl ScanRegistry {
    pub async fn open(backend: Arc<dyn StorageBackend>) -> AppResult<Self> {
        Ok(Self {
            scans: Collection::open("scans", backend).await?,
        })
    }

    /// Store a new scan and persist it; returns the generated identifier.
    pub async fn create(
        &self,
        device_id: &str,
        preferences: ScanPreferences,
        image_base64: String,
        now_ms: i64,
    ) -> AppResult<String> {
        let scan_id = Uuid::new_v4().to_string();
        let scan = Scan {
            device_id: device_id.to_string(),
            created_ms: now_ms,
            updated_ms: None,
            preferences,
            image_base64,
            regen_count: 0,
        };
        self.scans.set(&scan_id, scan).await;
        self.scans.flush().await?;
        Ok(scan_id)
    }

    pub async fn get(&self, scan_id: &str) -> Option<Scan> {
        self.scans.get(scan_id).await
    }

    /// Ownership check; must pass before any mutation.
    pub fn authorize(scan: &Scan, device_id: &str) -> AppResult<()> {
        if scan.device_id == device_id {
            Ok(())
        } else {
            Err(AppError::ScanForbidden)
        }
    }

    /// Merge a raw partial-preferences object field by field. Only keys
    /// present with the expected JSON type overwrite the stored value;
    /// absent or wrong-typed fields are left unchanged.
    pub async fn apply_regen_update(
        &self,
        scan_id: &str,
        partial: &Map<String, Value>,
        now_ms: i64,
    ) -> AppResult<()> {
        self.scans
            .update(scan_id, |scan| {
                merge_preferences(&mut scan.preferences, partial);
                scan.updated_ms = Some(now_ms);
            })
            .await
            .ok_or_else(|| AppError::ScanNotFound(scan_id.to_string()))
    }

    /// Count a regeneration. Premium regenerations are unmetered.
    pub async fn bump_regen_count(&self, scan_id: &str, is_premium: bool) -> AppResult<()> {
        if is_premium {
            return Ok(());
        }
        self.scans
            .update(scan_id, |scan| scan.regen_count += 1)
            .await
            .ok_or_else(|| AppError::ScanNotFound(scan_id.to_string()))
    }

    /// Remove every scan past the retention horizon (or with a missing
    /// creation timestamp). A clone already held by an in-flight request
    /// survives eviction.
    pub async fn sweep_expired(&self, now_ms: i64, retention_days: i64) -> u64 {
        let horizon = now_ms - retention_days * DAY_MS;
        let removed = self
            .scans
            .retain(|_, scan| scan.created_ms >= horizon)
            .await;
        if removed > 0 {
            metrics::SCANS_EVICTED_TOTAL.inc_by(removed);
        }
        removed
    }

    pub async fn flush(&self) -> AppResult<()> {
        self.scans.flush().await
    }
}

fn merge_preferences(prefs: &mut ScanPreferences, partial: &Map<String, Value>) {
    if let Some(v) = partial.get("mealType").and_then(Value::as_str) {
        prefs.meal_type = Some(v.to_string());
    }
    if let Some(v) = partial.get("extraIngredientsText").and_then(Value::as_str) {
        prefs.extra_ingredients_text = Some(v.to_string());
    }
    if let Some(values) = partial.get("nutritionGoals").and_then(Value::as_array) {
        prefs.nutrition_goals = values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = partial.get("timeLimit").and_then(Value::as_str) {
        prefs.time_limit = Some(v.to_string());
    }
    if let Some(v) = partial.get("difficulty").and_then(Value::as_str) {
        prefs.difficulty = Some(v.to_string());
    }
    if let Some(values) = partial.get("equipment").and_then(Value::as_array) {
        prefs.equipment = values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use serde_json::json;

    const NOW: i64 = 1_770_000_000_000;

    async fn registry() -> ScanRegistry {
        ScanRegistry::open(Arc::new(MemoryBackend::new()))
            .await
            .unwrap()
    }

    fn prefs() -> ScanPreferences {
        ScanPreferences {
            meal_type: Some("dinner".to_string()),
            extra_ingredients_text: Some("garlic".to_string()),
            nutrition_goals: vec!["high protein".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry().await;
        let scan_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW)
            .await
            .unwrap();

        let scan = registry.get(&scan_id).await.unwrap();
        assert_eq!(scan.device_id, "device-1");
        assert_eq!(scan.created_ms, NOW);
        assert_eq!(scan.regen_count, 0);
        assert_eq!(scan.updated_ms, None);
    }

    #[tokio::test]
    async fn test_authorize_rejects_non_owner() {
        let registry = registry().await;
        let scan_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW)
            .await
            .unwrap();
        let scan = registry.get(&scan_id).await.unwrap();

        assert!(ScanRegistry::authorize(&scan, "device-1").is_ok());
        assert!(matches!(
            ScanRegistry::authorize(&scan, "device-2"),
            Err(AppError::ScanForbidden)
        ));
    }

    #[tokio::test]
    async fn test_apply_regen_update_merges_typed_fields_only() {
        let registry = registry().await;
        let scan_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW)
            .await
            .unwrap();

        let partial = json!({
            "mealType": "lunch",
            "extraIngredientsText": 42,
            "nutritionGoals": ["low carb", 7],
            "equipment": ["air fryer"]
        });
        let partial = partial.as_object().unwrap();
        registry
            .apply_regen_update(&scan_id, partial, NOW + 1_000)
            .await
            .unwrap();

        let scan = registry.get(&scan_id).await.unwrap();
        assert_eq!(scan.preferences.meal_type.as_deref(), Some("lunch"));
        // wrong-typed field left unchanged
        assert_eq!(
            scan.preferences.extra_ingredients_text.as_deref(),
            Some("garlic")
        );
        // non-string array elements dropped
        assert_eq!(scan.preferences.nutrition_goals, vec!["low carb"]);
        assert_eq!(scan.preferences.equipment, vec!["air fryer"]);
        assert_eq!(scan.updated_ms, Some(NOW + 1_000));
    }

    #[tokio::test]
    async fn test_bump_regen_count_free_only() {
        let registry = registry().await;
        let scan_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW)
            .await
            .unwrap();

        registry.bump_regen_count(&scan_id, false).await.unwrap();
        assert_eq!(registry.get(&scan_id).await.unwrap().regen_count, 1);

        registry.bump_regen_count(&scan_id, true).await.unwrap();
        assert_eq!(registry.get(&scan_id).await.unwrap().regen_count, 1);
    }

    #[tokio::test]
    async fn test_sweep_expired_honors_retention() {
        let registry = registry().await;
        let old_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW - 15 * DAY_MS)
            .await
            .unwrap();
        let fresh_id = registry
            .create("device-1", prefs(), "aW1n".to_string(), NOW - 13 * DAY_MS)
            .await
            .unwrap();

        let removed = registry.sweep_expired(NOW, 14).await;
        assert_eq!(removed, 1);
        assert!(registry.get(&old_id).await.is_none());
        assert!(registry.get(&fresh_id).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_evicts_missing_created_ms() {
        let backend = Arc::new(MemoryBackend::new());
        // A record persisted without createdMs deserializes to 0.
        let payload = json!({
            "legacy": {
                "deviceId": "device-1",
                "imageBase64": "aW1n"
            }
        });
        crate::store::StorageBackend::save(&*backend, "scans", &payload.to_string())
            .await
            .unwrap();

        let registry = ScanRegistry::open(backend).await.unwrap();
        assert_eq!(registry.get("legacy").await.unwrap().created_ms, 0);
        assert_eq!(registry.sweep_expired(NOW, 14).await, 1);
        assert!(registry.get("legacy").await.is_none());
    }
}
