//! Recipe generation orchestrator.
//!
//! Ties together cuisine selection, prompt assembly, the external model
//! call, fence-tolerant parsing, the no-food short circuit, tier
//! validation, and the free-tier sanitizer.

pub mod client;
pub mod cuisine;
pub mod prompt;
pub mod sanitize;
pub mod validate;

pub use client::{GeminiClient, GenerationRequest, VisionModel};
pub use validate::{FreeRecipe, Macros, PremiumRecipe, QuantifiedIngredient};

use crate::error::{AppError, AppResult};
use crate::media::TempImage;
use crate::metrics;
use crate::scans::ScanPreferences;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Entitlement tier, determining schema shape and policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

/// A validated, tier-shaped generation result.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecipePayload {
    Free(FreeRecipe),
    Premium(PremiumRecipe),
}

pub struct RecipeGenerator {
    model: Arc<dyn VisionModel>,
}

impl RecipeGenerator {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Run the full pipeline for one scan. `scan_id` is present only on
    /// regeneration; analyze allocates the scan after success, so its
    /// cuisine pick is the random branch.
    pub async fn generate(
        &self,
        scan_id: Option<&str>,
        prefs: &ScanPreferences,
        image: &TempImage,
        tier: Tier,
    ) -> AppResult<RecipePayload> {
        let started = Instant::now();
        let result = self.run(scan_id, prefs, image, tier).await;

        metrics::GENERATION_DURATION_SECONDS
            .with_label_values(&[tier.as_str()])
            .observe(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::NoFoodDetected) => "no_food",
            Err(AppError::BadModelOutput(_)) => "bad_output",
            Err(_) => "error",
        };
        metrics::GENERATION_TOTAL
            .with_label_values(&[tier.as_str(), outcome])
            .inc();

        result
    }

    async fn run(
        &self,
        scan_id: Option<&str>,
        prefs: &ScanPreferences,
        image: &TempImage,
        tier: Tier,
    ) -> AppResult<RecipePayload> {
        let cuisine = cuisine::pick_cuisine(scan_id);
        let meat_signal = cuisine::mentions_meat(&free_text_of(prefs));
        let (prompt_text, response_schema, schema_name) = match tier {
            Tier::Free => (
                prompt::free_prompt(cuisine, prefs, meat_signal),
                prompt::free_schema(),
                prompt::FREE_SCHEMA_NAME,
            ),
            Tier::Premium => (
                prompt::premium_prompt(cuisine, prefs, meat_signal),
                prompt::premium_schema(),
                prompt::PREMIUM_SCHEMA_NAME,
            ),
        };
        tracing::debug!(cuisine, tier = tier.as_str(), "generating recipe");

        let file_uri = self
            .model
            .upload_image(image.path(), image.mime_type())
            .await?;
        let request = GenerationRequest {
            file_uri,
            mime_type: image.mime_type().to_string(),
            prompt: prompt_text,
            schema_name,
            response_schema,
        };
        let raw = self.model.generate(&request).await?;

        let value = validate::parse_model_json(&raw)?;
        if validate::no_food_signaled(&value) {
            return Err(AppError::NoFoodDetected);
        }

        match tier {
            Tier::Free => {
                let mut recipe = validate::validate_free(value)?;
                recipe.recipe = sanitize::sanitize_free_text(&recipe.recipe);
                validate::ensure_free_nonempty(&recipe)?;
                Ok(RecipePayload::Free(recipe))
            }
            Tier::Premium => Ok(RecipePayload::Premium(validate::validate_premium(value)?)),
        }
    }
}

/// Concatenated free-text preference fields, the haystack for keyword
/// signals.
fn free_text_of(prefs: &ScanPreferences) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(v) = &prefs.extra_ingredients_text {
        parts.push(v);
    }
    if let Some(v) = &prefs.meal_type {
        parts.push(v);
    }
    parts.extend(prefs.nutrition_goals.iter().map(String::as_str));
    parts.extend(prefs.equipment.iter().map(String::as_str));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::tempdir;

    struct StubModel {
        text: String,
    }

    #[async_trait]
    impl VisionModel for StubModel {
        async fn upload_image(&self, _path: &Path, _mime_type: &str) -> AppResult<String> {
            Ok("files/stub".to_string())
        }

        async fn generate(&self, _request: &GenerationRequest) -> AppResult<String> {
            Ok(self.text.clone())
        }
    }

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    async fn staged_image(dir: &Path) -> TempImage {
        use base64::Engine;
        let payload = base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC);
        TempImage::stage(dir, &payload).await.unwrap()
    }

    fn generator(text: &str) -> RecipeGenerator {
        RecipeGenerator::new(Arc::new(StubModel {
            text: text.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_free_generation_sanitizes_prose() {
        let dir = tempdir().unwrap();
        let image = staged_image(dir.path()).await;
        let generator = generator(
            r#"{"title":"Flour mix","ingredients":["flour"],"recipe":"2) Mix 1/2 cup flour at 350°F for 10 minutes"}"#,
        );

        let payload = generator
            .generate(None, &ScanPreferences::default(), &image, Tier::Free)
            .await
            .unwrap();
        match payload {
            RecipePayload::Free(recipe) => {
                assert_eq!(recipe.recipe, "Mix flour at for");
            }
            other => panic!("expected free payload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fenced_output_is_tolerated() {
        let dir = tempdir().unwrap();
        let image = staged_image(dir.path()).await;
        let generator = generator(
            "```json\n{\"title\":\"Soup\",\"ingredients\":[\"leek\"],\"recipe\":\"Simmer the leeks gently.\"}\n```",
        );

        let payload = generator
            .generate(None, &ScanPreferences::default(), &image, Tier::Free)
            .await
            .unwrap();
        assert!(matches!(payload, RecipePayload::Free(_)));
    }

    #[tokio::test]
    async fn test_no_food_short_circuits() {
        let dir = tempdir().unwrap();
        let image = staged_image(dir.path()).await;
        let generator = generator(r#"{"noFoodDetected":true,"title":""}"#);

        let result = generator
            .generate(None, &ScanPreferences::default(), &image, Tier::Premium)
            .await;
        assert!(matches!(result, Err(AppError::NoFoodDetected)));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_bad_output() {
        let dir = tempdir().unwrap();
        let image = staged_image(dir.path()).await;
        let generator = generator("the model rambled instead of emitting JSON");

        let result = generator
            .generate(None, &ScanPreferences::default(), &image, Tier::Free)
            .await;
        assert!(matches!(result, Err(AppError::BadModelOutput(_))));
    }

    #[test]
    fn test_free_text_concatenates_preference_fields() {
        let prefs = ScanPreferences {
            extra_ingredients_text: Some("leftover chicken".to_string()),
            equipment: vec!["wok".to_string()],
            ..Default::default()
        };
        let text = free_text_of(&prefs);
        assert!(text.contains("leftover chicken"));
        assert!(text.contains("wok"));
    }
}
