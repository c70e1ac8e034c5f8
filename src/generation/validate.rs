//! Parsing and validation of model output.
//!
//! The model is asked for fenced-free JSON, but a markdown code fence is
//! tolerated. The no-food signal is advisory and takes precedence over
//! structural validation; it is not assumed to be mutually exclusive with
//! partially populated recipe fields.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-tier result: flat ingredient names and one paragraph of prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FreeRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub recipe: String,
    #[serde(default, skip_serializing)]
    pub no_food_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuantifiedIngredient {
    pub item: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Macros {
    pub calories: f64,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
}

/// Premium result: quantified ingredients, timed steps, macro estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PremiumRecipe {
    pub title: String,
    pub ingredients: Vec<QuantifiedIngredient>,
    pub steps: Vec<String>,
    pub servings: u32,
    pub time_minutes: u32,
    pub macros: Macros,
    #[serde(default, skip_serializing)]
    pub no_food_detected: bool,
}

/// Strip a markdown code-fence wrapper, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse raw model text into a JSON value. Parse failure is fatal for the
/// call and is not retried.
pub fn parse_model_json(raw: &str) -> AppResult<Value> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AppError::BadModelOutput(format!("unparseable model output: {}", e)))
}

/// Check the advisory no-food flag on the raw parsed value.
pub fn no_food_signaled(value: &Value) -> bool {
    value
        .get("noFoodDetected")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Validate a parsed value against the free-tier shape.
pub fn validate_free(value: Value) -> AppResult<FreeRecipe> {
    serde_json::from_value(value)
        .map_err(|e| AppError::BadModelOutput(format!("free recipe shape mismatch: {}", e)))
}

/// Validate a parsed value against the premium-tier shape.
pub fn validate_premium(value: Value) -> AppResult<PremiumRecipe> {
    let recipe: PremiumRecipe = serde_json::from_value(value)
        .map_err(|e| AppError::BadModelOutput(format!("premium recipe shape mismatch: {}", e)))?;
    if recipe.title.trim().is_empty() || recipe.ingredients.is_empty() || recipe.steps.is_empty() {
        return Err(AppError::BadModelOutput(
            "premium recipe missing required content".to_string(),
        ));
    }
    Ok(recipe)
}

/// Free-tier emptiness check, applied after sanitization.
pub fn ensure_free_nonempty(recipe: &FreeRecipe) -> AppResult<()> {
    let ingredients_empty = recipe.ingredients.is_empty()
        || recipe.ingredients.iter().all(|i| i.trim().is_empty());
    if recipe.title.trim().is_empty() || ingredients_empty || recipe.recipe.trim().is_empty() {
        return Err(AppError::BadModelOutput(
            "free recipe emptied by sanitization".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n{}\n```  "), "{}");
    }

    #[test]
    fn test_parse_model_json_rejects_garbage() {
        assert!(matches!(
            parse_model_json("definitely not json"),
            Err(AppError::BadModelOutput(_))
        ));
    }

    #[test]
    fn test_no_food_signal_precedes_validation() {
        // Partially populated fields alongside the flag are fine.
        let value = json!({ "noFoodDetected": true, "title": "" });
        assert!(no_food_signaled(&value));
        assert!(!no_food_signaled(&json!({ "title": "Soup" })));
        assert!(!no_food_signaled(&json!({ "noFoodDetected": "yes" })));
    }

    #[test]
    fn test_validate_free_accepts_well_formed() {
        let value = json!({
            "title": "Tomato toast",
            "ingredients": ["tomato", "bread"],
            "recipe": "Toast the bread and pile on the tomato."
        });
        let recipe = validate_free(value).unwrap();
        assert_eq!(recipe.title, "Tomato toast");
        assert!(!recipe.no_food_detected);
    }

    #[test]
    fn test_validate_free_rejects_missing_and_unknown_fields() {
        let missing = json!({ "title": "x", "ingredients": [] });
        assert!(matches!(
            validate_free(missing),
            Err(AppError::BadModelOutput(_))
        ));

        let unknown = json!({
            "title": "x",
            "ingredients": [],
            "recipe": "y",
            "rating": 5
        });
        assert!(matches!(
            validate_free(unknown),
            Err(AppError::BadModelOutput(_))
        ));
    }

    #[test]
    fn test_validate_premium_rejects_mistyped_fields() {
        let value = json!({
            "title": "Roast",
            "ingredients": [{ "item": "chicken", "amount": "1 kg" }],
            "steps": ["Roast it"],
            "servings": "four",
            "timeMinutes": 60,
            "macros": {
                "calories": 500.0,
                "proteinGrams": 40.0,
                "carbsGrams": 10.0,
                "fatGrams": 30.0
            }
        });
        assert!(matches!(
            validate_premium(value),
            Err(AppError::BadModelOutput(_))
        ));
    }

    #[test]
    fn test_validate_premium_accepts_well_formed() {
        let value = json!({
            "title": "Roast",
            "ingredients": [{ "item": "chicken", "amount": "1 kg" }],
            "steps": ["Season", "Roast"],
            "servings": 4,
            "timeMinutes": 75,
            "macros": {
                "calories": 520.0,
                "proteinGrams": 42.0,
                "carbsGrams": 8.0,
                "fatGrams": 31.0
            }
        });
        let recipe = validate_premium(value).unwrap();
        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.macros.protein_grams, 42.0);
    }

    #[test]
    fn test_ensure_free_nonempty() {
        let mut recipe = FreeRecipe {
            title: "T".to_string(),
            ingredients: vec!["a".to_string()],
            recipe: "cook".to_string(),
            no_food_detected: false,
        };
        assert!(ensure_free_nonempty(&recipe).is_ok());

        recipe.recipe = "   ".to_string();
        assert!(ensure_free_nonempty(&recipe).is_err());
    }
}
