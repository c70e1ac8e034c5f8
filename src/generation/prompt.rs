//! Prompt assembly and response schemas for the vision model.

use crate::scans::ScanPreferences;
use serde_json::{json, Value};

pub const FREE_SCHEMA_NAME: &str = "free_recipe";
pub const PREMIUM_SCHEMA_NAME: &str = "premium_recipe";

const CHEF_PERSONA: &str = "You are a professional chef developing recipes from photos of \
ingredients. You cook with restraint and confidence, and you never pad a dish with things the \
cook does not have.";

const FLAVOR_RULES: &str = "Layer flavors deliberately: aromatics before liquids, acid to \
brighten at the end, fat to carry spice, fresh herbs added late.";

const NOT_FOOD_RULE: &str = "Only if you are VERY confident the image contains no food or \
ingredients at all, set \"noFoodDetected\" to true and leave every other field empty. When in \
doubt, assume the image shows food.";

/// Render stored preferences into the prompt's preference block.
pub fn render_preference_block(prefs: &ScanPreferences) -> String {
    let mut lines = Vec::new();
    if let Some(meal) = &prefs.meal_type {
        lines.push(format!("Meal type: {}", meal));
    }
    if let Some(extra) = &prefs.extra_ingredients_text {
        lines.push(format!("Extra ingredients on hand: {}", extra));
    }
    if !prefs.nutrition_goals.is_empty() {
        lines.push(format!(
            "Nutrition goals: {}",
            prefs.nutrition_goals.join(", ")
        ));
    }
    if let Some(limit) = &prefs.time_limit {
        lines.push(format!("Time limit: {}", limit));
    }
    if let Some(difficulty) = &prefs.difficulty {
        lines.push(format!("Preferred difficulty: {}", difficulty));
    }
    if !prefs.equipment.is_empty() {
        lines.push(format!("Available equipment: {}", prefs.equipment.join(", ")));
    }
    if lines.is_empty() {
        "No stated preferences.".to_string()
    } else {
        lines.join("\n")
    }
}

fn emphasis_for(meat_signal: bool) -> &'static str {
    if meat_signal {
        "Build the dish around the meat or seafood the user mentioned."
    } else {
        "Let the produce in the photo lead the dish."
    }
}

/// Free-tier prompt: short, unstructured-feeling, no numbers anywhere.
pub fn free_prompt(cuisine: &str, prefs: &ScanPreferences, meat_signal: bool) -> String {
    format!(
        "{persona}\n{flavor}\n{not_food}\n\n\
         Identify the ingredients in the photo and sketch a simple {cuisine}-leaning dish.\n\
         {emphasis}\n\
         Respond with a title, the ingredient names you can see, and exactly one short paragraph \
         describing how to cook the dish. Do not use numbers, amounts, temperatures, or timings \
         anywhere in the paragraph.\n\n\
         User preferences:\n{prefs}",
        persona = CHEF_PERSONA,
        flavor = FLAVOR_RULES,
        not_food = NOT_FOOD_RULE,
        cuisine = cuisine,
        emphasis = emphasis_for(meat_signal),
        prefs = render_preference_block(prefs),
    )
}

/// Premium prompt: fully structured recipe with quantities and macros.
pub fn premium_prompt(cuisine: &str, prefs: &ScanPreferences, meat_signal: bool) -> String {
    format!(
        "{persona}\n{flavor}\n{not_food}\n\n\
         Identify the ingredients in the photo and write a complete {cuisine}-leaning recipe.\n\
         {emphasis}\n\
         Respond with a title, quantified ingredients (item plus amount), numbered steps with \
         timings where they matter, servings, total time in minutes, and an honest estimate of \
         calories, protein, carbs, and fat per serving.\n\n\
         User preferences:\n{prefs}",
        persona = CHEF_PERSONA,
        flavor = FLAVOR_RULES,
        not_food = NOT_FOOD_RULE,
        cuisine = cuisine,
        emphasis = emphasis_for(meat_signal),
        prefs = render_preference_block(prefs),
    )
}

/// Closed response schema for the free tier; unknown fields are rejected.
pub fn free_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "title": { "type": "string" },
            "ingredients": { "type": "array", "items": { "type": "string" } },
            "recipe": { "type": "string" },
            "noFoodDetected": { "type": "boolean" }
        },
        "required": ["title", "ingredients", "recipe"]
    })
}

/// Closed response schema for the premium tier.
pub fn premium_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "title": { "type": "string" },
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "item": { "type": "string" },
                        "amount": { "type": "string" }
                    },
                    "required": ["item", "amount"]
                }
            },
            "steps": { "type": "array", "items": { "type": "string" } },
            "servings": { "type": "integer" },
            "timeMinutes": { "type": "integer" },
            "macros": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "calories": { "type": "number" },
                    "proteinGrams": { "type": "number" },
                    "carbsGrams": { "type": "number" },
                    "fatGrams": { "type": "number" }
                },
                "required": ["calories", "proteinGrams", "carbsGrams", "fatGrams"]
            },
            "noFoodDetected": { "type": "boolean" }
        },
        "required": ["title", "ingredients", "steps", "servings", "timeMinutes", "macros"]
    })
}
