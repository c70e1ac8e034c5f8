//! Cuisine direction and prompt signals.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Fixed cuisine style list the selector draws from.
pub const CUISINES: &[&str] = &[
    "Italian",
    "French",
    "Mexican",
    "Thai",
    "Japanese",
    "Indian",
    "Mediterranean",
    "Korean",
    "Vietnamese",
    "Middle Eastern",
    "Spanish",
    "Moroccan",
];

/// Keywords that flag a meat or seafood emphasis in free-text preferences.
pub const MEAT_KEYWORDS: &[&str] = &[
    "chicken", "beef", "pork", "lamb", "turkey", "duck", "bacon", "ham", "sausage", "steak",
    "mince", "veal", "fish", "salmon", "tuna", "cod", "shrimp", "prawn", "crab", "lobster",
    "anchovy", "sardine",
];

/// Pick a cuisine direction for a scan.
///
/// Hashing the scan id keeps regenerations of the same scan thematically
/// consistent; with no id the pick is uniform over the list.
pub fn pick_cuisine(scan_id: Option<&str>) -> &'static str {
    pick_from(scan_id, CUISINES)
}

/// Digest-parameterized selection, separate from the option list so the
/// list can change without touching the hashing.
fn pick_from(identifier: Option<&str>, options: &'static [&'static str]) -> &'static str {
    match identifier {
        Some(id) => {
            let digest = hex::encode(Sha256::digest(id.as_bytes()));
            // First 8 hex chars of a uniform digest keep the modulus close
            // to uniform over the list.
            let n = u64::from_str_radix(&digest[..8], 16).unwrap_or(0);
            options[(n % options.len() as u64) as usize]
        }
        None => options[rand::thread_rng().gen_range(0..options.len())],
    }
}

/// True when any free-text preference mentions meat or seafood.
pub fn mentions_meat(haystack: &str) -> bool {
    let lowered = haystack.to_lowercase();
    MEAT_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
