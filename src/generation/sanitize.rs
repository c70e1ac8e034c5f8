//! Free-tier text sanitizer.
//!
//! The unpaid tier's "no numbers or measurements" contract is enforced
//! here; the prompt instruction upstream is only a hint. The sanitizer is
//! an ordered pipeline of pure transforms, each independently testable.

/// Measurement and temperature words stripped from free-tier prose,
/// case-insensitive, whole word.
const UNIT_WORDS: &[&str] = &[
    "cup",
    "cups",
    "tablespoon",
    "tablespoons",
    "tbsp",
    "teaspoon",
    "teaspoons",
    "tsp",
    "gram",
    "grams",
    "g",
    "kg",
    "kilogram",
    "kilograms",
    "milligram",
    "milligrams",
    "mg",
    "ml",
    "milliliter",
    "milliliters",
    "millilitre",
    "millilitres",
    "liter",
    "liters",
    "litre",
    "litres",
    "l",
    "oz",
    "ounce",
    "ounces",
    "lb",
    "lbs",
    "pound",
    "pounds",
    "pinch",
    "dash",
    "quart",
    "quarts",
    "pint",
    "pints",
    "gallon",
    "gallons",
    "second",
    "seconds",
    "sec",
    "secs",
    "minute",
    "minutes",
    "min",
    "mins",
    "hour",
    "hours",
    "hr",
    "hrs",
    "degree",
    "degrees",
    "fahrenheit",
    "celsius",
    "°f",
    "°c",
    "f",
    "c",
];

const VULGAR_FRACTIONS: &[char] = &[
    '½', '⅓', '⅔', '¼', '¾', '⅕', '⅖', '⅗', '⅘', '⅙', '⅚', '⅛', '⅜', '⅝', '⅞',
];

type Transform = fn(&str) -> String;

/// Ordered sanitizer pipeline.
const PIPELINE: &[Transform] = &[
    strip_list_numbering,
    strip_numbers,
    strip_unit_words,
    collapse_whitespace,
];

/// Run the full pipeline over free-tier prose.
pub fn sanitize_free_text(input: &str) -> String {
    PIPELINE
        .iter()
        .fold(input.to_string(), |text, step| step(&text))
}

/// Remove leading list markers ("1)", "2.", "-", "*") from every line.
fn strip_list_numbering(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let rest = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
            if rest.len() < trimmed.len() {
                if let Some(stripped) = rest.strip_prefix(')').or_else(|| rest.strip_prefix('.')) {
                    return stripped.trim_start();
                }
            }
            if let Some(stripped) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* "))
            {
                return stripped;
            }
            trimmed
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove digit sequences, including decimals, slash fractions, and
/// unicode vulgar fractions.
fn strip_numbers(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            // Swallow the rest of the number, separators included.
            while let Some(&next) = chars.peek() {
                let is_separator = (next == '.' || next == '/' || next == ',')
                    && chars
                        .clone()
                        .nth(1)
                        .map_or(false, |after| after.is_ascii_digit());
                if next.is_ascii_digit() || is_separator {
                    chars.next();
                } else {
                    break;
                }
            }
        } else if !VULGAR_FRACTIONS.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Remove measurement words, case-insensitive, whole word. Punctuation
/// attached to a stripped word goes with it.
fn strip_unit_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for piece in input.split_inclusive(char::is_whitespace) {
        let word = piece.trim_end_matches(char::is_whitespace);
        let whitespace = &piece[word.len()..];
        if !is_unit_word(word) {
            out.push_str(word);
        }
        out.push_str(whitespace);
    }
    out
}

fn is_unit_word(word: &str) -> bool {
    let core = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '°');
    !core.is_empty() && UNIT_WORDS.contains(&core.to_lowercase().as_str())
}

/// Collapse runs of whitespace into single spaces.
fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_measurement_heavy_line() {
        let output = sanitize_free_text("2) Mix 1/2 cup flour at 350°F for 10 minutes");
        assert!(!output.chars().any(|c| c.is_ascii_digit()));
        let lowered = output.to_lowercase();
        assert!(!lowered.contains("cup"));
        assert!(!lowered.contains("°f"));
        assert!(!lowered.contains("minutes"));
        assert_eq!(output, "Mix flour at for");
    }

    #[test]
    fn test_strip_list_numbering_per_line() {
        let input = "1. Heat the pan\n2) Add the garlic\n- Serve warm";
        let output = strip_list_numbering(input);
        assert_eq!(output, "Heat the pan\nAdd the garlic\nServe warm");
    }

    #[test]
    fn test_strip_numbers_decimals_and_fractions() {
        assert_eq!(strip_numbers("add 3.5 then 1/2 and ½ done"), "add  then  and  done");
        assert_eq!(strip_numbers("1,500 portions"), " portions");
    }

    #[test]
    fn test_strip_numbers_keeps_plain_words() {
        assert_eq!(strip_numbers("no digits here"), "no digits here");
    }

    #[test]
    fn test_strip_unit_words_is_case_insensitive_and_whole_word() {
        let output = strip_unit_words("CUPS of minty broth");
        assert_eq!(output.trim(), "of minty broth");
    }

    #[test]
    fn test_unit_inside_word_survives() {
        // "ml" must not be stripped out of "warmly"
        assert_eq!(strip_unit_words("stir warmly"), "stir warmly");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a   b \n c"), "a b c");
    }

    #[test]
    fn test_sanitize_leaves_clean_prose_alone() {
        let input = "Fold the herbs through and season to taste.";
        assert_eq!(sanitize_free_text(input), input);
    }
}
