//! Lexicon-based sentiment estimation.
//!
//! A deliberately small polarity estimator: two hand-curated word lists and a
//! fixed per-hit weight. The scorer uses the result only as a tie-break boost,
//! so coverage matters less than determinism.

use ahash::AHashSet;
use lazy_static::lazy_static;
use regex::Regex;

const TOKEN_WEIGHT: f64 = 0.1;

lazy_static! {
    static ref WORD_PATTERN: Regex = Regex::new(r"\w+").expect("valid token pattern");
    static ref POSITIVE_WORDS: AHashSet<&'static str> = [
        "good",
        "great",
        "wonderful",
        "excellent",
        "hopeful",
        "peaceful",
        "fair",
        "free",
        "honest",
        "prosperous",
    ]
    .into_iter()
    .collect();
    static ref NEGATIVE_WORDS: AHashSet<&'static str> = [
        "bad",
        "terrible",
        "awful",
        "cruel",
        "corrupt",
        "violent",
        "oppressive",
        "brutal",
        "fear",
        "hate",
    ]
    .into_iter()
    .collect();
}

/// Estimate the polarity of `text` in [-1.0, 1.0].
///
/// Tokenizes on non-word boundaries, lowercases, and adds +/- 0.1 per
/// lexicon hit. Pure and total; empty text yields 0.0.
pub fn estimate(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let mut score = 0.0;

    for token in WORD_PATTERN.find_iter(&lowered) {
        let word = token.as_str();
        if POSITIVE_WORDS.contains(word) {
            score += TOKEN_WEIGHT;
        } else if NEGATIVE_WORDS.contains(word) {
            score -= TOKEN_WEIGHT;
        }
    }

    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_text() {
        assert!(estimate("good great wonderful") > 0.0);
    }

    #[test]
    fn test_negative_text() {
        assert!(estimate("bad terrible awful") < 0.0);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(estimate(""), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(estimate("GOOD Great WondErful") > 0.0);
    }

    #[test]
    fn test_clamped_to_unit_range() {
        let positive = "good ".repeat(50);
        let negative = "awful ".repeat(50);
        assert_eq!(estimate(&positive), 1.0);
        assert_eq!(estimate(&negative), -1.0);
    }

    #[test]
    fn test_mixed_text_balances() {
        let score = estimate("good but terrible");
        assert!(score.abs() < 1e-9);
    }
}
