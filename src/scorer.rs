//! Keyword-based indicator scoring with context extraction.
//!
//! For each indicator, every keyword is searched case-insensitively with
//! word-boundary anchoring, so "force" does not match inside "enforced".
//! Scoring is per indicator with no cross-indicator normalization: a text
//! can score high on several indicators at once.

use ahash::AHashSet;
use regex::Regex;

use crate::error::{AuthlexError, Result};
use crate::indicator::{AnalysisResult, Indicator, MatchDetail, INDICATORS};
use crate::sentiment;

/// Characters of surrounding context captured on each side of a match.
const CONTEXT_CHARS: usize = 30;

/// Score awarded per distinct matched keyword.
const SCORE_PER_MATCH: u32 = 2;

/// Maximum indicator score.
const MAX_SCORE: u32 = 10;

/// Sentiment below this threshold adds one point to a non-zero score.
const NEGATIVE_SENTIMENT_THRESHOLD: f64 = -0.2;

/// Scores text against the fixed indicator taxonomy.
///
/// Keyword patterns are compiled once at construction.
#[derive(Debug)]
pub struct IndicatorScorer {
    /// Per indicator: compiled word-boundary patterns, one per keyword.
    patterns: Vec<(&'static Indicator, Vec<Regex>)>,
}

impl IndicatorScorer {
    /// Create a scorer over the four fixed indicators.
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(INDICATORS.len());

        for indicator in INDICATORS.iter() {
            let mut compiled = Vec::with_capacity(indicator.keywords.len());
            for keyword in indicator.keywords {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword));
                let regex = Regex::new(&pattern).map_err(|e| {
                    AuthlexError::analysis(format!("invalid keyword pattern {keyword:?}: {e}"))
                })?;
                compiled.push(regex);
            }
            patterns.push((indicator, compiled));
        }

        Ok(Self { patterns })
    }

    /// Score `text` against every indicator.
    ///
    /// Total: always returns exactly four results, one per indicator, each
    /// with a score in [0, 10]. Empty or non-matching text yields score 0
    /// with empty match collections.
    pub fn analyze(&self, text: &str) -> Vec<AnalysisResult> {
        let sentiment = sentiment::estimate(text);

        self.patterns
            .iter()
            .map(|(indicator, regexes)| self.score_indicator(indicator, regexes, text, sentiment))
            .collect()
    }

    fn score_indicator(
        &self,
        indicator: &'static Indicator,
        regexes: &[Regex],
        text: &str,
        sentiment: f64,
    ) -> AnalysisResult {
        let mut matches = Vec::new();
        let mut seen_matches: AHashSet<String> = AHashSet::new();
        let mut match_details = Vec::new();
        let mut seen_details: AHashSet<(String, String)> = AHashSet::new();

        for regex in regexes {
            for found in regex.find_iter(text) {
                let original = found.as_str().to_string();

                // Matches dedupe case-insensitively, first spelling wins.
                if seen_matches.insert(original.to_lowercase()) {
                    matches.push(original.clone());
                }

                // Every occurrence contributes a detail entry unless both the
                // matched string and its context are identical.
                let context = context_window(text, found.start(), found.end());
                if seen_details.insert((original.clone(), context.clone())) {
                    match_details.push(MatchDetail { original, context });
                }
            }
        }

        let unique = matches.len() as u32;
        let mut score = (unique * SCORE_PER_MATCH).min(MAX_SCORE);
        if unique > 0 && sentiment < NEGATIVE_SENTIMENT_THRESHOLD {
            score = (score + 1).min(MAX_SCORE);
        }

        AnalysisResult {
            indicator,
            score,
            matches,
            match_details,
        }
    }
}

/// Extract up to [`CONTEXT_CHARS`] characters on each side of the byte range
/// `[start, end)`, clipped at text boundaries and kept on char boundaries.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let ctx_start = text[..start]
        .char_indices()
        .rev()
        .take(CONTEXT_CHARS)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);

    let ctx_end = text[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    text[ctx_start..ctx_end].to_string()
}
